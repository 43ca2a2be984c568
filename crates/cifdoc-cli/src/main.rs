//! cifdoc CLI - Parse, validate, inspect and reformat CIF files
//!
//! Usage:
//!   cifdoc [OPTIONS] [COMMAND] <FILE>
//!
//! Commands:
//!   parse     Parse and display document structure (default)
//!   validate  Check the file for errors
//!   stats     Show document statistics
//!   format    Re-serialize the document
//!   get       Print the values of one tag

use std::env;
use std::process;

use cifdoc_core::{
    read_file_with, Block, Document, FormatOptions, Item, Logger, LoopId, ParseError, Parser,
    ReadError, Verbosity,
};
use serde::Serialize;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

fn main() {
    let args: Vec<String> = env::args().collect();

    match run(&args) {
        Ok(()) => {}
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    }
}

fn run(args: &[String]) -> Result<(), String> {
    let config = parse_args(args)?;
    init_logging(config.verbosity)?;

    let parser = Parser::new().with_logger(Logger::new(config.verbosity));

    match config.command {
        Command::Parse => cmd_parse(&parser, &config),
        Command::Validate => cmd_validate(&parser, &config),
        Command::Stats => cmd_stats(&parser, &config),
        Command::Format => cmd_format(&parser, &config),
        Command::Get => cmd_get(&parser, &config),
    }
}

#[derive(Debug)]
struct Config {
    command: Command,
    file: String,
    tag: Option<String>,
    block: Option<String>,
    format: OutputFormat,
    verbosity: Verbosity,
    quiet: bool,
    pretty: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Parse,
    Validate,
    Stats,
    Format,
    Get,
}

#[derive(Debug, Clone, Copy)]
enum OutputFormat {
    Text,
    Json,
}

fn parse_args(args: &[String]) -> Result<Config, String> {
    let mut command = Command::Parse;
    let mut format = OutputFormat::Text;
    let mut verbosity = Verbosity::None;
    let mut quiet = false;
    let mut pretty = true;
    let mut block = None;
    let mut positional = Vec::new();

    let mut i = 1;
    while i < args.len() {
        let arg = &args[i];
        match arg.as_str() {
            "-h" | "--help" => {
                print_help();
                process::exit(0);
            }
            "-V" | "--version" => {
                println!("cifdoc {}", env!("CARGO_PKG_VERSION"));
                process::exit(0);
            }
            "-v" | "--verbose" => verbosity = louder(verbosity),
            "-vv" => verbosity = louder(louder(verbosity)),
            "-vvv" => verbosity = Verbosity::Everything,
            "-q" | "--quiet" => quiet = true,
            "-j" | "--json" => format = OutputFormat::Json,
            "--compact" => pretty = false,
            "-b" | "--block" => {
                i += 1;
                let name = args
                    .get(i)
                    .ok_or_else(|| format!("{} requires a block name", arg))?;
                block = Some(name.clone());
            }
            "parse" if positional.is_empty() => command = Command::Parse,
            "validate" if positional.is_empty() => command = Command::Validate,
            "stats" if positional.is_empty() => command = Command::Stats,
            "format" if positional.is_empty() => command = Command::Format,
            "get" if positional.is_empty() => command = Command::Get,
            _ if arg.starts_with('-') => {
                return Err(format!("unknown option: {}", arg));
            }
            _ => positional.push(arg.clone()),
        }
        i += 1;
    }

    if quiet {
        verbosity = Verbosity::None;
    }

    let (tag, file) = match (command, positional.len()) {
        (Command::Get, 2) => {
            let file = positional.pop();
            (positional.pop(), file)
        }
        (Command::Get, _) => return Err("usage: cifdoc get <TAG> <FILE>".to_string()),
        (_, 0 | 1) => (None, positional.pop()),
        _ => return Err("multiple files specified".to_string()),
    };
    let file = file.ok_or_else(|| "no input file specified".to_string())?;

    Ok(Config {
        command,
        file,
        tag,
        block,
        format,
        verbosity,
        quiet,
        pretty,
    })
}

fn louder(verbosity: Verbosity) -> Verbosity {
    match verbosity {
        Verbosity::None => Verbosity::Some,
        Verbosity::Some => Verbosity::All,
        Verbosity::All | Verbosity::Everything => Verbosity::Everything,
    }
}

/// Send parser progress to stderr at the level selected with `-v`.
fn init_logging(verbosity: Verbosity) -> Result<(), String> {
    let level = match verbosity {
        Verbosity::None => return Ok(()),
        Verbosity::Some => Level::INFO,
        Verbosity::All => Level::DEBUG,
        Verbosity::Everything => Level::TRACE,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).map_err(|e| e.to_string())
}

fn print_help() {
    eprintln!(
        r#"cifdoc - CIF parser, validator and formatter

USAGE:
    cifdoc [OPTIONS] [COMMAND] <FILE>
    cifdoc [OPTIONS] get <TAG> <FILE>

COMMANDS:
    parse       Parse and display document structure (default)
    validate    Check the file for errors without output
    stats       Show document statistics
    format      Print the document as normalized CIF
    get         Print the values of a tag

OPTIONS:
    -b, --block <NAME>  Only use this data block (get: defaults to the last block)
    -j, --json          Output in JSON format
        --compact       Format without alignment or indentation
    -v, --verbose       Show loop rows and log progress to stderr (repeat for more)
    -q, --quiet         Print nothing but errors
    -h, --help          Print help information
    -V, --version       Print version information

EXAMPLES:
    cifdoc structure.cif                     Summarize a CIF file
    cifdoc -v structure.cif                  Summarize with loop contents
    cifdoc -j structure.cif                  Output the document as JSON
    cifdoc validate structure.cif            Validate without output
    cifdoc format --compact structure.cif    Re-serialize without padding
    cifdoc get _cell_length_a structure.cif  Print one tag's values
"#
    );
}

fn load(parser: &Parser, config: &Config) -> Result<Document, String> {
    read_file_with(parser, &config.file).map_err(|e| e.to_string())
}

/// The block chosen with `-b`, or every block.
fn selected_blocks<'d>(doc: &'d Document, config: &Config) -> Result<Vec<&'d Block>, String> {
    match &config.block {
        Some(name) => doc.get(name).map(|b| vec![b]).map_err(|e| e.to_string()),
        None => Ok(doc.iter().collect()),
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| e.to_string())
}

// =============================================================================
// Parse Command
// =============================================================================

fn cmd_parse(parser: &Parser, config: &Config) -> Result<(), String> {
    let doc = load(parser, config)?;
    let blocks = selected_blocks(&doc, config)?;

    match config.format {
        OutputFormat::Json => {
            let json = JsonDocument {
                source: doc.source(),
                blocks: blocks.iter().map(|b| convert_block(b)).collect(),
            };
            println!("{}", to_json(&json)?);
        }
        OutputFormat::Text if config.quiet => {}
        OutputFormat::Text => {
            println!("Blocks: {}", blocks.len());
            for block in blocks {
                print_block(block, config.verbosity != Verbosity::None);
            }
        }
    }

    Ok(())
}

// =============================================================================
// Validate Command
// =============================================================================

fn cmd_validate(parser: &Parser, config: &Config) -> Result<(), String> {
    let json = matches!(config.format, OutputFormat::Json);

    match read_file_with(parser, &config.file) {
        Ok(doc) => {
            if json {
                println!(
                    "{}",
                    serde_json::json!({"valid": true, "blocks": doc.len(), "errors": []})
                );
            } else if !config.quiet {
                println!("Valid: {} data block(s)", doc.len());
            }
            Ok(())
        }
        Err(ReadError::Parse(err)) => {
            if json {
                println!(
                    "{}",
                    serde_json::json!({"valid": false, "errors": [convert_error(&err)]})
                );
            } else {
                eprintln!("Invalid: {}", err);
            }
            Err(format!("{} is not valid CIF", config.file))
        }
        Err(err) => Err(err.to_string()),
    }
}

fn convert_error(err: &ParseError) -> serde_json::Value {
    serde_json::json!({
        "kind": format!("{:?}", err.kind),
        "message": err.message,
        "line": err.position.map(|p| p.line),
        "column": err.position.map(|p| p.column),
        "text": err.line,
    })
}

// =============================================================================
// Stats Command
// =============================================================================

fn cmd_stats(parser: &Parser, config: &Config) -> Result<(), String> {
    let doc = load(parser, config)?;
    let blocks = selected_blocks(&doc, config)?;

    let mut stats = DocumentStats {
        blocks: blocks.len(),
        ..DocumentStats::default()
    };
    for block in &blocks {
        stats.count_block(block);
    }

    match config.format {
        OutputFormat::Json => println!("{}", to_json(&stats)?),
        OutputFormat::Text => {
            println!("Document Statistics");
            println!("-------------------");
            println!("Source:       {}", doc.source().unwrap_or("-"));
            println!();
            println!("Content:");
            println!("  Data blocks:     {}", stats.blocks);
            println!("  Tags:            {}", stats.tags);
            println!("  Scalar items:    {}", stats.pairs);
            println!("  Loops:           {}", stats.loops);
            println!("  Loop rows:       {}", stats.loop_rows);
            println!("  Values:          {}", stats.values);
            println!("  Numeric tags:    {}", stats.numeric_tags);
        }
    }

    Ok(())
}

#[derive(Debug, Default, Serialize)]
struct DocumentStats {
    blocks: usize,
    tags: usize,
    pairs: usize,
    loops: usize,
    loop_rows: usize,
    values: usize,
    numeric_tags: usize,
}

impl DocumentStats {
    fn count_block(&mut self, block: &Block) {
        self.tags += block.len();
        for item in block.items() {
            match item {
                Item::Pair(_) => self.pairs += 1,
                Item::Loop(lp) => {
                    self.loops += 1;
                    self.loop_rows += lp.row_count();
                }
            }
        }
        for value in block.values() {
            self.values += value.len();
            if value.convert() {
                self.numeric_tags += 1;
            }
        }
    }
}

// =============================================================================
// Format Command
// =============================================================================

fn cmd_format(parser: &Parser, config: &Config) -> Result<(), String> {
    let doc = load(parser, config)?;
    let options = if config.pretty {
        FormatOptions::default()
    } else {
        FormatOptions::COMPACT
    };

    match &config.block {
        Some(name) => {
            let block = doc.get(name).map_err(|e| e.to_string())?;
            print!("{}", block.to_cif_string(&options));
        }
        None => print!("{}", doc.to_cif_string(&options)),
    }
    Ok(())
}

// =============================================================================
// Get Command
// =============================================================================

fn cmd_get(parser: &Parser, config: &Config) -> Result<(), String> {
    let doc = load(parser, config)?;
    let tag = config.tag.as_deref().unwrap_or_default();
    let block = match &config.block {
        Some(name) => doc.get(name).map_err(|e| e.to_string())?,
        None => doc
            .last_block()
            .ok_or_else(|| format!("{} has no data blocks", config.file))?,
    };
    let value = block.get(tag).map_err(|e| e.to_string())?;

    match config.format {
        OutputFormat::Json => {
            let numbers = value
                .doubles()
                .ok()
                .zip(value.uncertainties().ok())
                .map(|(v, u)| v.iter().copied().zip(u.iter().copied()).collect::<Vec<_>>());
            let json = serde_json::json!({
                "block": block.name(),
                "tag": block.true_case(tag).unwrap_or(tag),
                "loop": block.loop_id(tag),
                "values": value.strings(),
                "numbers": numbers,
            });
            println!("{}", to_json(&json)?);
        }
        OutputFormat::Text => {
            for s in value {
                println!("{}", s);
            }
        }
    }
    Ok(())
}

// =============================================================================
// JSON Output
// =============================================================================

#[derive(Serialize)]
struct JsonDocument<'a> {
    source: Option<&'a str>,
    blocks: Vec<JsonBlock<'a>>,
}

#[derive(Serialize)]
struct JsonBlock<'a> {
    name: &'a str,
    items: Vec<JsonItem<'a>>,
}

#[derive(Serialize)]
#[serde(tag = "type")]
enum JsonItem<'a> {
    Pair {
        tag: &'a str,
        values: &'a [String],
    },
    Loop {
        id: LoopId,
        tags: Vec<&'a str>,
        rows: Vec<Vec<&'a str>>,
    },
}

fn convert_block(block: &Block) -> JsonBlock<'_> {
    JsonBlock {
        name: block.name(),
        items: block
            .items()
            .map(|item| match item {
                Item::Pair(pair) => JsonItem::Pair {
                    tag: pair.tag,
                    values: pair.value.strings(),
                },
                Item::Loop(lp) => JsonItem::Loop {
                    id: lp.id(),
                    tags: lp.tags().collect(),
                    rows: lp.rows().collect(),
                },
            })
            .collect(),
    }
}

// =============================================================================
// Text Output
// =============================================================================

fn print_block(block: &Block, verbose: bool) {
    println!();
    println!("data_{} ({} tags)", block.name(), block.len());

    for item in block.items() {
        match item {
            Item::Pair(pair) => {
                println!("  {} = {}", pair.tag, preview(&pair.value.strings().join(", ")));
            }
            Item::Loop(lp) => {
                println!(
                    "  loop {} ({} tags x {} rows)",
                    lp.id(),
                    lp.width(),
                    lp.row_count()
                );
                for tag in lp.tags() {
                    println!("    {}", tag);
                }
                if verbose {
                    for (i, row) in lp.rows().enumerate() {
                        let cells: Vec<String> = row.iter().map(|cell| preview(cell)).collect();
                        println!("    [{}] {}", i + 1, cells.join(" | "));
                    }
                }
            }
        }
    }
}

fn preview(text: &str) -> String {
    let flat = text.replace('\n', "\\n");
    if flat.chars().count() > 60 {
        let head: String = flat.chars().take(60).collect();
        format!("{}...", head)
    } else {
        flat
    }
}
