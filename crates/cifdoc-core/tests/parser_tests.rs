//! Integration tests for the CIF parser

use cifdoc_core::lexer::{Cursor, ValueKind};
use cifdoc_core::{
    parse, read_file, Actions, DocumentError, Logger, ParseError, ParseErrorKind, Parser,
    ReadError, Verbosity,
};

fn strings<'a>(doc: &'a cifdoc_core::Document, block: &str, tag: &str) -> Vec<&'a str> {
    doc.get(block)
        .unwrap()
        .get(tag)
        .unwrap()
        .iter()
        .map(String::as_str)
        .collect()
}

// ============================================================================
// Pairs and Blocks
// ============================================================================

#[test]
fn test_parse_scalar_pairs() {
    let doc = parse("data_x\n_a 1\n_b 2\n").unwrap();
    assert_eq!(doc.len(), 1);

    let block = doc.get("x").unwrap();
    assert_eq!(block.name(), "x");
    assert_eq!(block.get("_a").unwrap().strings(), ["1"]);
    assert_eq!(block.get("_b").unwrap().strings(), ["2"]);
    assert_eq!(block.tags().collect::<Vec<_>>(), ["_a", "_b"]);
    assert!(!block.is_in_loop("_a"));
}

#[test]
fn test_parse_multiple_blocks_in_order() {
    let doc = parse("data_first\n_a 1\n\ndata_second\n_a 2\ndata_third\n").unwrap();
    assert_eq!(doc.names().collect::<Vec<_>>(), ["first", "second", "third"]);
    assert_eq!(strings(&doc, "second", "_a"), ["2"]);
    assert!(doc.get("third").unwrap().is_empty());
    assert_eq!(doc.last_block().unwrap().name(), "third");
}

#[test]
fn test_parse_empty_input() {
    assert!(parse("").unwrap().is_empty());
    assert!(parse("   \n\t\n").unwrap().is_empty());
    assert!(parse("# just a comment\n# and another").unwrap().is_empty());
}

#[test]
fn test_parse_block_at_end_of_input() {
    let doc = parse("data_x").unwrap();
    assert!(doc.contains("x"));
    let doc = parse("data_x\n_a 1").unwrap();
    assert_eq!(strings(&doc, "x", "_a"), ["1"]);
}

#[test]
fn test_parse_reserved_words_case_insensitive() {
    let doc = parse("DATA_Upper\nLoop_\n_a\n1\n2\nSTOP_\n_b 3\n").unwrap();
    let block = doc.get("upper").unwrap();
    assert_eq!(block.name(), "Upper");
    assert_eq!(block.get("_a").unwrap().strings(), ["1", "2"]);
    assert_eq!(block.get("_b").unwrap().strings(), ["3"]);
}

#[test]
fn test_tags_case_insensitive_with_true_case() {
    let doc = parse("data_x\n_Cell_Length_A 5.43\n").unwrap();
    let block = doc.get("X").unwrap();
    assert!(block.contains("_cell_length_a"));
    assert!(block.contains("_CELL_LENGTH_A"));
    assert_eq!(block.contains("_Cell_Length_A"), block.contains("_cell_length_a"));
    assert_eq!(block.true_case("_cell_length_a"), Some("_Cell_Length_A"));
    assert_eq!(block.tags().next(), Some("_Cell_Length_A"));
}

#[test]
fn test_block_name_keeps_non_blank_characters() {
    let doc = parse("data_x#not-a-comment\n_a 1\n").unwrap();
    assert!(doc.contains("x#not-a-comment"));
}

// ============================================================================
// Loops
// ============================================================================

#[test]
fn test_parse_loop_round_robin() {
    let doc = parse("data_x\nloop_\n_t1\n_t2\nA 1 B 2\n").unwrap();
    let block = doc.get("x").unwrap();
    assert_eq!(block.get("_t1").unwrap().strings(), ["A", "B"]);
    assert_eq!(block.get("_t2").unwrap().strings(), ["1", "2"]);
    assert_eq!(block.loop_id("_t1"), Some(1));
    assert_eq!(block.loop_tags("_t2").unwrap(), ["_t1", "_t2"]);
}

#[test]
fn test_parse_loop_values_over_many_lines() {
    let input = "data_x\nloop_\n_a\n_b\n_c\n1 2\n3\n4 5 6\n";
    let doc = parse(input).unwrap();
    assert_eq!(strings(&doc, "x", "_a"), ["1", "4"]);
    assert_eq!(strings(&doc, "x", "_b"), ["2", "5"]);
    assert_eq!(strings(&doc, "x", "_c"), ["3", "6"]);
}

#[test]
fn test_parse_several_loops_get_sequential_ids() {
    let input = "data_x\nloop_\n_a\n1\nloop_\n_b\n_c\n2 3\n_d 4\nloop_\n_e\n5\n";
    let doc = parse(input).unwrap();
    let block = doc.get("x").unwrap();
    assert_eq!(block.loop_id("_a"), Some(1));
    assert_eq!(block.loop_id("_c"), Some(2));
    assert_eq!(block.loop_id("_d"), None);
    assert_eq!(block.loop_id("_e"), Some(3));
}

#[test]
fn test_loop_cardinality_error() {
    let err = parse("data_x\nloop_\n_a\n_b\n1 2 3 4 5\n").unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::LoopCardinality);
    assert_eq!(err.message, "1 too few, or 1 too many values in loop.");
    let pos = err.position.unwrap();
    assert_eq!((pos.line, pos.column), (2, 1));
    assert_eq!(err.line.as_deref(), Some("loop_"));
}

#[test]
fn test_loop_cardinality_counts() {
    let err = parse("data_x\nloop_\n_a\n_b\n_c\n1 2 3 4\n").unwrap_err();
    assert_eq!(err.message, "2 too few, or 1 too many values in loop.");
}

#[test]
fn test_empty_loop_before_reserved_word() {
    let doc = parse("data_x\nloop_\n_a\n_b\ndata_y\n_c 1\n").unwrap();
    let block = doc.get("x").unwrap();
    assert_eq!(block.size_of("_a").unwrap(), 0);
    assert_eq!(block.loop_id("_b"), Some(1));
    assert!(doc.get("y").unwrap().contains("_c"));
}

#[test]
fn test_empty_loop_at_end_of_input() {
    let doc = parse("data_x\nloop_\n_a\n").unwrap();
    assert!(doc.get("x").unwrap().get("_a").unwrap().is_empty());
}

#[test]
fn test_empty_loop_closed_by_stop() {
    let doc = parse("data_x\nloop_\n_a\nstop_\n_b 1\n").unwrap();
    let block = doc.get("x").unwrap();
    assert!(block.get("_a").unwrap().is_empty());
    assert_eq!(block.get("_b").unwrap().strings(), ["1"]);
    assert!(!block.is_in_loop("_b"));
}

#[test]
fn test_tag_after_loop_tags_joins_loop() {
    // without values, the next tag is read as another loop column
    let err = parse("data_x\nloop_\n_a\n_b 1\n").unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::LoopCardinality);
}

#[test]
fn test_loop_without_tags() {
    let err = parse("data_x\nloop_\n1 2\n").unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::Syntax);
    assert_eq!(err.position.unwrap().line, 3);
}

// ============================================================================
// Values
// ============================================================================

#[test]
fn test_quoted_strings() {
    let input = "data_x\n_a 'P 21/c'\n_b \"double quoted\"\n_c 'don't stop'\n_d 'x'#comment\n_e ''\n";
    let doc = parse(input).unwrap();
    assert_eq!(strings(&doc, "x", "_a"), ["P 21/c"]);
    assert_eq!(strings(&doc, "x", "_b"), ["double quoted"]);
    assert_eq!(strings(&doc, "x", "_c"), ["don't stop"]);
    assert_eq!(strings(&doc, "x", "_d"), ["x"]);
    assert_eq!(strings(&doc, "x", "_e"), [""]);
}

#[test]
fn test_quoted_string_may_start_with_reserved_word() {
    let doc = parse("data_x\n_a 'data_foo'\n_b '_tag'\n_c '#hash'\n").unwrap();
    assert_eq!(strings(&doc, "x", "_a"), ["data_foo"]);
    assert_eq!(strings(&doc, "x", "_b"), ["_tag"]);
    assert_eq!(strings(&doc, "x", "_c"), ["#hash"]);
}

#[test]
fn test_unquoted_values_keep_embedded_punctuation() {
    let doc = parse("data_x\n_a it's\n_b x;y\n_c [1,2]\n_d a\"b\n").unwrap();
    assert_eq!(strings(&doc, "x", "_a"), ["it's"]);
    assert_eq!(strings(&doc, "x", "_b"), ["x;y"]);
    assert_eq!(strings(&doc, "x", "_c"), ["[1,2]"]);
    assert_eq!(strings(&doc, "x", "_d"), ["a\"b"]);
}

#[test]
fn test_placeholders_are_plain_values() {
    let doc = parse("data_x\n_a .\n_b ?\n").unwrap();
    assert_eq!(strings(&doc, "x", "_a"), ["."]);
    assert_eq!(strings(&doc, "x", "_b"), ["?"]);
}

#[test]
fn test_text_field() {
    let input = "data_x\n_t\n;line one\n  line two\n;\n_u 1\n";
    let doc = parse(input).unwrap();
    assert_eq!(strings(&doc, "x", "_t"), ["line one\n  line two"]);
    assert_eq!(strings(&doc, "x", "_u"), ["1"]);
}

#[test]
fn test_text_field_with_crlf_line_endings() {
    let doc = parse("data_x\r\n_t\r\n;abc\r\ndef\r\n;\r\n").unwrap();
    assert_eq!(strings(&doc, "x", "_t"), ["abc\r\ndef"]);
}

#[test]
fn test_text_field_drops_trailing_carriage_returns() {
    let doc = parse("data_x\n_a\n;abc\r\r\n;\n_b\n;def\r\n\r\r\n;\n").unwrap();
    assert_eq!(strings(&doc, "x", "_a"), ["abc"]);
    assert_eq!(strings(&doc, "x", "_b"), ["def"]);
}

#[test]
fn test_text_field_drops_trailing_blank_lines() {
    let doc = parse("data_x\n_t\n;abc\n\n\n;\n").unwrap();
    assert_eq!(strings(&doc, "x", "_t"), ["abc"]);
}

#[test]
fn test_text_field_empty_and_leading_newline() {
    let doc = parse("data_x\n_a\n;\n;\n_b\n;\nbody\n;\n").unwrap();
    assert_eq!(strings(&doc, "x", "_a"), [""]);
    assert_eq!(strings(&doc, "x", "_b"), ["\nbody"]);
}

#[test]
fn test_text_field_in_loop() {
    let input = "data_x\nloop_\n_a\n_b\n1\n;first\nsecond\n;\n2 two\n";
    let doc = parse(input).unwrap();
    assert_eq!(strings(&doc, "x", "_a"), ["1", "2"]);
    assert_eq!(strings(&doc, "x", "_b"), ["first\nsecond", "two"]);
}

#[test]
fn test_semicolon_not_at_line_start_is_unquoted() {
    let doc = parse("data_x\n_a ;abc\n").unwrap();
    assert_eq!(strings(&doc, "x", "_a"), [";abc"]);
}

#[test]
fn test_comments_between_items() {
    let input = "# header\ndata_x # heading comment\n_a 1 # trailing\n# full line\n_b # before value\n2\n";
    let doc = parse(input).unwrap();
    assert_eq!(strings(&doc, "x", "_a"), ["1"]);
    assert_eq!(strings(&doc, "x", "_b"), ["2"]);
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_missing_value() {
    let err = parse("data_x\n_a\n").unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::Syntax);
    assert_eq!(err.message, "Malformed or missing value.");
    assert_eq!(err.position.unwrap().line, 3);
}

#[test]
fn test_tag_at_end_of_input() {
    let err = parse("data_x\n_a").unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::Syntax);
}

#[test]
fn test_value_cannot_start_with_reserved_word_or_sigil() {
    for input in ["data_x\n_a data_y\n", "data_x\n_a $ref\n", "data_x\n_a loop_\n"] {
        let err = parse(input).unwrap_err();
        assert_eq!(err.message, "Malformed or missing value.", "{input:?}");
    }
}

#[test]
fn test_unterminated_quote_reports_line_and_column() {
    let err = parse("data_x\n_a 'unterminated\n_b 2\n").unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::Syntax);
    let pos = err.position.unwrap();
    assert_eq!((pos.line, pos.column), (2, 17));
    assert_eq!(err.line.as_deref(), Some("_a 'unterminated"));
    assert!(err.to_string().ends_with("\n_a 'unterminated\n                ^"));
}

#[test]
fn test_unterminated_text_field() {
    let err = parse("data_x\n_a\n;never closed\n").unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::Syntax);
    assert!(err.message.contains("text field"));
    assert_eq!(err.position.unwrap().line, 4);
}

#[test]
fn test_non_ascii_outside_text_field() {
    assert!(parse("data_x\n_a 'naïve'\n").is_err());
    assert!(parse("data_x\n_a naïve\n").is_err());
    let doc = parse("data_x\n_a\n;naïve\n;\n").unwrap();
    assert_eq!(strings(&doc, "x", "_a"), ["naïve"]);
}

#[test]
fn test_content_before_first_block() {
    let err = parse("_a 1\ndata_x\n").unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::Syntax);
    let pos = err.position.unwrap();
    assert_eq!((pos.line, pos.column), (1, 1));
}

#[test]
fn test_global_block_is_rejected() {
    let err = parse("data_x\n_a 1\nglobal_\n").unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::Syntax);
    assert_eq!(err.position.unwrap().line, 3);
}

#[test]
fn test_save_frame_not_supported() {
    let err = parse("data_x\n_a 1\nsave_frame1\n_b 2\nsave_\n").unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::Unsupported);
    assert!(err.message.contains("not supported"));
    let pos = err.position.unwrap();
    assert_eq!((pos.line, pos.column), (3, 1));
}

#[test]
fn test_duplicate_tag_scalar_and_loop() {
    let err = parse("data_x\n_a 1\nloop_\n_a\n_b\n1 2\n").unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::DuplicateTag);
    assert_eq!(err.message, "Duplicate tags encountered: x: _a \n");
    assert!(err.position.is_none());
}

#[test]
fn test_duplicate_tags_aggregated_across_blocks() {
    let input = "data_one\n_a 1\n_A 2\ndata_two\nloop_\n_b\n1\nloop_\n_b\n_c\n1 2\n_c 3\n";
    let err = parse(input).unwrap_err();
    assert_eq!(
        err.message,
        "Duplicate tags encountered: one: _a \ntwo: _b _c \n"
    );
}

#[test]
fn test_duplicate_block_name() {
    let err = parse("data_a\n_x 1\ndata_A\n_y 2\n").unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::DuplicateBlock);
    assert_eq!(err.position.unwrap().line, 3);
}

#[test]
fn test_parse_error_display_without_position() {
    let err = ParseError::syntax("bad input");
    assert_eq!(err.to_string(), "bad input");
}

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn test_parser_configuration() {
    let parser = Parser::new()
        .with_logger(Logger::new(Verbosity::Everything))
        .with_overwrite(false)
        .with_source("memory.cif");
    let mut doc = parser.parse("data_x\n_a 1\n").unwrap();
    assert_eq!(doc.source(), Some("memory.cif"));
    assert!(!doc.overwrite());

    let block = doc.get_mut("x").unwrap();
    assert!(!block.overwrite());
    assert_eq!(
        block.add_item("_a", "2"),
        Err(DocumentError::TagExists("_a".to_string()))
    );
}

#[test]
fn test_default_parser_allows_overwrite() {
    let mut doc = parse("data_x\n_a 1\n").unwrap();
    assert_eq!(doc.source(), None);
    let block = doc.get_mut("x").unwrap();
    block.add_item("_a", "2").unwrap();
    assert_eq!(block.get("_a").unwrap().strings(), ["2"]);
}

#[test]
fn test_logger_levels() {
    let logger = Logger::new(Verbosity::All);
    assert!(logger.enabled(Verbosity::Some));
    assert!(logger.enabled(Verbosity::All));
    assert!(!logger.enabled(Verbosity::Everything));
    assert!(!logger.enabled(Verbosity::None));
    assert!(!Logger::silent().enabled(Verbosity::Some));
    assert_eq!(Logger::default(), Logger::silent());
    assert_eq!(Verbosity::default(), Verbosity::None);
    assert_eq!(Verbosity::from_name("EVERYTHING"), Some(Verbosity::Everything));
    assert_eq!(Verbosity::from_name("1"), Some(Verbosity::Some));
    assert_eq!(Verbosity::from_name("loud"), None);
}

#[test]
fn test_read_file() {
    let path = std::env::temp_dir().join(format!("cifdoc-read-{}.cif", std::process::id()));
    std::fs::write(&path, "data_file\n_a 1\n").unwrap();
    let doc = read_file(&path).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(doc.source(), Some(path.display().to_string().as_str()));
    assert_eq!(strings(&doc, "file", "_a"), ["1"]);
}

#[test]
fn test_read_missing_file() {
    let err = read_file("/nonexistent/cifdoc/missing.cif").unwrap_err();
    assert!(matches!(err, ReadError::Io { .. }));
    assert!(err.to_string().contains("missing.cif"));
}

// ============================================================================
// Custom Actions
// ============================================================================

#[derive(Default)]
struct Counter<'a> {
    blocks: Vec<&'a str>,
    tags: usize,
    values: usize,
    loops: usize,
    save_frames: usize,
}

impl<'a> Actions<'a> for Counter<'a> {
    fn block_code(&mut self, name: &'a str) -> Result<(), ParseError> {
        self.blocks.push(name);
        Ok(())
    }

    fn save_frame_heading(&mut self, _name: &'a str) -> Result<(), ParseError> {
        self.save_frames += 1;
        Ok(())
    }

    fn item_tag(&mut self, _tag: &'a str) {
        self.tags += 1;
    }

    fn item_value(&mut self, _value: cifdoc_core::lexer::Value<'a>) {
        self.values += 1;
    }

    fn loop_start(&mut self) {
        self.loops += 1;
    }

    fn loop_tag(&mut self, _tag: &'a str) {
        self.tags += 1;
    }

    fn loop_value(&mut self, _value: cifdoc_core::lexer::Value<'a>) {
        self.values += 1;
    }

    fn loop_end(&mut self) -> Result<(), ParseError> {
        Ok(())
    }
}

#[test]
fn test_custom_actions_receive_every_production() {
    let input = "data_a\n_x 1\nloop_\n_y\n_z\n1 2 3\nsave_inner\n_w 4\nsave_\ndata_b\n";
    let mut counter = Counter::default();
    Parser::new().parse_with(input, &mut counter).unwrap();
    assert_eq!(counter.blocks, ["a", "b"]);
    assert_eq!(counter.tags, 4);
    assert_eq!(counter.values, 5);
    assert_eq!(counter.loops, 1);
    assert_eq!(counter.save_frames, 1);
}

#[test]
fn test_unclosed_save_frame() {
    let mut counter = Counter::default();
    let err = Parser::new()
        .parse_with("data_a\nsave_inner\n_w 4\n", &mut counter)
        .unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::Syntax);
}

// ============================================================================
// Lexer
// ============================================================================

#[test]
fn test_lexer_value_kinds() {
    let cases = [
        ("1.5(2) ", ValueKind::Numeric, "1.5(2)"),
        ("1.5(2)", ValueKind::Unquoted, "1.5(2)"),
        ("abc$def ", ValueKind::Unquoted, "abc$def"),
        ("'a b' ", ValueKind::SingleQuoted, "a b"),
        ("\"a b\"", ValueKind::DoubleQuoted, "a b"),
        (";x\n;", ValueKind::TextField, "x"),
    ];
    for (input, kind, text) in cases {
        let mut cursor = Cursor::new(input);
        let value = cursor.value().unwrap().unwrap();
        assert_eq!(value.kind, kind, "{input:?}");
        assert_eq!(value.text, text, "{input:?}");
    }
}

#[test]
fn test_lexer_rejects_reserved_and_sigils() {
    for input in ["_tag", "$x", "#c", "data_x", "LOOP_", "save_f", "stop_", "global_"] {
        let mut cursor = Cursor::new(input);
        assert!(cursor.value().unwrap().is_none(), "{input:?}");
        assert_eq!(cursor.offset(), 0);
    }
}
