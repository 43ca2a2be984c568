//! Builds a [`Document`] from grammar actions.
//!
//! While parsing, the builder keeps borrowed slices of the input grouped by
//! block and item. The last block is the one being filled, and the last item
//! of that block is the pair or loop receiving values. Nothing is copied into
//! the document model until [`DocumentBuilder::finish`] has checked every
//! block for repeated tags.

use std::collections::HashMap;

use crate::block::Block;
use crate::document::Document;
use crate::error::ParseError;
use crate::lexer::Value;
use crate::logging::{Logger, Verbosity};
use crate::parser::Actions;
use crate::value::Datavalue;

#[derive(Debug)]
enum RawItem<'a> {
    Pair {
        tag: &'a str,
        values: Vec<&'a str>,
    },
    Loop {
        columns: Vec<(&'a str, Vec<&'a str>)>,
    },
}

#[derive(Debug)]
struct RawBlock<'a> {
    name: &'a str,
    items: Vec<RawItem<'a>>,
}

/// Parse actions that assemble a [`Document`].
#[derive(Debug)]
pub struct DocumentBuilder<'a> {
    logger: Logger,
    overwrite: bool,
    blocks: Vec<RawBlock<'a>>,
    /// Column receiving the next loop value.
    current_append: usize,
    /// Values seen by the loop being filled.
    total_values: usize,
}

impl<'a> DocumentBuilder<'a> {
    pub fn new(logger: Logger, overwrite: bool) -> Self {
        Self {
            logger,
            overwrite,
            blocks: Vec::new(),
            current_append: 0,
            total_values: 0,
        }
    }

    #[inline]
    fn items(&mut self) -> Option<&mut Vec<RawItem<'a>>> {
        let items = self.blocks.last_mut().map(|block| &mut block.items);
        debug_assert!(items.is_some(), "item matched outside a data block");
        items
    }

    #[inline]
    fn current_loop(&mut self) -> Option<&mut Vec<(&'a str, Vec<&'a str>)>> {
        match self.items().and_then(|items| items.last_mut()) {
            Some(RawItem::Loop { columns }) => Some(columns),
            _ => {
                debug_assert!(false, "loop action without an open loop");
                None
            }
        }
    }

    /// Check every block for repeated tags, then move the collected values
    /// into the document model.
    pub fn finish(self) -> Result<Document, ParseError> {
        let duplicates: Vec<(String, Vec<String>)> = self
            .blocks
            .iter()
            .filter_map(|block| {
                let tags = duplicate_tags(block);
                (!tags.is_empty()).then(|| (block.name.to_string(), tags))
            })
            .collect();
        if !duplicates.is_empty() {
            let error = ParseError::duplicate_tags(&duplicates);
            self.logger.log(Verbosity::Some, &error.message);
            return Err(error);
        }

        let mut document = Document::new();
        document.set_overwrite(self.overwrite);
        for raw in self.blocks {
            let mut block = Block::named(raw.name);
            block.set_overwrite(self.overwrite);
            for item in raw.items {
                match item {
                    RawItem::Pair { tag, values } => {
                        block.seal_pair(tag, values.into_iter().collect());
                    }
                    RawItem::Loop { columns } => {
                        block.seal_loop(
                            columns
                                .into_iter()
                                .map(|(tag, values)| (tag, values.into_iter().collect::<Datavalue>()))
                                .collect(),
                        );
                    }
                }
            }
            document.seal_block(block);
        }
        Ok(document)
    }
}

/// Tags appearing more than once in `block`, compared case-insensitively,
/// in order of first appearance.
fn duplicate_tags(block: &RawBlock<'_>) -> Vec<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut order: Vec<(String, String)> = Vec::new();

    let mut count = |tag: &str| {
        let key = tag.to_ascii_lowercase();
        let n = counts.entry(key.clone()).or_insert(0);
        if *n == 0 {
            order.push((tag.to_string(), key));
        }
        *n += 1;
    };
    for item in &block.items {
        match item {
            RawItem::Pair { tag, .. } => count(tag),
            RawItem::Loop { columns } => {
                for (tag, _) in columns {
                    count(tag);
                }
            }
        }
    }

    order
        .into_iter()
        .filter(|(_, key)| counts.get(key).is_some_and(|&n| n > 1))
        .map(|(tag, _)| tag)
        .collect()
}

impl<'a> Actions<'a> for DocumentBuilder<'a> {
    fn block_code(&mut self, name: &'a str) -> Result<(), ParseError> {
        if self
            .blocks
            .iter()
            .any(|block| block.name.eq_ignore_ascii_case(name))
        {
            return Err(ParseError::duplicate_block(name));
        }
        self.logger
            .log(Verbosity::All, &format!("data block {}", name));
        self.blocks.push(RawBlock {
            name,
            items: Vec::new(),
        });
        Ok(())
    }

    fn item_tag(&mut self, tag: &'a str) {
        if let Some(items) = self.items() {
            items.push(RawItem::Pair {
                tag,
                values: Vec::new(),
            });
        }
    }

    fn item_value(&mut self, value: Value<'a>) {
        if self.logger.enabled(Verbosity::Everything) {
            self.logger
                .log(Verbosity::Everything, &format!("value {:?}", value.text));
        }
        match self.items().and_then(|items| items.last_mut()) {
            Some(RawItem::Pair { values, .. }) => values.push(value.text),
            _ => debug_assert!(false, "value without a preceding tag"),
        }
    }

    fn loop_start(&mut self) {
        self.current_append = 0;
        self.total_values = 0;
        if let Some(items) = self.items() {
            items.push(RawItem::Loop {
                columns: Vec::new(),
            });
        }
    }

    fn loop_tag(&mut self, tag: &'a str) {
        if let Some(columns) = self.current_loop() {
            columns.push((tag, Vec::new()));
        }
    }

    fn loop_value(&mut self, value: Value<'a>) {
        let append = self.current_append;
        let Some(columns) = self.current_loop() else {
            return;
        };
        let width = columns.len();
        if let Some((_, values)) = columns.get_mut(append) {
            values.push(value.text);
        }
        self.current_append = (append + 1) % width.max(1);
        self.total_values += 1;
    }

    fn loop_end(&mut self) -> Result<(), ParseError> {
        let total = self.total_values;
        let width = self.current_loop().map_or(0, |columns| columns.len());
        if width == 0 {
            return Ok(());
        }
        let remainder = total % width;
        if remainder != 0 {
            return Err(ParseError::loop_cardinality(width, remainder));
        }
        self.logger.log(
            Verbosity::All,
            &format!("loop of {} tags x {} rows", width, total / width),
        );
        Ok(())
    }
}
