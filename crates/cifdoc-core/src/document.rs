//! The top-level document: data blocks in file order.

use crate::block::{validate_block_name, Block};
use crate::error::DocumentError;

/// Ordered data blocks with case-insensitively unique names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    blocks: Vec<Block>,
    source: Option<String>,
    overwrite: bool,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self {
            blocks: Vec::new(),
            source: None,
            overwrite: true,
        }
    }

    /// Where the document was read from, if known.
    #[inline]
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn set_source(&mut self, source: impl Into<String>) {
        self.source = Some(source.into());
    }

    #[inline]
    pub fn overwrite(&self) -> bool {
        self.overwrite
    }

    /// Allow or forbid overwriting, here and in every block.
    pub fn set_overwrite(&mut self, overwrite: bool) {
        self.overwrite = overwrite;
        for block in &mut self.blocks {
            block.set_overwrite(overwrite);
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn clear(&mut self) {
        self.blocks.clear();
    }

    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.block_position(name).is_some()
    }

    /// Index of the block called `name`.
    pub fn block_position(&self, name: &str) -> Option<usize> {
        self.blocks
            .iter()
            .position(|block| block.name().eq_ignore_ascii_case(name))
    }

    pub fn find(&self, name: &str) -> Option<&Block> {
        self.block_position(name).map(|i| &self.blocks[i])
    }

    pub fn get(&self, name: &str) -> Result<&Block, DocumentError> {
        self.find(name)
            .ok_or_else(|| DocumentError::NoSuchBlock(name.to_string()))
    }

    pub fn get_mut(&mut self, name: &str) -> Result<&mut Block, DocumentError> {
        let index = self
            .block_position(name)
            .ok_or_else(|| DocumentError::NoSuchBlock(name.to_string()))?;
        Ok(&mut self.blocks[index])
    }

    /// The block called `name`, appending an empty one if there is none.
    ///
    /// An existing block is only handed out when overwriting is allowed.
    pub fn add_block(&mut self, name: &str) -> Result<&mut Block, DocumentError> {
        validate_block_name(name)?;
        let index = match self.block_position(name) {
            Some(_) if !self.overwrite => {
                return Err(DocumentError::BlockExists(name.to_string()));
            }
            Some(index) => index,
            None => {
                let mut block = Block::named(name);
                block.set_overwrite(self.overwrite);
                self.blocks.push(block);
                self.blocks.len() - 1
            }
        };
        Ok(&mut self.blocks[index])
    }

    /// Add `block`, replacing a block of the same name in place when
    /// overwriting is allowed.
    pub fn insert_block(&mut self, block: Block) -> Result<(), DocumentError> {
        match self.block_position(block.name()) {
            Some(_) if !self.overwrite => Err(DocumentError::BlockExists(block.name().to_string())),
            Some(index) => {
                self.blocks[index] = block;
                Ok(())
            }
            None => {
                self.blocks.push(block);
                Ok(())
            }
        }
    }

    pub fn remove_block(&mut self, name: &str) -> Result<Block, DocumentError> {
        let index = self
            .block_position(name)
            .ok_or_else(|| DocumentError::NoSuchBlock(name.to_string()))?;
        Ok(self.blocks.remove(index))
    }

    /// Move the block called `name` to `index`. Out-of-range indices move it
    /// to the end.
    pub fn change_block_position(&mut self, name: &str, index: usize) -> Result<(), DocumentError> {
        let from = self
            .block_position(name)
            .ok_or_else(|| DocumentError::NoSuchBlock(name.to_string()))?;
        let block = self.blocks.remove(from);
        let index = index.min(self.blocks.len());
        self.blocks.insert(index, block);
        Ok(())
    }

    /// The most recently added block.
    #[inline]
    pub fn last_block(&self) -> Option<&Block> {
        self.blocks.last()
    }

    #[inline]
    pub fn last_block_mut(&mut self) -> Option<&mut Block> {
        self.blocks.last_mut()
    }

    /// Block names as written, in order.
    pub fn names(&self) -> impl DoubleEndedIterator<Item = &str> + '_ {
        self.blocks.iter().map(Block::name)
    }

    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, Block> {
        self.blocks.iter()
    }

    #[inline]
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Block> {
        self.blocks.iter_mut()
    }

    pub(crate) fn seal_block(&mut self, block: Block) {
        self.blocks.push(block);
    }
}

impl<'a> IntoIterator for &'a Document {
    type Item = &'a Block;
    type IntoIter = std::slice::Iter<'a, Block>;

    fn into_iter(self) -> Self::IntoIter {
        self.blocks.iter()
    }
}

impl IntoIterator for Document {
    type Item = Block;
    type IntoIter = std::vec::IntoIter<Block>;

    fn into_iter(self) -> Self::IntoIter {
        self.blocks.into_iter()
    }
}
