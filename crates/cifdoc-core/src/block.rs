//! A data block: scalar pairs and loops under case-insensitive tags.
//!
//! Values are stored once, keyed by lower-cased tag. Loops only record
//! which tags they group, and the item order records where each scalar tag
//! and each loop is printed. Every tag is either a scalar in the item order
//! or a column of exactly one loop.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::error::DocumentError;
use crate::lexer::is_nonblank;
use crate::value::Datavalue;

/// Identifier of a loop within its block. Identifiers start at 1.
pub type LoopId = u32;

/// One entry of the item order. Keys are lower-cased tags.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ItemOrder {
    Tag(String),
    Loop(LoopId),
}

/// Where a tag is printed: as a scalar at `index` in the item order, or as
/// column `index` of loop `loop_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemPosition {
    pub loop_id: Option<LoopId>,
    pub index: usize,
}

/// A resolved location of a tag, valid until the block is next modified.
///
/// `item` indexes the item order; `column` is set for loop members.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemIndex {
    pub item: usize,
    pub column: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    name: String,
    values: HashMap<String, Datavalue>,
    true_case: HashMap<String, String>,
    loops: BTreeMap<LoopId, Vec<String>>,
    order: Vec<ItemOrder>,
    overwrite: bool,
}

#[inline]
fn key_of(tag: &str) -> String {
    tag.to_ascii_lowercase()
}

/// Block names are one or more non-blank characters.
pub(crate) fn validate_block_name(name: &str) -> Result<(), DocumentError> {
    if name.is_empty() || !name.bytes().all(is_nonblank) {
        return Err(DocumentError::IllegalBlockName(name.to_string()));
    }
    Ok(())
}

/// Tags are `_` followed by at least one non-blank character.
fn validate_tag(tag: &str) -> Result<(), DocumentError> {
    let bytes = tag.as_bytes();
    if bytes.len() < 2 || bytes[0] != b'_' || !bytes.iter().all(|&b| is_nonblank(b)) {
        return Err(DocumentError::IllegalTag(tag.to_string()));
    }
    Ok(())
}

/// Move `items[from]` to `to`, clamping `to` to the end of the list.
fn move_element<T>(items: &mut Vec<T>, from: usize, to: usize) {
    if from >= items.len() {
        return;
    }
    let item = items.remove(from);
    let to = to.min(items.len());
    items.insert(to, item);
}

impl Block {
    /// Create an empty block that allows overwriting.
    ///
    /// Fails with [`DocumentError::IllegalBlockName`] unless `name` is one or
    /// more non-blank characters.
    pub fn new(name: impl Into<String>) -> Result<Self, DocumentError> {
        let name = name.into();
        validate_block_name(&name)?;
        Ok(Self::named(name))
    }

    /// A block whose name has already been checked.
    pub(crate) fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: HashMap::new(),
            true_case: HashMap::new(),
            loops: BTreeMap::new(),
            order: Vec::new(),
            overwrite: true,
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether `add_item` may replace the values of an existing tag.
    #[inline]
    pub fn overwrite(&self) -> bool {
        self.overwrite
    }

    #[inline]
    pub fn set_overwrite(&mut self, overwrite: bool) {
        self.overwrite = overwrite;
    }

    /// Number of tags.
    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn clear(&mut self) {
        self.values.clear();
        self.true_case.clear();
        self.loops.clear();
        self.order.clear();
    }

    #[inline]
    pub fn contains(&self, tag: &str) -> bool {
        self.values.contains_key(&key_of(tag))
    }

    #[inline]
    pub fn find(&self, tag: &str) -> Option<&Datavalue> {
        self.values.get(&key_of(tag))
    }

    pub fn get(&self, tag: &str) -> Result<&Datavalue, DocumentError> {
        self.find(tag)
            .ok_or_else(|| DocumentError::NoSuchTag(tag.to_string()))
    }

    /// Mutable access to a tag's values.
    ///
    /// Changing the length of a loop column here is not checked; see
    /// [`Block::invalid_loop_lengths`].
    pub fn get_mut(&mut self, tag: &str) -> Result<&mut Datavalue, DocumentError> {
        self.values
            .get_mut(&key_of(tag))
            .ok_or_else(|| DocumentError::NoSuchTag(tag.to_string()))
    }

    /// Number of values stored for `tag`.
    pub fn size_of(&self, tag: &str) -> Result<usize, DocumentError> {
        self.get(tag).map(Datavalue::len)
    }

    /// The spelling `tag` was last written with.
    pub fn true_case(&self, tag: &str) -> Option<&str> {
        self.true_case.get(&key_of(tag)).map(String::as_str)
    }

    /// True-case tags in item order, loops expanded column by column.
    pub fn tags(&self) -> impl DoubleEndedIterator<Item = &str> + '_ {
        self.iter().map(|(tag, _)| tag)
    }

    /// Values in item order, loops expanded column by column.
    pub fn values(&self) -> impl DoubleEndedIterator<Item = &Datavalue> + '_ {
        self.iter().map(|(_, value)| value)
    }

    // ========================================================================
    // Loops
    // ========================================================================

    /// The loop `tag` belongs to, if any.
    pub fn loop_id(&self, tag: &str) -> Option<LoopId> {
        self.loop_id_of(&key_of(tag))
    }

    #[inline]
    pub fn is_in_loop(&self, tag: &str) -> bool {
        self.loop_id(tag).is_some()
    }

    /// True-case tags of the loop containing `tag`, in column order.
    pub fn loop_tags(&self, tag: &str) -> Result<Vec<&str>, DocumentError> {
        let id = self.require_loop(tag)?;
        Ok(self.loops[&id].iter().map(|key| self.display_tag(key)).collect())
    }

    /// A view of the loop containing `tag`.
    pub fn get_loop(&self, tag: &str) -> Result<Loop<'_>, DocumentError> {
        let id = self.require_loop(tag)?;
        Ok(Loop {
            block: self,
            id,
            keys: &self.loops[&id],
        })
    }

    /// Group existing tags into a new loop, appended to the item order.
    ///
    /// The tags are taken out of whatever loop or scalar position they had;
    /// loops left without columns are removed. Fails without changing the
    /// block if a tag is missing or repeated, or if the tags hold different
    /// numbers of values.
    pub fn create_loop<T: AsRef<str>>(&mut self, tags: &[T]) -> Result<LoopId, DocumentError> {
        let keys = self.distinct_keys(tags)?;
        let mut expected: Option<(&str, usize)> = None;
        for (tag, key) in tags.iter().zip(&keys) {
            let tag = tag.as_ref();
            let len = self
                .values
                .get(key)
                .ok_or_else(|| DocumentError::NoSuchTag(tag.to_string()))?
                .len();
            match expected {
                None => expected = Some((tag, len)),
                Some((first, n)) if n != len => {
                    return Err(DocumentError::LoopLengthMismatch(format!(
                        "{} has {} values and {} has {}",
                        first, n, tag, len
                    )));
                }
                Some(_) => {}
            }
        }
        Ok(self.create_loop_unchecked(keys))
    }

    /// Move `new_tag` into the loop that contains `member`.
    ///
    /// Does nothing if it is already there. `new_tag` must hold as many values
    /// as the loop has rows.
    pub fn add_name_to_loop(&mut self, new_tag: &str, member: &str) -> Result<LoopId, DocumentError> {
        let new_key = key_of(new_tag);
        let new_len = self
            .values
            .get(&new_key)
            .ok_or_else(|| DocumentError::NoSuchTag(new_tag.to_string()))?
            .len();
        let id = self.require_loop(member)?;
        if self.loops[&id].contains(&new_key) {
            return Ok(id);
        }
        let rows = self.size_of(member)?;
        if new_len != rows {
            return Err(DocumentError::LoopLengthMismatch(format!(
                "{} new values and {} existing values",
                new_len, rows
            )));
        }

        self.detach(&new_key);
        if let Some(keys) = self.loops.get_mut(&id) {
            keys.push(new_key);
        }
        Ok(id)
    }

    /// Tags of every loop whose columns hold different numbers of values.
    pub fn invalid_loop_lengths(&self) -> Vec<&str> {
        self.loops
            .values()
            .filter(|keys| {
                let mut lens = keys.iter().map(|key| self.values.get(key).map_or(0, Datavalue::len));
                match lens.next() {
                    Some(first) => lens.any(|len| len != first),
                    None => false,
                }
            })
            .flat_map(move |keys| keys.iter().map(move |key| self.display_tag(key)))
            .collect()
    }

    /// The value of `other` on the same loop row where `tag` has `value`.
    ///
    /// Both tags must be columns of the same loop. The first matching row wins.
    pub fn associated_value(&self, tag: &str, value: &str, other: &str) -> Result<&str, DocumentError> {
        let column = self.get(tag)?;
        let other_column = self.get(other)?;
        let id = self.require_loop(tag)?;
        if self.require_loop(other)? != id {
            return Err(DocumentError::DifferentLoops(other.to_string(), tag.to_string()));
        }
        column
            .iter()
            .position(|s| s == value)
            .and_then(|row| other_column.get(row))
            .ok_or_else(|| DocumentError::ValueNotFound {
                tag: tag.to_string(),
                value: value.to_string(),
            })
    }

    // ========================================================================
    // Items
    // ========================================================================

    /// Set the values of `tag`, adding it as a scalar at the end of the item
    /// order if it is new.
    ///
    /// An existing tag keeps its position and loop membership; replacing it
    /// requires overwriting to be enabled, and a loop column must keep the
    /// loop's row count.
    pub fn add_item(&mut self, tag: &str, value: impl Into<Datavalue>) -> Result<(), DocumentError> {
        let value = value.into();
        validate_tag(tag)?;
        let key = key_of(tag);
        if self.values.contains_key(&key) {
            if !self.overwrite {
                return Err(DocumentError::TagExists(tag.to_string()));
            }
            self.check_loop_lengths(&[(key.as_str(), value.len())])?;
        }
        self.insert(tag, key, value);
        Ok(())
    }

    /// Add several items at once. Either every item is added or none is.
    pub fn add_items<T: AsRef<str>>(&mut self, tags: &[T], values: Vec<Datavalue>) -> Result<(), DocumentError> {
        let keys = self.check_new_items(tags, &values)?;
        let updates: Vec<(&str, usize)> = keys
            .iter()
            .zip(&values)
            .filter(|(key, _)| self.values.contains_key(key.as_str()))
            .map(|(key, value)| (key.as_str(), value.len()))
            .collect();
        self.check_loop_lengths(&updates)?;

        for ((tag, key), value) in tags.iter().zip(keys).zip(values) {
            self.insert(tag.as_ref(), key, value);
        }
        Ok(())
    }

    /// Add several items and group them into a new loop. Either the whole
    /// loop is created or the block is left unchanged.
    pub fn add_items_as_loop<T: AsRef<str>>(
        &mut self,
        tags: &[T],
        values: Vec<Datavalue>,
    ) -> Result<LoopId, DocumentError> {
        let keys = self.check_new_items(tags, &values)?;
        if keys.is_empty() {
            return Err(DocumentError::EmptyLoop);
        }
        if let Some(first) = values.first() {
            if let Some((i, value)) = values.iter().enumerate().find(|(_, v)| v.len() != first.len()) {
                return Err(DocumentError::LoopLengthMismatch(format!(
                    "{} has {} values and {} has {}",
                    tags[0].as_ref(),
                    first.len(),
                    tags[i].as_ref(),
                    value.len()
                )));
            }
        }

        for ((tag, key), value) in tags.iter().zip(keys.iter().cloned()).zip(values) {
            self.insert(tag.as_ref(), key, value);
        }
        Ok(self.create_loop_unchecked(keys))
    }

    /// Remove `tag`, deleting its loop if it was the last column.
    pub fn remove_item(&mut self, tag: &str) -> Result<Datavalue, DocumentError> {
        let key = key_of(tag);
        let value = self
            .values
            .remove(&key)
            .ok_or_else(|| DocumentError::NoSuchTag(tag.to_string()))?;
        self.detach(&key);
        self.true_case.remove(&key);
        Ok(value)
    }

    /// Move `tag` to `index` in the item order, or to column `index` if it is
    /// in a loop. Out-of-range indices move it to the end.
    pub fn change_item_position(&mut self, tag: &str, index: usize) -> Result<(), DocumentError> {
        let position = self
            .item_position(tag)
            .ok_or_else(|| DocumentError::NoSuchTag(tag.to_string()))?;
        match position.loop_id {
            Some(id) => {
                if let Some(keys) = self.loops.get_mut(&id) {
                    move_element(keys, position.index, index);
                }
            }
            None => move_element(&mut self.order, position.index, index),
        }
        Ok(())
    }

    /// Move the loop containing `tag` to `index` in the item order.
    /// Out-of-range indices move it to the end.
    pub fn change_loop_position(&mut self, tag: &str, index: usize) -> Result<(), DocumentError> {
        let id = self.require_loop(tag)?;
        if let Some(from) = self.order.iter().position(|o| *o == ItemOrder::Loop(id)) {
            move_element(&mut self.order, from, index);
        }
        Ok(())
    }

    pub fn item_position(&self, tag: &str) -> Option<ItemPosition> {
        let key = key_of(tag);
        if !self.values.contains_key(&key) {
            return None;
        }
        match self.loop_id_of(&key) {
            Some(id) => Some(ItemPosition {
                loop_id: Some(id),
                index: self.loops[&id].iter().position(|k| *k == key)?,
            }),
            None => Some(ItemPosition {
                loop_id: None,
                index: self.order.iter().position(|o| matches!(o, ItemOrder::Tag(k) if *k == key))?,
            }),
        }
    }

    /// Resolve `tag` to an index usable with [`Block::value_at`].
    pub fn find_item(&self, tag: &str) -> Option<ItemIndex> {
        let position = self.item_position(tag)?;
        match position.loop_id {
            Some(id) => Some(ItemIndex {
                item: self.order.iter().position(|o| *o == ItemOrder::Loop(id))?,
                column: Some(position.index),
            }),
            None => Some(ItemIndex {
                item: position.index,
                column: None,
            }),
        }
    }

    pub fn value_at(&self, index: ItemIndex) -> Option<&Datavalue> {
        match (self.order.get(index.item)?, index.column) {
            (ItemOrder::Tag(key), None) => self.values.get(key),
            (ItemOrder::Loop(id), Some(column)) => self.values.get(self.loops.get(id)?.get(column)?),
            _ => None,
        }
    }

    // ========================================================================
    // Iteration
    // ========================================================================

    /// `(true-case tag, values)` in item order, loops expanded column by column.
    pub fn iter(&self) -> Entries<'_> {
        Entries {
            block: self,
            order: self.order.iter(),
            front: Default::default(),
            back: Default::default(),
        }
    }

    /// Scalar pairs and loops in item order.
    pub fn items(&self) -> Items<'_> {
        Items {
            block: self,
            order: self.order.iter(),
        }
    }

    // ========================================================================
    // Parser hooks
    // ========================================================================

    pub(crate) fn seal_pair(&mut self, tag: &str, value: Datavalue) {
        let key = key_of(tag);
        self.values.insert(key.clone(), value);
        self.true_case.insert(key.clone(), tag.to_string());
        self.order.push(ItemOrder::Tag(key));
    }

    pub(crate) fn seal_loop(&mut self, columns: Vec<(&str, Datavalue)>) -> LoopId {
        let id = self.next_loop_id();
        let mut keys = Vec::with_capacity(columns.len());
        for (tag, value) in columns {
            let key = key_of(tag);
            self.values.insert(key.clone(), value);
            self.true_case.insert(key.clone(), tag.to_string());
            keys.push(key);
        }
        self.loops.insert(id, keys);
        self.order.push(ItemOrder::Loop(id));
        id
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn loop_id_of(&self, key: &str) -> Option<LoopId> {
        self.loops
            .iter()
            .find(|(_, keys)| keys.iter().any(|k| k == key))
            .map(|(&id, _)| id)
    }

    fn require_loop(&self, tag: &str) -> Result<LoopId, DocumentError> {
        if !self.contains(tag) {
            return Err(DocumentError::NoSuchTag(tag.to_string()));
        }
        self.loop_id(tag)
            .ok_or_else(|| DocumentError::NotInLoop(tag.to_string()))
    }

    fn next_loop_id(&self) -> LoopId {
        self.loops.keys().next_back().map_or(1, |id| id + 1)
    }

    fn display_tag<'s>(&'s self, key: &'s str) -> &'s str {
        self.true_case.get(key).map_or(key, String::as_str)
    }

    fn keys_of<'s>(&'s self, entry: &'s ItemOrder) -> &'s [String] {
        match entry {
            ItemOrder::Tag(key) => std::slice::from_ref(key),
            ItemOrder::Loop(id) => self.loops.get(id).map(Vec::as_slice).unwrap_or_default(),
        }
    }

    fn entry<'s>(&'s self, key: &'s str) -> Option<(&'s str, &'s Datavalue)> {
        Some((self.display_tag(key), self.values.get(key)?))
    }

    /// Lower-cased keys of `tags`, rejecting an empty list and repeats.
    fn distinct_keys<T: AsRef<str>>(&self, tags: &[T]) -> Result<Vec<String>, DocumentError> {
        if tags.is_empty() {
            return Err(DocumentError::EmptyLoop);
        }
        let mut seen = HashSet::with_capacity(tags.len());
        tags.iter()
            .map(|tag| {
                let key = key_of(tag.as_ref());
                if seen.insert(key.clone()) {
                    Ok(key)
                } else {
                    Err(DocumentError::DuplicateTag(tag.as_ref().to_string()))
                }
            })
            .collect()
    }

    /// Shared preconditions of `add_items` and `add_items_as_loop`.
    fn check_new_items<T: AsRef<str>>(&self, tags: &[T], values: &[Datavalue]) -> Result<Vec<String>, DocumentError> {
        if tags.len() != values.len() {
            return Err(DocumentError::TagValueMismatch {
                tags: tags.len(),
                values: values.len(),
            });
        }
        if tags.is_empty() {
            return Ok(Vec::new());
        }
        for tag in tags {
            validate_tag(tag.as_ref())?;
        }
        let keys = self.distinct_keys(tags)?;
        if !self.overwrite {
            if let Some(tag) = tags.iter().zip(&keys).find(|(_, key)| self.values.contains_key(*key)) {
                return Err(DocumentError::TagExists(tag.0.as_ref().to_string()));
            }
        }
        Ok(keys)
    }

    /// Check that replacing the lengths in `updates` keeps every affected
    /// loop rectangular.
    fn check_loop_lengths(&self, updates: &[(&str, usize)]) -> Result<(), DocumentError> {
        let touched: HashSet<LoopId> = updates
            .iter()
            .filter_map(|(key, _)| self.loop_id_of(key))
            .collect();
        for id in touched {
            let mut lens = self.loops[&id].iter().map(|key| {
                let len = updates
                    .iter()
                    .find(|(k, _)| *k == key.as_str())
                    .map(|&(_, len)| len)
                    .unwrap_or_else(|| self.values.get(key).map_or(0, Datavalue::len));
                (key, len)
            });
            if let Some((first, n)) = lens.next() {
                if let Some((key, len)) = lens.find(|&(_, len)| len != n) {
                    return Err(DocumentError::LoopLengthMismatch(format!(
                        "{} would have {} values and {} has {}",
                        self.display_tag(key),
                        len,
                        self.display_tag(first),
                        n
                    )));
                }
            }
        }
        Ok(())
    }

    fn insert(&mut self, tag: &str, key: String, value: Datavalue) {
        if !self.values.contains_key(&key) {
            self.order.push(ItemOrder::Tag(key.clone()));
        }
        self.true_case.insert(key.clone(), tag.to_string());
        self.values.insert(key, value);
    }

    /// Take `key` out of its loop or scalar position. Values are kept.
    fn detach(&mut self, key: &str) {
        match self.loop_id_of(key) {
            Some(id) => {
                let now_empty = self.loops.get_mut(&id).is_some_and(|keys| {
                    keys.retain(|k| k != key);
                    keys.is_empty()
                });
                if now_empty {
                    self.loops.remove(&id);
                    self.order.retain(|o| *o != ItemOrder::Loop(id));
                }
            }
            None => self.order.retain(|o| !matches!(o, ItemOrder::Tag(k) if k == key)),
        }
    }

    fn create_loop_unchecked(&mut self, keys: Vec<String>) -> LoopId {
        for key in &keys {
            self.detach(key);
        }
        let id = self.next_loop_id();
        self.loops.insert(id, keys);
        self.order.push(ItemOrder::Loop(id));
        id
    }
}

// ============================================================================
// Views
// ============================================================================

/// A scalar or a loop, borrowed from its block.
#[derive(Debug, Clone, Copy)]
pub enum Item<'b> {
    Pair(Pair<'b>),
    Loop(Loop<'b>),
}

#[derive(Debug, Clone, Copy)]
pub struct Pair<'b> {
    pub tag: &'b str,
    pub value: &'b Datavalue,
}

/// A loop, borrowed from its block.
#[derive(Debug, Clone, Copy)]
pub struct Loop<'b> {
    block: &'b Block,
    id: LoopId,
    keys: &'b [String],
}

impl<'b> Loop<'b> {
    #[inline]
    pub fn id(&self) -> LoopId {
        self.id
    }

    /// Number of columns.
    #[inline]
    pub fn width(&self) -> usize {
        self.keys.len()
    }

    /// Number of rows, taken from the longest column.
    pub fn row_count(&self) -> usize {
        self.columns().map(|(_, value)| value.len()).max().unwrap_or(0)
    }

    pub fn tags(&self) -> impl Iterator<Item = &'b str> + 'b {
        let (block, keys) = (self.block, self.keys);
        keys.iter().map(move |key| block.display_tag(key))
    }

    pub fn columns(&self) -> impl Iterator<Item = (&'b str, &'b Datavalue)> + 'b {
        let (block, keys) = (self.block, self.keys);
        keys.iter().filter_map(move |key| block.entry(key))
    }

    /// Rows in order. A cell missing from a short column reads as `?`.
    pub fn rows(&self) -> Rows<'b> {
        Rows {
            columns: self.columns().map(|(_, value)| value).collect(),
            next: 0,
            end: self.row_count(),
        }
    }
}

/// Row-major iterator over a loop.
#[derive(Debug, Clone)]
pub struct Rows<'b> {
    columns: Vec<&'b Datavalue>,
    next: usize,
    end: usize,
}

impl<'b> Rows<'b> {
    fn row(&self, index: usize) -> Vec<&'b str> {
        self.columns
            .iter()
            .map(|&column| column.get(index).unwrap_or("?"))
            .collect()
    }
}

impl<'b> Iterator for Rows<'b> {
    type Item = Vec<&'b str>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.end {
            return None;
        }
        let row = self.row(self.next);
        self.next += 1;
        Some(row)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.end - self.next;
        (n, Some(n))
    }
}

impl DoubleEndedIterator for Rows<'_> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.next >= self.end {
            return None;
        }
        self.end -= 1;
        Some(self.row(self.end))
    }
}

impl ExactSizeIterator for Rows<'_> {}

/// Iterator over the items of a block.
#[derive(Debug, Clone)]
pub struct Items<'b> {
    block: &'b Block,
    order: std::slice::Iter<'b, ItemOrder>,
}

impl<'b> Items<'b> {
    fn view(&self, entry: &'b ItemOrder) -> Option<Item<'b>> {
        match entry {
            ItemOrder::Tag(key) => {
                let (tag, value) = self.block.entry(key)?;
                Some(Item::Pair(Pair { tag, value }))
            }
            ItemOrder::Loop(id) => Some(Item::Loop(Loop {
                block: self.block,
                id: *id,
                keys: self.block.loops.get(id)?,
            })),
        }
    }
}

impl<'b> Iterator for Items<'b> {
    type Item = Item<'b>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = self.order.next()?;
            if let Some(item) = self.view(entry) {
                return Some(item);
            }
        }
    }
}

impl DoubleEndedIterator for Items<'_> {
    fn next_back(&mut self) -> Option<Self::Item> {
        loop {
            let entry = self.order.next_back()?;
            if let Some(item) = self.view(entry) {
                return Some(item);
            }
        }
    }
}

/// Iterator over `(tag, values)` of a block, loops expanded column by column.
#[derive(Debug, Clone)]
pub struct Entries<'b> {
    block: &'b Block,
    order: std::slice::Iter<'b, ItemOrder>,
    front: std::slice::Iter<'b, String>,
    back: std::slice::Iter<'b, String>,
}

impl<'b> Iterator for Entries<'b> {
    type Item = (&'b str, &'b Datavalue);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(key) = self.front.next() {
                match self.block.entry(key) {
                    Some(entry) => return Some(entry),
                    None => continue,
                }
            }
            match self.order.next() {
                Some(entry) => self.front = self.block.keys_of(entry).iter(),
                None => {
                    let key = self.back.next()?;
                    if let Some(entry) = self.block.entry(key) {
                        return Some(entry);
                    }
                }
            }
        }
    }
}

impl DoubleEndedIterator for Entries<'_> {
    fn next_back(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(key) = self.back.next_back() {
                match self.block.entry(key) {
                    Some(entry) => return Some(entry),
                    None => continue,
                }
            }
            match self.order.next_back() {
                Some(entry) => self.back = self.block.keys_of(entry).iter(),
                None => {
                    let key = self.front.next_back()?;
                    if let Some(entry) = self.block.entry(key) {
                        return Some(entry);
                    }
                }
            }
        }
    }
}

impl<'b> IntoIterator for &'b Block {
    type Item = (&'b str, &'b Datavalue);
    type IntoIter = Entries<'b>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
