use indexmap::IndexMap;

use crate::DataMap;
use crate::block::ContentBlock;
use crate::entity::{Entity, EntityMap};
use crate::key::{BlockKey, EntityKey};
use crate::selection::SelectionState;

/// The ordered block store of a document.
///
/// Iteration order *is* document order; that is an invariant of the type,
/// not a side effect of insertion history. Neighbor queries are O(1).
#[derive(Clone, PartialEq, Debug, Default)]
pub struct BlockMap {
    blocks: IndexMap<BlockKey, ContentBlock>,
}

impl BlockMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a map from blocks in document order. Panics on duplicate keys.
    pub fn from_blocks(blocks: Vec<ContentBlock>) -> Self {
        let mut map = IndexMap::with_capacity(blocks.len());
        for block in blocks {
            let key = block.key().clone();
            let replaced = map.insert(key.clone(), block);
            assert!(replaced.is_none(), "duplicate block key `{key}`");
        }
        Self { blocks: map }
    }

    pub fn get(&self, key: &BlockKey) -> Option<&ContentBlock> {
        self.blocks.get(key)
    }

    pub fn contains_key(&self, key: &BlockKey) -> bool {
        self.blocks.contains_key(key)
    }

    pub fn index_of(&self, key: &BlockKey) -> Option<usize> {
        self.blocks.get_index_of(key)
    }

    pub fn get_index(&self, index: usize) -> Option<&ContentBlock> {
        self.blocks.get_index(index).map(|(_, block)| block)
    }

    pub fn key_before(&self, key: &BlockKey) -> Option<&BlockKey> {
        let idx = self.blocks.get_index_of(key)?;
        let (key, _) = self.blocks.get_index(idx.checked_sub(1)?)?;
        Some(key)
    }

    pub fn key_after(&self, key: &BlockKey) -> Option<&BlockKey> {
        let idx = self.blocks.get_index_of(key)?;
        let (key, _) = self.blocks.get_index(idx + 1)?;
        Some(key)
    }

    pub fn first(&self) -> Option<&ContentBlock> {
        self.blocks.first().map(|(_, block)| block)
    }

    pub fn last(&self) -> Option<&ContentBlock> {
        self.blocks.last().map(|(_, block)| block)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&BlockKey, &ContentBlock)> {
        self.blocks.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &BlockKey> {
        self.blocks.keys()
    }

    pub fn blocks(&self) -> impl Iterator<Item = &ContentBlock> {
        self.blocks.values()
    }

    /// Keys from `start` through `end` inclusive, in document order. Panics
    /// if either key is missing or `end` precedes `start`.
    pub fn keys_in_range(&self, start: &BlockKey, end: &BlockKey) -> Vec<BlockKey> {
        let start_idx = self
            .index_of(start)
            .unwrap_or_else(|| panic!("unknown block key `{start}`"));
        let end_idx = self
            .index_of(end)
            .unwrap_or_else(|| panic!("unknown block key `{end}`"));
        assert!(start_idx <= end_idx, "range end precedes range start");
        (start_idx..=end_idx)
            .filter_map(|idx| self.blocks.get_index(idx))
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Replaces the block stored under its own key, keeping its position.
    pub(crate) fn replace(&mut self, block: ContentBlock) {
        let key = block.key().clone();
        assert!(
            self.blocks.contains_key(&key),
            "cannot replace unknown block key `{key}`"
        );
        self.blocks.insert(key, block);
    }

    pub(crate) fn insert_at(&mut self, index: usize, block: ContentBlock) {
        self.blocks.shift_insert(index, block.key().clone(), block);
    }

    pub(crate) fn insert_after(&mut self, after: &BlockKey, block: ContentBlock) {
        let idx = self
            .index_of(after)
            .unwrap_or_else(|| panic!("unknown block key `{after}`"));
        self.insert_at(idx + 1, block);
    }

    pub(crate) fn insert_before(&mut self, before: &BlockKey, block: ContentBlock) {
        let idx = self
            .index_of(before)
            .unwrap_or_else(|| panic!("unknown block key `{before}`"));
        self.insert_at(idx, block);
    }

    pub(crate) fn remove(&mut self, key: &BlockKey) -> Option<ContentBlock> {
        self.blocks.shift_remove(key)
    }

    /// True when `key` lies inside `ancestor`'s subtree, walking parent
    /// links upward.
    pub fn is_descendant_of(&self, key: &BlockKey, ancestor: &BlockKey) -> bool {
        let mut parent = self.get(key).and_then(|block| block.parent());
        while let Some(current) = parent {
            if current == ancestor {
                return true;
            }
            parent = self.get(current).and_then(|block| block.parent());
        }
        false
    }

    /// The contiguous map span of `key` and its descendants, in order.
    pub(crate) fn subtree_keys(&self, key: &BlockKey) -> Vec<BlockKey> {
        let start = self
            .index_of(key)
            .unwrap_or_else(|| panic!("unknown block key `{key}`"));
        let mut span = vec![key.clone()];
        let mut idx = start + 1;
        while let Some((next_key, _)) = self.blocks.get_index(idx) {
            if !self.is_descendant_of(next_key, key) {
                break;
            }
            span.push(next_key.clone());
            idx += 1;
        }
        span
    }

    /// Moves the subtree rooted at `key` to sit immediately after `anchor`,
    /// which must not lie inside the subtree.
    pub(crate) fn move_subtree_after(&mut self, key: &BlockKey, anchor: &BlockKey) {
        let moved = self.detach_subtree(key, anchor);
        let idx = self
            .index_of(anchor)
            .unwrap_or_else(|| panic!("unknown block key `{anchor}`"));
        self.insert_all_at(idx + 1, moved);
    }

    /// Moves the subtree rooted at `key` to sit immediately before `anchor`,
    /// which must not lie inside the subtree.
    pub(crate) fn move_subtree_before(&mut self, key: &BlockKey, anchor: &BlockKey) {
        let moved = self.detach_subtree(key, anchor);
        let idx = self
            .index_of(anchor)
            .unwrap_or_else(|| panic!("unknown block key `{anchor}`"));
        self.insert_all_at(idx, moved);
    }

    fn detach_subtree(&mut self, key: &BlockKey, anchor: &BlockKey) -> Vec<ContentBlock> {
        let span = self.subtree_keys(key);
        assert!(
            !span.contains(anchor),
            "anchor `{anchor}` lies inside the moved subtree"
        );
        span.iter()
            .map(|span_key| {
                self.blocks
                    .shift_remove(span_key)
                    .expect("subtree key exists")
            })
            .collect()
    }

    fn insert_all_at(&mut self, mut index: usize, blocks: Vec<ContentBlock>) {
        for block in blocks {
            self.blocks.shift_insert(index, block.key().clone(), block);
            index += 1;
        }
    }
}

/// One immutable document snapshot: ordered blocks, the entity registry,
/// and the selections bracketing the edit that produced it.
///
/// Every edit operation returns a new `Document`; unchanged blocks are
/// shared between snapshots. The entity registry is owned — two documents
/// never alias mutable entity state.
#[derive(Clone, PartialEq, Debug)]
pub struct Document {
    blocks: BlockMap,
    entities: EntityMap,
    selection_before: SelectionState,
    selection_after: SelectionState,
}

impl Document {
    /// Builds a document from blocks in document order. An empty array
    /// yields a single empty block so a document always has a caret target.
    pub fn from_block_array(blocks: Vec<ContentBlock>) -> Self {
        let blocks = if blocks.is_empty() {
            vec![ContentBlock::new(BlockKey::random())]
        } else {
            blocks
        };
        let map = BlockMap::from_blocks(blocks);
        let first_key = map.first().expect("block map is never empty").key().clone();
        let caret = SelectionState::collapsed(first_key, 0);
        Self {
            blocks: map,
            entities: EntityMap::new(),
            selection_before: caret.clone(),
            selection_after: caret,
        }
    }

    /// One unstyled block per `delimiter`-separated line of `text`.
    pub fn from_plain_text(text: &str, delimiter: &str) -> Self {
        let blocks = text
            .split(delimiter)
            .map(|line| ContentBlock::new(BlockKey::random()).with_text(line))
            .collect();
        Self::from_block_array(blocks)
    }

    pub fn blocks(&self) -> &BlockMap {
        &self.blocks
    }

    pub(crate) fn blocks_mut(&mut self) -> &mut BlockMap {
        &mut self.blocks
    }

    pub fn entity_map(&self) -> &EntityMap {
        &self.entities
    }

    pub fn block_for_key(&self, key: &BlockKey) -> Option<&ContentBlock> {
        self.blocks.get(key)
    }

    /// Panics on an unknown key: a missing block always means the caller is
    /// holding a key from another document version.
    pub fn expect_block(&self, key: &BlockKey) -> &ContentBlock {
        self.blocks
            .get(key)
            .unwrap_or_else(|| panic!("unknown block key `{key}`"))
    }

    pub fn key_before(&self, key: &BlockKey) -> Option<&BlockKey> {
        self.blocks.key_before(key)
    }

    pub fn key_after(&self, key: &BlockKey) -> Option<&BlockKey> {
        self.blocks.key_after(key)
    }

    pub fn block_before(&self, key: &BlockKey) -> Option<&ContentBlock> {
        self.blocks.get(self.blocks.key_before(key)?)
    }

    pub fn block_after(&self, key: &BlockKey) -> Option<&ContentBlock> {
        self.blocks.get(self.blocks.key_after(key)?)
    }

    pub fn first_block(&self) -> &ContentBlock {
        self.blocks.first().expect("block map is never empty")
    }

    pub fn last_block(&self) -> &ContentBlock {
        self.blocks.last().expect("block map is never empty")
    }

    /// Block texts joined by `delimiter`, in document order.
    pub fn plain_text(&self, delimiter: &str) -> String {
        let mut result = String::new();
        for (idx, block) in self.blocks.blocks().enumerate() {
            if idx > 0 {
                result.push_str(delimiter);
            }
            result.push_str(block.text());
        }
        result
    }

    /// False only when the document is a single block whose text is empty
    /// once zero-width spaces are stripped.
    pub fn has_text(&self) -> bool {
        if self.blocks.len() > 1 {
            return true;
        }
        self.first_block()
            .text()
            .chars()
            .any(|ch| ch != '\u{200B}')
    }

    pub fn selection_before(&self) -> &SelectionState {
        &self.selection_before
    }

    pub fn selection_after(&self) -> &SelectionState {
        &self.selection_after
    }

    pub fn with_selection_before(mut self, selection: SelectionState) -> Self {
        self.selection_before = selection;
        self
    }

    pub fn with_selection_after(mut self, selection: SelectionState) -> Self {
        self.selection_after = selection;
        self
    }

    /// Stores `entity` in the registry, returning the new document and key.
    pub fn create_entity(&self, entity: Entity) -> (Document, EntityKey) {
        let (entities, key) = self.entities.create(entity);
        let mut next = self.clone();
        next.entities = entities;
        (next, key)
    }

    pub fn entity(&self, key: &EntityKey) -> Option<&Entity> {
        self.entities.get(key)
    }

    /// Panics on an unknown key, mirroring [`EntityMap::expect`].
    pub fn expect_entity(&self, key: &EntityKey) -> &Entity {
        self.entities.expect(key)
    }

    pub fn merge_entity_data(&self, key: &EntityKey, data: &DataMap) -> Document {
        let mut next = self.clone();
        next.entities = self.entities.merge_data(key, data);
        next
    }

    pub fn replace_entity_data(&self, key: &EntityKey, data: DataMap) -> Document {
        let mut next = self.clone();
        next.entities = self.entities.replace_data(key, data);
        next
    }

    pub(crate) fn with_entity_map(mut self, entities: EntityMap) -> Self {
        self.entities = entities;
        self
    }
}

#[cfg(test)]
#[path = "document_tests.rs"]
mod document_tests;
