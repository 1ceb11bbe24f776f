use std::sync::Arc;

use crate::DataMap;
use crate::key::BlockKey;
use crate::metadata::CharacterMetadata;
use crate::scan;
use crate::style::StyleSet;

/// The rendering category of a block.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Default)]
pub enum BlockType {
    #[default]
    Unstyled,
    HeaderOne,
    HeaderTwo,
    HeaderThree,
    Blockquote,
    CodeBlock,
    UnorderedListItem,
    OrderedListItem,
    Atomic,
    Custom(String),
}

impl BlockType {
    pub fn as_str(&self) -> &str {
        match self {
            BlockType::Unstyled => "unstyled",
            BlockType::HeaderOne => "header-one",
            BlockType::HeaderTwo => "header-two",
            BlockType::HeaderThree => "header-three",
            BlockType::Blockquote => "blockquote",
            BlockType::CodeBlock => "code-block",
            BlockType::UnorderedListItem => "unordered-list-item",
            BlockType::OrderedListItem => "ordered-list-item",
            BlockType::Atomic => "atomic",
            BlockType::Custom(name) => name,
        }
    }

    pub fn from_name(name: &str) -> Self {
        match name {
            "unstyled" => BlockType::Unstyled,
            "header-one" => BlockType::HeaderOne,
            "header-two" => BlockType::HeaderTwo,
            "header-three" => BlockType::HeaderThree,
            "blockquote" => BlockType::Blockquote,
            "code-block" => BlockType::CodeBlock,
            "unordered-list-item" => BlockType::UnorderedListItem,
            "ordered-list-item" => BlockType::OrderedListItem,
            "atomic" => BlockType::Atomic,
            other => BlockType::Custom(other.to_string()),
        }
    }
}

/// The per-character metadata of one block, one entry per Unicode scalar
/// value of the block's text. Shared structurally; slicing and splicing
/// produce new lists.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct CharList(Arc<[CharacterMetadata]>);

impl CharList {
    pub fn new(chars: Vec<CharacterMetadata>) -> Self {
        Self(chars.into())
    }

    /// `len` copies of the same metadata, for freshly typed or plain text.
    pub fn repeat(meta: CharacterMetadata, len: usize) -> Self {
        Self(vec![meta; len].into())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&CharacterMetadata> {
        self.0.get(idx)
    }

    pub fn as_slice(&self) -> &[CharacterMetadata] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &CharacterMetadata> {
        self.0.iter()
    }

    pub fn slice(&self, start: usize, end: usize) -> CharList {
        Self(self.0[start..end].to_vec().into())
    }

    /// Replaces `start..end` with `replacement`.
    pub fn splice(&self, start: usize, end: usize, replacement: &[CharacterMetadata]) -> CharList {
        let mut chars = Vec::with_capacity(self.0.len() - (end - start) + replacement.len());
        chars.extend_from_slice(&self.0[..start]);
        chars.extend_from_slice(replacement);
        chars.extend_from_slice(&self.0[end..]);
        Self(chars.into())
    }

    pub fn concat(&self, other: &CharList) -> CharList {
        let mut chars = Vec::with_capacity(self.0.len() + other.0.len());
        chars.extend_from_slice(&self.0);
        chars.extend_from_slice(&other.0);
        Self(chars.into())
    }

    /// Maps `start..end` through `f`, leaving the rest untouched.
    pub fn map_range<F>(&self, start: usize, end: usize, f: F) -> CharList
    where
        F: Fn(&CharacterMetadata) -> CharacterMetadata,
    {
        let mut chars = self.0.to_vec();
        for meta in &mut chars[start..end] {
            *meta = f(meta);
        }
        Self(chars.into())
    }
}

impl Default for CharList {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl FromIterator<CharacterMetadata> for CharList {
    fn from_iter<I: IntoIterator<Item = CharacterMetadata>>(iter: I) -> Self {
        Self(iter.into_iter().collect::<Vec<_>>().into())
    }
}

/// The four-way links of a tree-node block.
///
/// A document either uses tree-node blocks throughout or none at all. A node
/// with non-empty text is a leaf and has no children; a node with children is
/// a container and has empty text.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct TreeLinks {
    pub parent: Option<BlockKey>,
    pub children: Vec<BlockKey>,
    pub prev_sibling: Option<BlockKey>,
    pub next_sibling: Option<BlockKey>,
}

/// One paragraph/line-equivalent unit of a document: an ordered text run
/// with parallel per-character metadata.
///
/// `chars.len()` always equals the text's count of Unicode scalar values.
/// Text and metadata are `Arc`-shared, so cloning an unchanged block copies
/// references, not characters.
#[derive(Clone, PartialEq, Debug)]
pub struct ContentBlock {
    key: BlockKey,
    block_type: BlockType,
    text: Arc<str>,
    chars: CharList,
    depth: usize,
    data: Arc<DataMap>,
    links: Option<TreeLinks>,
}

impl ContentBlock {
    /// An empty, unstyled flat block.
    pub fn new(key: BlockKey) -> Self {
        Self {
            key,
            block_type: BlockType::Unstyled,
            text: Arc::from(""),
            chars: CharList::default(),
            depth: 0,
            data: Arc::new(DataMap::new()),
            links: None,
        }
    }

    pub fn key(&self) -> &BlockKey {
        &self.key
    }

    pub fn block_type(&self) -> &BlockType {
        &self.block_type
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn chars(&self) -> &CharList {
        &self.chars
    }

    /// Block length in Unicode scalar values.
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn data(&self) -> &DataMap {
        &self.data
    }

    pub fn is_tree(&self) -> bool {
        self.links.is_some()
    }

    pub fn links(&self) -> Option<&TreeLinks> {
        self.links.as_ref()
    }

    pub fn parent(&self) -> Option<&BlockKey> {
        self.links.as_ref().and_then(|links| links.parent.as_ref())
    }

    pub fn children(&self) -> &[BlockKey] {
        self.links
            .as_ref()
            .map(|links| links.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn prev_sibling(&self) -> Option<&BlockKey> {
        self.links
            .as_ref()
            .and_then(|links| links.prev_sibling.as_ref())
    }

    pub fn next_sibling(&self) -> Option<&BlockKey> {
        self.links
            .as_ref()
            .and_then(|links| links.next_sibling.as_ref())
    }

    pub fn metadata_at(&self, offset: usize) -> Option<&CharacterMetadata> {
        self.chars.get(offset)
    }

    pub fn style_at(&self, offset: usize) -> StyleSet {
        self.chars
            .get(offset)
            .map(|meta| meta.style().clone())
            .unwrap_or_default()
    }

    pub fn entity_at(&self, offset: usize) -> Option<&crate::key::EntityKey> {
        self.chars.get(offset).and_then(|meta| meta.entity())
    }

    pub fn with_key(mut self, key: BlockKey) -> Self {
        self.key = key;
        self
    }

    pub fn with_type(mut self, block_type: BlockType) -> Self {
        self.block_type = block_type;
        self
    }

    /// Replaces the text with plain (style-free, entity-free) content.
    pub fn with_text(self, text: &str) -> Self {
        let chars = CharList::repeat(CharacterMetadata::empty(), text.chars().count());
        self.with_text_and_chars(text, chars)
    }

    /// Replaces text and metadata together. Panics if their lengths differ:
    /// the parallel-list invariant is never allowed to break.
    pub fn with_text_and_chars(mut self, text: &str, chars: CharList) -> Self {
        assert_eq!(
            text.chars().count(),
            chars.len(),
            "character list length must match text length"
        );
        self.text = Arc::from(text);
        self.chars = chars;
        self
    }

    pub fn with_depth(mut self, depth: usize) -> Self {
        self.depth = depth;
        self
    }

    pub fn with_data(mut self, data: DataMap) -> Self {
        self.data = Arc::new(data);
        self
    }

    /// Turns the block into a tree node with the given links.
    pub fn with_links(mut self, links: TreeLinks) -> Self {
        self.links = Some(links);
        self
    }

    /// Turns the block into a tree node with empty links, or keeps existing
    /// ones.
    pub fn as_tree_node(mut self) -> Self {
        if self.links.is_none() {
            self.links = Some(TreeLinks::default());
        }
        self
    }

    pub(crate) fn links_mut(&mut self) -> &mut TreeLinks {
        self.links
            .as_mut()
            .expect("block is not a tree node")
    }

    /// Reports every maximal run of characters whose style set passes
    /// `filter`.
    pub fn find_style_ranges<F, C>(&self, filter: F, callback: C)
    where
        F: FnMut(&CharacterMetadata) -> bool,
        C: FnMut(usize, usize),
    {
        scan::find_ranges(
            self.chars.as_slice(),
            |a, b| a.style() == b.style(),
            filter,
            callback,
        );
    }

    /// Reports every maximal run of characters sharing one entity key, for
    /// runs whose metadata passes `filter`.
    pub fn find_entity_ranges<F, C>(&self, filter: F, callback: C)
    where
        F: FnMut(&CharacterMetadata) -> bool,
        C: FnMut(usize, usize),
    {
        scan::find_ranges(
            self.chars.as_slice(),
            |a, b| a.entity() == b.entity(),
            filter,
            callback,
        );
    }
}

pub(crate) fn char_to_byte_idx(text: &str, char_idx: usize) -> usize {
    if char_idx == 0 {
        return 0;
    }
    for (count, (byte_idx, _)) in text.char_indices().enumerate() {
        if count == char_idx {
            return byte_idx;
        }
    }
    text.len()
}

/// `text[start..end]` with char-counted bounds.
pub(crate) fn slice_text(text: &str, start: usize, end: usize) -> String {
    let start_byte = char_to_byte_idx(text, start);
    let end_byte = char_to_byte_idx(text, end);
    text[start_byte..end_byte].to_string()
}

/// Replaces the char-counted range `start..end` of `text` with `insert`.
pub(crate) fn splice_text(text: &str, start: usize, end: usize, insert: &str) -> String {
    let start_byte = char_to_byte_idx(text, start);
    let end_byte = char_to_byte_idx(text, end);
    let mut result = String::with_capacity(text.len() - (end_byte - start_byte) + insert.len());
    result.push_str(&text[..start_byte]);
    result.push_str(insert);
    result.push_str(&text[end_byte..]);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_type_names_round_trip() {
        for block_type in [
            BlockType::Unstyled,
            BlockType::HeaderOne,
            BlockType::Blockquote,
            BlockType::CodeBlock,
            BlockType::UnorderedListItem,
            BlockType::Atomic,
            BlockType::Custom("sidebar".to_string()),
        ] {
            assert_eq!(BlockType::from_name(block_type.as_str()), block_type);
        }
    }

    #[test]
    fn with_text_keeps_metadata_parallel() {
        let block = ContentBlock::new(BlockKey::from("a")).with_text("héllo");
        assert_eq!(block.len(), 5);
        assert_eq!(block.text(), "héllo");
        assert_eq!(block.chars().len(), 5);
    }

    #[test]
    #[should_panic(expected = "character list length")]
    fn mismatched_chars_are_rejected() {
        let _ = ContentBlock::new(BlockKey::from("a"))
            .with_text_and_chars("ab", CharList::repeat(CharacterMetadata::empty(), 3));
    }

    #[test]
    fn char_list_splice_replaces_a_range() {
        let bold = CharacterMetadata::empty().apply_style("BOLD");
        let list = CharList::repeat(CharacterMetadata::empty(), 4);
        let spliced = list.splice(1, 3, &[bold.clone()]);
        assert_eq!(spliced.len(), 3);
        assert!(spliced.get(1).unwrap().has_style("BOLD"));
        assert!(!spliced.get(0).unwrap().has_style("BOLD"));
    }

    #[test]
    fn splice_text_is_char_indexed() {
        assert_eq!(splice_text("héllo", 1, 2, "a"), "hallo");
        assert_eq!(splice_text("héllo", 5, 5, "!"), "héllo!");
        assert_eq!(slice_text("héllo", 1, 3), "él");
    }

    #[test]
    fn style_ranges_follow_metadata_runs() {
        let bold = CharacterMetadata::empty().apply_style("BOLD");
        let plain = CharacterMetadata::empty();
        let block = ContentBlock::new(BlockKey::from("a")).with_text_and_chars(
            "abcde",
            CharList::new(vec![
                plain.clone(),
                bold.clone(),
                bold.clone(),
                plain.clone(),
                bold.clone(),
            ]),
        );
        let mut ranges = Vec::new();
        block.find_style_ranges(
            |meta| meta.has_style("BOLD"),
            |start, end| ranges.push((start, end)),
        );
        assert_eq!(ranges, vec![(1, 3), (4, 5)]);
    }

    #[test]
    fn flat_blocks_expose_empty_tree_accessors() {
        let block = ContentBlock::new(BlockKey::from("a")).with_text("hi");
        assert!(!block.is_tree());
        assert!(block.children().is_empty());
        assert!(block.parent().is_none());

        let node = ContentBlock::new(BlockKey::from("b")).as_tree_node();
        assert!(node.is_tree());
    }
}
