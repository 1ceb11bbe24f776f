//! The derived per-block index of decorator and style runs.
//!
//! For every block the cache holds a list of decorator ranges, one per
//! maximal run of characters sharing a decoration key (or no key), each
//! split into leaf ranges of identical inline style. The index is a pure
//! read cache: it is never authoritative and can always be regenerated from
//! the document and the active decorator.

use crate::block::ContentBlock;
use crate::document::Document;
use crate::scan;

/// A maximal run of characters with identical inline style.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct LeafRange {
    pub start: usize,
    pub end: usize,
}

/// A maximal run of characters sharing one decoration key, holding its leaf
/// runs. `decorator_key` is `None` for undecorated stretches.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct DecoratorRange {
    pub start: usize,
    pub end: usize,
    pub decorator_key: Option<String>,
    pub leaves: Vec<LeafRange>,
}

/// The derived index of one block.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct BlockTree {
    ranges: Vec<DecoratorRange>,
}

/// Partitions blocks into decorated sub-ranges.
///
/// `decorations` returns one entry per character: the decoration key
/// covering that character, or `None`. Adjacent equal keys form one
/// decorator range.
pub trait Decorator {
    fn decorations(&self, block: &ContentBlock, document: &Document) -> Vec<Option<String>>;
}

impl BlockTree {
    pub fn ranges(&self) -> &[DecoratorRange] {
        &self.ranges
    }

    /// Builds the index for one block. An empty block still gets one empty
    /// decorator range with one empty leaf, so there is always a caret
    /// target.
    pub fn generate(
        block: &ContentBlock,
        decorator: Option<&dyn Decorator>,
        document: &Document,
    ) -> BlockTree {
        let length = block.len();
        if length == 0 {
            return BlockTree {
                ranges: vec![DecoratorRange {
                    start: 0,
                    end: 0,
                    decorator_key: None,
                    leaves: vec![LeafRange { start: 0, end: 0 }],
                }],
            };
        }

        let decorations = match decorator {
            Some(decorator) => {
                let decorations = decorator.decorations(block, document);
                assert_eq!(
                    decorations.len(),
                    length,
                    "decorator must return one entry per character"
                );
                decorations
            }
            None => vec![None; length],
        };

        let mut ranges = Vec::new();
        scan::find_ranges(
            &decorations,
            |a, b| a == b,
            |_| true,
            |start, end| {
                ranges.push(DecoratorRange {
                    start,
                    end,
                    decorator_key: decorations[start].clone(),
                    leaves: generate_leaves(block, start, end),
                });
            },
        );
        BlockTree { ranges }
    }
}

/// Leaf runs of equal style within `start..end`, with absolute offsets.
fn generate_leaves(block: &ContentBlock, start: usize, end: usize) -> Vec<LeafRange> {
    let mut leaves = Vec::new();
    scan::find_ranges(
        &block.chars().as_slice()[start..end],
        |a, b| a.style() == b.style(),
        |_| true,
        |leaf_start, leaf_end| {
            leaves.push(LeafRange {
                start: start + leaf_start,
                end: start + leaf_end,
            });
        },
    );
    leaves
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::block::CharList;
    use crate::key::BlockKey;
    use crate::metadata::CharacterMetadata;

    struct PrefixDecorator;

    impl Decorator for PrefixDecorator {
        /// Decorates every '#' character with the key "tag".
        fn decorations(&self, block: &ContentBlock, _document: &Document) -> Vec<Option<String>> {
            block
                .text()
                .chars()
                .map(|ch| (ch == '#').then(|| "tag".to_string()))
                .collect()
        }
    }

    fn styled_block() -> ContentBlock {
        let plain = CharacterMetadata::empty();
        let bold = plain.apply_style("BOLD");
        ContentBlock::new(BlockKey::from("a")).with_text_and_chars(
            "ab#cd",
            CharList::new(vec![
                plain.clone(),
                bold.clone(),
                bold.clone(),
                bold.clone(),
                plain.clone(),
            ]),
        )
    }

    #[test]
    fn undecorated_blocks_get_one_range_split_by_style() {
        let doc = Document::from_block_array(vec![styled_block()]);
        let block = doc.first_block();
        let tree = BlockTree::generate(block, None, &doc);

        assert_eq!(tree.ranges().len(), 1);
        let range = &tree.ranges()[0];
        assert_eq!((range.start, range.end), (0, 5));
        assert_eq!(range.decorator_key, None);
        assert_eq!(
            range.leaves,
            vec![
                LeafRange { start: 0, end: 1 },
                LeafRange { start: 1, end: 4 },
                LeafRange { start: 4, end: 5 },
            ]
        );
    }

    #[test]
    fn decorated_blocks_split_at_decoration_boundaries() {
        let doc = Document::from_block_array(vec![styled_block()]);
        let block = doc.first_block();
        let tree = BlockTree::generate(block, Some(&PrefixDecorator), &doc);

        let keys: Vec<Option<&str>> = tree
            .ranges()
            .iter()
            .map(|range| range.decorator_key.as_deref())
            .collect();
        assert_eq!(keys, vec![None, Some("tag"), None]);
        assert_eq!((tree.ranges()[1].start, tree.ranges()[1].end), (2, 3));

        // Leaves stay inside their decorator range, with absolute offsets.
        assert_eq!(
            tree.ranges()[2].leaves,
            vec![
                LeafRange { start: 3, end: 4 },
                LeafRange { start: 4, end: 5 },
            ]
        );
    }

    #[test]
    fn empty_blocks_get_an_empty_caret_leaf() {
        let doc = Document::from_block_array(vec![ContentBlock::new(BlockKey::from("a"))]);
        let tree = BlockTree::generate(doc.first_block(), None, &doc);
        assert_eq!(tree.ranges().len(), 1);
        assert_eq!(tree.ranges()[0].leaves, vec![LeafRange { start: 0, end: 0 }]);
    }
}
