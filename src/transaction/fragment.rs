use std::collections::{HashMap, HashSet};

use tracing::debug;

use super::{RemovalDirection, fresh_block_key, remove};
use crate::block::{ContentBlock, TreeLinks, slice_text};
use crate::document::{BlockMap, Document};
use crate::key::BlockKey;
use crate::selection::SelectionState;

/// An ordered, contiguous sequence of blocks: the unit of copy, paste and
/// move insertion.
#[derive(Clone, PartialEq, Debug)]
pub struct Fragment {
    blocks: Vec<ContentBlock>,
}

impl Fragment {
    /// Panics on an empty sequence: an empty fragment has no meaning.
    pub fn new(blocks: Vec<ContentBlock>) -> Self {
        assert!(!blocks.is_empty(), "fragment cannot be empty");
        Self { blocks }
    }

    /// A single plain-text block under a random key.
    pub fn from_text(text: &str) -> Self {
        Self::new(vec![ContentBlock::new(BlockKey::random()).with_text(text)])
    }

    pub fn blocks(&self) -> &[ContentBlock] {
        &self.blocks
    }

    /// Number of blocks; always at least one.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn first(&self) -> &ContentBlock {
        self.blocks.first().expect("fragment is never empty")
    }

    pub fn last(&self) -> &ContentBlock {
        self.blocks.last().expect("fragment is never empty")
    }
}

/// What happens to the target block's data when a fragment merges into it.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum FragmentDataPolicy {
    ReplaceWithFragmentData,
    RetainExistingData,
}

/// Captures the selected range as a fragment: the head and tail blocks are
/// sliced to the selection, blocks between are taken whole. Entities cut by
/// the selection edges are stripped first. Links pointing outside the
/// capture are cleared so the fragment is self-contained.
pub fn fragment_from_selection(doc: &Document, sel: &SelectionState) -> Fragment {
    let mut base = doc.clone();
    remove::strip_entity_at(&mut base, sel.start_key(), sel.start_offset());
    remove::strip_entity_at(&mut base, sel.end_key(), sel.end_offset());

    let start_key = sel.start_key().clone();
    let end_key = sel.end_key().clone();
    let start_offset = sel.start_offset();
    let end_offset = sel.end_offset();

    if start_key == end_key {
        let block = base.expect_block(&start_key).clone();
        let text = slice_text(block.text(), start_offset, end_offset);
        let chars = block.chars().slice(start_offset, end_offset);
        let mut sliced = block.with_text_and_chars(&text, chars);
        if sliced.is_tree() {
            sliced = sliced.with_links(TreeLinks::default());
        }
        return Fragment::new(vec![sliced]);
    }

    let keys = base.blocks().keys_in_range(&start_key, &end_key);
    let key_set: HashSet<BlockKey> = keys.iter().cloned().collect();
    let mut blocks = Vec::with_capacity(keys.len());
    for key in &keys {
        let block = base.expect_block(key).clone();
        let block = if key == &start_key {
            let text = slice_text(block.text(), start_offset, block.len());
            let chars = block.chars().slice(start_offset, block.len());
            block.with_text_and_chars(&text, chars)
        } else if key == &end_key {
            let text = slice_text(block.text(), 0, end_offset);
            let chars = block.chars().slice(0, end_offset);
            block.with_text_and_chars(&text, chars)
        } else {
            block
        };
        blocks.push(confine_links(block, &key_set));
    }
    Fragment::new(blocks)
}

/// Clears links whose target lies outside `keys`.
fn confine_links(mut block: ContentBlock, keys: &HashSet<BlockKey>) -> ContentBlock {
    if !block.is_tree() {
        return block;
    }
    let links = block.links_mut();
    links.children.retain(|child| keys.contains(child));
    if links.parent.as_ref().is_some_and(|key| !keys.contains(key)) {
        links.parent = None;
    }
    if links.prev_sibling.as_ref().is_some_and(|key| !keys.contains(key)) {
        links.prev_sibling = None;
    }
    if links.next_sibling.as_ref().is_some_and(|key| !keys.contains(key)) {
        links.next_sibling = None;
    }
    block
}

/// Removes the selected range, then inserts `fragment` at the collapsed
/// point.
///
/// A single-block fragment merges into the target block directly. A
/// multi-block fragment merges its first block into the head remainder and
/// absorbs the tail remainder into its last block; blocks between go in
/// verbatim. Every inserted block gets a fresh key, so fragments can be
/// reinserted any number of times. In tree mode, a container on either side
/// suppresses the text merge and the fragment is spliced in structurally.
pub fn replace_with_fragment(
    doc: &Document,
    sel: &SelectionState,
    fragment: &Fragment,
    policy: FragmentDataPolicy,
) -> Document {
    let (base, point) = if sel.is_collapsed() {
        (doc.clone(), sel.clone())
    } else {
        let removed = remove::remove_range(doc, sel, RemovalDirection::Backward);
        let point = removed.selection_after().clone();
        (removed, point)
    };
    debug!(blocks = fragment.len(), "insert fragment");
    insert_fragment(&base, &point, fragment, policy).with_selection_before(sel.clone())
}

/// Captures the fragment at `removal_sel`, removes it, and reinserts it at
/// `target_sel`, which the caller computes against the post-removal
/// document. Panics if the target block did not survive the removal.
pub fn move_text(
    doc: &Document,
    removal_sel: &SelectionState,
    target_sel: &SelectionState,
) -> Document {
    let fragment = fragment_from_selection(doc, removal_sel);
    let removed = remove::remove_range(doc, removal_sel, RemovalDirection::Backward);
    assert!(
        removed.block_for_key(target_sel.start_key()).is_some(),
        "move target `{}` did not survive the removal",
        target_sel.start_key()
    );
    replace_with_fragment(
        &removed,
        target_sel,
        &fragment,
        FragmentDataPolicy::ReplaceWithFragmentData,
    )
}

fn insert_fragment(
    base: &Document,
    point: &SelectionState,
    fragment: &Fragment,
    policy: FragmentDataPolicy,
) -> Document {
    let target_key = point.start_key().clone();
    let offset = point.start_offset();
    let target = base.expect_block(&target_key).clone();
    let blocks = randomize_fragment_keys(fragment, base.blocks());

    let structural = target.is_tree()
        && (!target.children().is_empty()
            || !blocks.first().expect("fragment is never empty").children().is_empty()
            || !blocks.last().expect("fragment is never empty").children().is_empty());
    if structural {
        return splice_structurally(base.clone(), &target, blocks);
    }

    let mut next = base.clone();
    if blocks.len() == 1 {
        let frag = blocks.into_iter().next().expect("fragment is never empty");
        let frag_len = frag.len();
        let text = slice_text(target.text(), 0, offset)
            + frag.text()
            + &slice_text(target.text(), offset, target.len());
        let chars = target
            .chars()
            .slice(0, offset)
            .concat(frag.chars())
            .concat(&target.chars().slice(offset, target.len()));
        let block_type = if target.is_empty() {
            frag.block_type().clone()
        } else {
            target.block_type().clone()
        };
        let data = match policy {
            FragmentDataPolicy::ReplaceWithFragmentData => frag.data().clone(),
            FragmentDataPolicy::RetainExistingData => target.data().clone(),
        };
        let merged = target
            .clone()
            .with_text_and_chars(&text, chars)
            .with_type(block_type)
            .with_data(data);
        next.blocks_mut().replace(merged);
        let after = SelectionState::collapsed(target_key, offset + frag_len);
        return next.with_selection_after(after.with_has_focus(point.has_focus()));
    }

    let mut iter = blocks.into_iter();
    let first = iter.next().expect("fragment is never empty");
    let mut middles: Vec<ContentBlock> = iter.collect();
    let last = middles.pop().expect("multi-block fragment has a last block");
    let last_len = last.len();

    let head_text = slice_text(target.text(), 0, offset) + first.text();
    let head_chars = target.chars().slice(0, offset).concat(first.chars());
    let head_data = match policy {
        FragmentDataPolicy::ReplaceWithFragmentData => first.data().clone(),
        FragmentDataPolicy::RetainExistingData => target.data().clone(),
    };
    let head = target
        .clone()
        .with_text_and_chars(&head_text, head_chars)
        .with_data(head_data);

    let tail_text = last.text().to_string() + &slice_text(target.text(), offset, target.len());
    let tail_chars = last
        .chars()
        .concat(&target.chars().slice(offset, target.len()));
    let mut tail = last.with_text_and_chars(&tail_text, tail_chars);
    let tail_key = tail.key().clone();

    if target.is_tree() {
        let target_links = target.links().expect("tree block has links").clone();
        let old_next = target_links.next_sibling.clone();

        // Only the fragment's root-level blocks join the target's sibling
        // chain; nested blocks keep the links they brought along.
        let mut chain: Vec<BlockKey> = Vec::with_capacity(middles.len() + 2);
        chain.push(target_key.clone());
        chain.extend(
            middles
                .iter()
                .filter(|block| block.parent().is_none())
                .map(|block| block.key().clone()),
        );
        chain.push(tail_key.clone());

        let link_at = |idx: usize, chain: &[BlockKey], children: Vec<BlockKey>| TreeLinks {
            parent: target_links.parent.clone(),
            children,
            prev_sibling: Some(chain[idx - 1].clone()),
            next_sibling: if idx + 1 < chain.len() {
                Some(chain[idx + 1].clone())
            } else {
                old_next.clone()
            },
        };
        for block in middles.iter_mut() {
            let Some(idx) = chain.iter().position(|key| key == block.key()) else {
                continue;
            };
            let children = block.children().to_vec();
            *block = block.clone().with_links(link_at(idx, &chain, children));
        }
        tail = tail.with_links(link_at(chain.len() - 1, &chain, Vec::new()));

        let mut head = head;
        head.links_mut().next_sibling = Some(chain[1].clone());
        next.blocks_mut().replace(head);

        if let Some(parent_key) = &target_links.parent {
            let mut parent = next.expect_block(parent_key).clone();
            let position = parent
                .children()
                .iter()
                .position(|child| child == &target_key)
                .expect("block listed in its parent");
            let parent_links = parent.links_mut();
            parent_links
                .children
                .splice(position + 1..position + 1, chain[1..].iter().cloned());
            next.blocks_mut().replace(parent);
        }
        if let Some(next_key) = &old_next {
            let mut after_block = next.expect_block(next_key).clone();
            after_block.links_mut().prev_sibling = Some(tail_key.clone());
            next.blocks_mut().replace(after_block);
        }
    } else {
        next.blocks_mut().replace(head);
    }

    let mut anchor = target_key.clone();
    for block in middles {
        let key = block.key().clone();
        next.blocks_mut().insert_after(&anchor, block);
        anchor = key;
    }
    next.blocks_mut().insert_after(&anchor, tail);

    let after = SelectionState::collapsed(tail_key, last_len);
    next.with_selection_after(after.with_has_focus(point.has_focus()))
}

/// Inserts the fragment's blocks after the target's subtree as siblings of
/// the target, without merging any text. Used when the target or the
/// fragment edges are containers.
fn splice_structurally(
    mut next: Document,
    target: &ContentBlock,
    blocks: Vec<ContentBlock>,
) -> Document {
    let target_key = target.key().clone();
    let target_links = target.links().expect("tree block has links").clone();
    let old_next = target_links.next_sibling.clone();

    let roots: Vec<BlockKey> = blocks
        .iter()
        .filter(|block| block.parent().is_none())
        .map(|block| block.key().clone())
        .collect();
    assert!(
        !roots.is_empty(),
        "fragment has no root blocks to splice in"
    );

    // Chain the fragment roots between the target and its old next sibling.
    let mut blocks = blocks;
    for block in &mut blocks {
        let key = block.key().clone();
        if let Some(root_idx) = roots.iter().position(|root| root == &key) {
            let mut updated = block.clone().as_tree_node();
            {
                let links = updated.links_mut();
                links.parent = target_links.parent.clone();
                links.prev_sibling = if root_idx == 0 {
                    Some(target_key.clone())
                } else {
                    Some(roots[root_idx - 1].clone())
                };
                links.next_sibling = if root_idx + 1 < roots.len() {
                    Some(roots[root_idx + 1].clone())
                } else {
                    old_next.clone()
                };
            }
            *block = updated;
        }
    }

    let mut updated_target = target.clone();
    updated_target.links_mut().next_sibling = Some(roots[0].clone());
    next.blocks_mut().replace(updated_target);

    if let Some(parent_key) = &target_links.parent {
        let mut parent = next.expect_block(parent_key).clone();
        let position = parent
            .children()
            .iter()
            .position(|child| child == &target_key)
            .expect("block listed in its parent");
        let parent_links = parent.links_mut();
        parent_links
            .children
            .splice(position + 1..position + 1, roots.iter().cloned());
        next.blocks_mut().replace(parent);
    }
    if let Some(next_key) = &old_next {
        let mut after_block = next.expect_block(next_key).clone();
        after_block.links_mut().prev_sibling = roots.last().cloned();
        next.blocks_mut().replace(after_block);
    }

    // The fragment lands after the target's whole subtree in map order.
    let mut insert_idx = subtree_end_index(next.blocks(), &target_key);
    let last = blocks.last().expect("fragment is never empty").clone();
    for block in blocks {
        next.blocks_mut().insert_at(insert_idx, block);
        insert_idx += 1;
    }

    let after = SelectionState::collapsed(last.key().clone(), last.len());
    next.with_selection_after(after)
}

/// Index just past the last block of `key`'s subtree in map order.
fn subtree_end_index(blocks: &BlockMap, key: &BlockKey) -> usize {
    let start = blocks
        .index_of(key)
        .unwrap_or_else(|| panic!("unknown block key `{key}`"));
    start + blocks.subtree_keys(key).len()
}

/// Rekeys every fragment block so nothing collides with the document the
/// fragment lands in, rewriting internal links through the same mapping.
fn randomize_fragment_keys(fragment: &Fragment, existing: &BlockMap) -> Vec<ContentBlock> {
    let mut mapping: HashMap<BlockKey, BlockKey> = HashMap::with_capacity(fragment.len());
    for block in fragment.blocks() {
        let fresh = loop {
            let key = fresh_block_key(existing);
            if !mapping.values().any(|taken| taken == &key) {
                break key;
            }
        };
        mapping.insert(block.key().clone(), fresh);
    }
    fragment
        .blocks()
        .iter()
        .map(|block| {
            let mut rekeyed = block.clone().with_key(mapping[block.key()].clone());
            if let Some(old_links) = block.links() {
                // Links to keys outside the fragment are dropped rather than
                // rewritten; they cannot mean anything in the new document.
                let remap = |key: &BlockKey| mapping.get(key).cloned();
                rekeyed = rekeyed.with_links(TreeLinks {
                    parent: old_links.parent.as_ref().and_then(remap),
                    children: old_links.children.iter().filter_map(remap).collect(),
                    prev_sibling: old_links.prev_sibling.as_ref().and_then(remap),
                    next_sibling: old_links.next_sibling.as_ref().and_then(remap),
                });
            }
            rekeyed
        })
        .collect()
}
