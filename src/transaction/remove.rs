use std::collections::HashSet;

use tracing::debug;

use super::RemovalDirection;
use super::expand;
use crate::block::{ContentBlock, slice_text, splice_text};
use crate::document::{BlockMap, Document};
use crate::entity::Mutability;
use crate::key::BlockKey;
use crate::selection::SelectionState;

/// Removes the selected range, after entity-aware expansion and edge entity
/// stripping. The result's selection collapses at the start of the removed
/// range.
pub fn remove_range(doc: &Document, sel: &SelectionState, direction: RemovalDirection) -> Document {
    if sel.is_collapsed() {
        return doc
            .clone()
            .with_selection_before(sel.clone())
            .with_selection_after(sel.clone());
    }

    let start_key = sel.start_key().clone();
    let end_key = sel.end_key().clone();
    let mut start_offset = sel.start_offset();
    let mut end_offset = sel.end_offset();
    debug!(%start_key, start_offset, %end_key, end_offset, "remove range");

    // Mutability may widen the range before anything else happens.
    if start_key == end_key {
        let block = doc.expect_block(&start_key);
        (start_offset, end_offset) =
            expand::expand_for_entity(doc, block, start_offset, end_offset, direction);
    }

    let mut next = doc.clone();
    strip_entity_at(&mut next, &start_key, start_offset);
    strip_entity_at(&mut next, &end_key, end_offset);

    let caret = if start_key == end_key {
        let block = next.expect_block(&start_key).clone();
        let text = splice_text(block.text(), start_offset, end_offset, "");
        let chars = block.chars().splice(start_offset, end_offset, &[]);
        next.blocks_mut()
            .replace(block.with_text_and_chars(&text, chars));
        SelectionState::collapsed(start_key, start_offset)
    } else {
        remove_across_blocks(&mut next, &start_key, start_offset, &end_key, end_offset)
    };

    next.with_selection_before(sel.clone())
        .with_selection_after(caret.with_has_focus(sel.has_focus()))
}

/// Strips the entity key from a whole run when a selection edge cuts it
/// strictly inside, so partial selections never leave half an entity on
/// surviving text. MUTABLE entities tolerate partial edits and keep theirs.
pub(crate) fn strip_entity_at(next: &mut Document, key: &BlockKey, offset: usize) {
    let block = next.expect_block(key).clone();
    if offset == 0 || offset >= block.len() {
        return;
    }
    let before = block.chars().get(offset - 1).and_then(|meta| meta.entity());
    let after = block.chars().get(offset).and_then(|meta| meta.entity());
    let (Some(before), Some(after)) = (before, after) else {
        return;
    };
    if before != after {
        return;
    }
    let entity_key = after.clone();
    if next.expect_entity(&entity_key).mutability() == Mutability::Mutable {
        return;
    }
    let (run_start, run_end) = expand::entity_run(block.chars(), offset, &entity_key);
    let text = block.text().to_string();
    let chars = block
        .chars()
        .map_range(run_start, run_end, |meta| meta.apply_entity(None));
    next.blocks_mut()
        .replace(block.with_text_and_chars(&text, chars));
}

/// Merges the head remainder of the start block with the tail remainder of
/// the end block and drops everything between, repairing tree links for
/// whatever survives. Returns the collapsed caret.
fn remove_across_blocks(
    next: &mut Document,
    start_key: &BlockKey,
    start_offset: usize,
    end_key: &BlockKey,
    end_offset: usize,
) -> SelectionState {
    let original = next.blocks().clone();
    let head = original
        .get(start_key)
        .unwrap_or_else(|| panic!("unknown block key `{start_key}`"))
        .clone();
    let tail = original
        .get(end_key)
        .unwrap_or_else(|| panic!("unknown block key `{end_key}`"))
        .clone();
    let start_idx = original.index_of(start_key).expect("start block exists");
    let end_idx = original.index_of(end_key).expect("end block exists");
    assert!(
        start_idx < end_idx,
        "selection end block precedes its start block"
    );
    let is_tree = head.is_tree();

    let mut removed: HashSet<BlockKey> = (start_idx + 1..=end_idx)
        .filter_map(|idx| original.get_index(idx))
        .map(|block| block.key().clone())
        .collect();

    if is_tree {
        // A container end block survives so its children keep a parent.
        if !tail.children().is_empty() {
            removed.remove(end_key);
        }
        retain_ancestors_with_survivors(&original, &tail, &mut removed);
    }

    let text = slice_text(head.text(), 0, start_offset)
        + &slice_text(tail.text(), end_offset, tail.len());
    let chars = head
        .chars()
        .slice(0, start_offset)
        .concat(&tail.chars().slice(end_offset, tail.len()));
    let merged = head.clone().with_text_and_chars(&text, chars);

    for key in &removed {
        next.blocks_mut().remove(key);
    }
    next.blocks_mut().replace(merged.clone());

    if is_tree {
        repair_links(next, &original, &removed);
        if let Some(caret) = collapse_emptied_container(next, &original, start_key, start_offset, &tail)
        {
            return caret;
        }
    }

    SelectionState::collapsed(start_key.clone(), start_offset)
}

/// Walks the end block's ancestor chain and keeps every ancestor that still
/// has a surviving child, so subtrees reaching past the removal are never
/// orphaned.
fn retain_ancestors_with_survivors(
    original: &BlockMap,
    tail: &ContentBlock,
    removed: &mut HashSet<BlockKey>,
) {
    let mut parent = tail.parent().cloned();
    while let Some(parent_key) = parent {
        if !removed.contains(&parent_key) {
            break;
        }
        let block = original
            .get(&parent_key)
            .unwrap_or_else(|| panic!("unknown block key `{parent_key}`"));
        let any_surviving_child = block
            .children()
            .iter()
            .any(|child| !removed.contains(child));
        if any_surviving_child {
            removed.remove(&parent_key);
        }
        parent = block.parent().cloned();
    }
}

/// Rebuilds child lists and sibling links of the surviving blocks, walking
/// original sibling chains forward or backward past deleted blocks to the
/// nearest survivor.
fn repair_links(next: &mut Document, original: &BlockMap, removed: &HashSet<BlockKey>) {
    if removed.is_empty() {
        return;
    }
    let survivors: Vec<BlockKey> = next.blocks().keys().cloned().collect();
    for key in survivors {
        let block = next.expect_block(&key);
        let Some(links) = block.links() else {
            continue;
        };
        let children: Vec<BlockKey> = links
            .children
            .iter()
            .filter(|child| !removed.contains(child))
            .cloned()
            .collect();
        let prev = surviving_sibling(original, removed, links.prev_sibling.clone(), false);
        let nxt = surviving_sibling(original, removed, links.next_sibling.clone(), true);
        debug_assert!(
            links.parent.as_ref().is_none_or(|parent| !removed.contains(parent)),
            "surviving block `{key}` lost its parent"
        );
        if children != links.children || prev != links.prev_sibling || nxt != links.next_sibling {
            let mut updated = block.clone();
            let links = updated.links_mut();
            links.children = children;
            links.prev_sibling = prev;
            links.next_sibling = nxt;
            next.blocks_mut().replace(updated);
        }
    }
}

fn surviving_sibling(
    original: &BlockMap,
    removed: &HashSet<BlockKey>,
    mut current: Option<BlockKey>,
    forward: bool,
) -> Option<BlockKey> {
    while let Some(key) = current {
        if !removed.contains(&key) {
            return Some(key);
        }
        current = original.get(&key).and_then(|block| {
            if forward {
                block.next_sibling().cloned()
            } else {
                block.prev_sibling().cloned()
            }
        });
    }
    None
}

/// When the removal empties the start block and it was the parent of the end
/// block, the now-pointless container is deleted and its surviving children
/// move up to its own parent, preserving order. Returns the caret if the
/// container was removed.
fn collapse_emptied_container(
    next: &mut Document,
    original: &BlockMap,
    start_key: &BlockKey,
    start_offset: usize,
    tail: &ContentBlock,
) -> Option<SelectionState> {
    if start_offset != 0 || tail.parent() != Some(start_key) {
        return None;
    }
    if next.blocks().len() == 1 {
        return None;
    }
    let container = next.expect_block(start_key).clone();
    if container.len() != 0 {
        return None;
    }
    let links = container.links()?.clone();
    next.blocks_mut().remove(start_key);

    for child in &links.children {
        let mut block = next.expect_block(child).clone();
        block.links_mut().parent = links.parent.clone();
        next.blocks_mut().replace(block);
    }
    if let Some(parent_key) = &links.parent {
        let mut parent = next.expect_block(parent_key).clone();
        let position = parent
            .children()
            .iter()
            .position(|child| child == start_key)
            .expect("container listed in its parent");
        let parent_links = parent.links_mut();
        parent_links
            .children
            .splice(position..=position, links.children.iter().cloned());
        next.blocks_mut().replace(parent);
    }

    // Stitch the sibling chain across the deleted container.
    let first_child = links.children.first().cloned();
    let last_child = links.children.last().cloned();
    relink_sibling(next, links.prev_sibling.as_ref(), true, first_child.clone().or(links.next_sibling.clone()));
    relink_sibling(next, links.next_sibling.as_ref(), false, last_child.clone().or(links.prev_sibling.clone()));
    if let Some(first) = &first_child {
        let mut block = next.expect_block(first).clone();
        block.links_mut().prev_sibling = links.prev_sibling.clone();
        next.blocks_mut().replace(block);
    }
    if let Some(last) = &last_child {
        let mut block = next.expect_block(last).clone();
        block.links_mut().next_sibling = links.next_sibling.clone();
        next.blocks_mut().replace(block);
    }

    let caret_key = first_child
        .or_else(|| links.prev_sibling.clone())
        .or_else(|| links.next_sibling.clone())
        .unwrap_or_else(|| original.first().expect("non-empty map").key().clone());
    let caret_key = if next.block_for_key(&caret_key).is_some() {
        caret_key
    } else {
        next.first_block().key().clone()
    };
    Some(SelectionState::collapsed(caret_key, 0))
}

fn relink_sibling(
    next: &mut Document,
    key: Option<&BlockKey>,
    forward: bool,
    target: Option<BlockKey>,
) {
    let Some(key) = key else {
        return;
    };
    let mut block = next.expect_block(key).clone();
    if forward {
        block.links_mut().next_sibling = target;
    } else {
        block.links_mut().prev_sibling = target;
    }
    next.blocks_mut().replace(block);
}
