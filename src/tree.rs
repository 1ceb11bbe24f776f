//! Structural operations over nested-block documents.
//!
//! Tree-node blocks carry four-way links (parent, children, previous and
//! next sibling). Every operation here may break link consistency while it
//! works but restores it before returning; [`validate_tree`] checks the full
//! invariant and is run by the tests after every operation.

mod validate;

pub use validate::{TreeError, is_valid_tree, validate_tree};

use tracing::debug;

use crate::block::{ContentBlock, TreeLinks};
use crate::document::Document;
use crate::key::BlockKey;
use crate::transaction::fresh_block_key;

/// Which adjacent sibling of a block an operation targets.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SiblingSide {
    Previous,
    Next,
}

/// Inserts `child_key` as the `position`-th child of `parent_key`, linking
/// it to both affected sibling neighbors. The child must already be present
/// in the document and detached from any other parent.
pub fn update_parent_child(
    doc: &Document,
    parent_key: &BlockKey,
    child_key: &BlockKey,
    position: usize,
) -> Document {
    let mut next = doc.clone();
    let mut parent = next.expect_block(parent_key).clone().as_tree_node();
    assert!(
        position <= parent.children().len(),
        "position {position} is beyond the children of `{parent_key}`"
    );
    let prev_key = position.checked_sub(1).map(|idx| parent.children()[idx].clone());
    let next_key = parent.children().get(position).cloned();
    parent.links_mut().children.insert(position, child_key.clone());
    next.blocks_mut().replace(parent);

    let mut child = next.expect_block(child_key).clone().as_tree_node();
    {
        let links = child.links_mut();
        links.parent = Some(parent_key.clone());
        links.prev_sibling = prev_key.clone();
        links.next_sibling = next_key.clone();
    }
    next.blocks_mut().replace(child);

    if let Some(prev_key) = &prev_key {
        set_sibling(&mut next, prev_key, SiblingSide::Next, Some(child_key.clone()));
    }
    if let Some(next_key) = &next_key {
        set_sibling(&mut next, next_key, SiblingSide::Previous, Some(child_key.clone()));
    }
    next
}

/// Links `a` and `b` as adjacent siblings: `a.next = b`, `b.prev = a`.
pub fn update_sibling(doc: &Document, a: &BlockKey, b: &BlockKey) -> Document {
    let mut next = doc.clone();
    set_sibling(&mut next, a, SiblingSide::Next, Some(b.clone()));
    set_sibling(&mut next, b, SiblingSide::Previous, Some(a.clone()));
    next
}

/// Swaps `existing_key` for `new_key` in the parent's child list and points
/// the new child at the parent.
pub fn replace_parent_child(
    doc: &Document,
    parent_key: &BlockKey,
    existing_key: &BlockKey,
    new_key: &BlockKey,
) -> Document {
    let mut next = doc.clone();
    let mut parent = next.expect_block(parent_key).clone();
    let position = parent
        .children()
        .iter()
        .position(|child| child == existing_key)
        .unwrap_or_else(|| panic!("`{existing_key}` is not a child of `{parent_key}`"));
    parent.links_mut().children[position] = new_key.clone();
    next.blocks_mut().replace(parent);

    let mut child = next.expect_block(new_key).clone().as_tree_node();
    child.links_mut().parent = Some(parent_key.clone());
    next.blocks_mut().replace(child);
    next
}

/// Synthesizes an empty container as `key`'s new parent, splicing it into
/// the block map immediately before `key`. The container takes over `key`'s
/// old parent and sibling links; `key` becomes its only child.
pub fn create_new_parent(doc: &Document, key: &BlockKey) -> Document {
    let block = doc.expect_block(key).clone();
    let links = block
        .links()
        .unwrap_or_else(|| panic!("`{key}` is not a tree node"))
        .clone();
    let parent_key = fresh_block_key(doc.blocks());
    debug!(%key, parent = %parent_key, "create new parent");

    let parent = ContentBlock::new(parent_key.clone())
        .with_type(block.block_type().clone())
        .with_links(TreeLinks {
            parent: links.parent.clone(),
            children: vec![key.clone()],
            prev_sibling: links.prev_sibling.clone(),
            next_sibling: links.next_sibling.clone(),
        });

    let mut next = doc.clone();
    let mut child = block;
    {
        let child_links = child.links_mut();
        child_links.parent = Some(parent_key.clone());
        child_links.prev_sibling = None;
        child_links.next_sibling = None;
    }
    next.blocks_mut().replace(child);

    if let Some(old_parent_key) = &links.parent {
        let mut old_parent = next.expect_block(old_parent_key).clone();
        let position = old_parent
            .children()
            .iter()
            .position(|child| child == key)
            .expect("block listed in its parent");
        old_parent.links_mut().children[position] = parent_key.clone();
        next.blocks_mut().replace(old_parent);
    }
    if let Some(prev_key) = &links.prev_sibling {
        set_sibling(&mut next, prev_key, SiblingSide::Next, Some(parent_key.clone()));
    }
    if let Some(next_key) = &links.next_sibling {
        set_sibling(&mut next, next_key, SiblingSide::Previous, Some(parent_key.clone()));
    }
    next.blocks_mut().insert_before(key, parent);

    debug_assert!(validate_tree(&next).is_ok());
    next
}

/// Re-parents `key` under its adjacent container sibling: under the previous
/// sibling as its last child, or under the next sibling as its first child.
/// The block map is reordered so iteration order still matches depth-first
/// order. Panics if the chosen sibling is missing or is not a container.
pub fn update_as_siblings_child(doc: &Document, key: &BlockKey, side: SiblingSide) -> Document {
    let block = doc.expect_block(key).clone();
    let links = block
        .links()
        .unwrap_or_else(|| panic!("`{key}` is not a tree node"))
        .clone();
    let sibling_key = match side {
        SiblingSide::Previous => links.prev_sibling.clone(),
        SiblingSide::Next => links.next_sibling.clone(),
    }
    .unwrap_or_else(|| panic!("`{key}` has no {side:?} sibling"));
    let sibling = doc.expect_block(&sibling_key).clone();
    assert!(
        sibling.len() == 0,
        "sibling `{sibling_key}` is not a container"
    );
    debug!(%key, sibling = %sibling_key, ?side, "re-parent under sibling");

    let mut next = doc.clone();

    // Detach from the old parent's child list.
    if let Some(parent_key) = &links.parent {
        let mut parent = next.expect_block(parent_key).clone();
        parent.links_mut().children.retain(|child| child != key);
        next.blocks_mut().replace(parent);
    }

    match side {
        SiblingSide::Previous => {
            let old_last = sibling.children().last().cloned();
            let mut container = next.expect_block(&sibling_key).clone();
            {
                let container_links = container.links_mut();
                container_links.children.push(key.clone());
                container_links.next_sibling = links.next_sibling.clone();
            }
            next.blocks_mut().replace(container);
            if let Some(next_key) = &links.next_sibling {
                set_sibling(&mut next, next_key, SiblingSide::Previous, Some(sibling_key.clone()));
            }
            if let Some(old_last) = &old_last {
                set_sibling(&mut next, old_last, SiblingSide::Next, Some(key.clone()));
            }
            let mut child = next.expect_block(key).clone();
            {
                let child_links = child.links_mut();
                child_links.parent = Some(sibling_key.clone());
                child_links.prev_sibling = old_last;
                child_links.next_sibling = None;
            }
            next.blocks_mut().replace(child);
            // The block already trails the container's subtree in map order.
        }
        SiblingSide::Next => {
            let old_first = sibling.children().first().cloned();
            let mut container = next.expect_block(&sibling_key).clone();
            {
                let container_links = container.links_mut();
                container_links.children.insert(0, key.clone());
                container_links.prev_sibling = links.prev_sibling.clone();
            }
            next.blocks_mut().replace(container);
            if let Some(prev_key) = &links.prev_sibling {
                set_sibling(&mut next, prev_key, SiblingSide::Next, Some(sibling_key.clone()));
            }
            if let Some(old_first) = &old_first {
                set_sibling(&mut next, old_first, SiblingSide::Previous, Some(key.clone()));
            }
            let mut child = next.expect_block(key).clone();
            {
                let child_links = child.links_mut();
                child_links.parent = Some(sibling_key.clone());
                child_links.prev_sibling = None;
                child_links.next_sibling = old_first;
            }
            next.blocks_mut().replace(child);
            // Depth-first order now puts the container first: the block's
            // subtree moves to just after it.
            next.blocks_mut().move_subtree_after(key, &sibling_key);
        }
    }

    debug_assert!(validate_tree(&next).is_ok());
    next
}

/// Promotes a first or last child to be a sibling of its former parent. A
/// parent left childless is deleted, its remaining sibling links spliced
/// together. Panics for middle children.
pub fn move_child_up(doc: &Document, key: &BlockKey) -> Document {
    let block = doc.expect_block(key).clone();
    let parent_key = block
        .parent()
        .unwrap_or_else(|| panic!("`{key}` has no parent to move out of"))
        .clone();
    let parent = doc.expect_block(&parent_key).clone();
    let parent_links = parent.links().expect("parent is a tree node").clone();
    let position = parent_links
        .children
        .iter()
        .position(|child| child == key)
        .expect("block listed in its parent");
    assert!(
        position == 0 || position == parent_links.children.len() - 1,
        "only a first or last child can move up"
    );
    let first = position == 0;
    debug!(%key, parent = %parent_key, first, "move child up");

    let mut next = doc.clone();

    // Detach from the parent.
    let mut updated_parent = parent.clone();
    updated_parent.links_mut().children.remove(position);
    let parent_now_childless = updated_parent.children().is_empty();
    next.blocks_mut().replace(updated_parent);

    if first {
        // The block becomes the parent's previous sibling.
        if let Some(new_first) = parent_links.children.get(1) {
            set_sibling(&mut next, new_first, SiblingSide::Previous, None);
        }
        let mut child = next.expect_block(key).clone();
        {
            let child_links = child.links_mut();
            child_links.parent = parent_links.parent.clone();
            child_links.prev_sibling = parent_links.prev_sibling.clone();
            child_links.next_sibling = Some(parent_key.clone());
        }
        next.blocks_mut().replace(child);
        if let Some(prev_key) = &parent_links.prev_sibling {
            set_sibling(&mut next, prev_key, SiblingSide::Next, Some(key.clone()));
        }
        set_sibling(&mut next, &parent_key, SiblingSide::Previous, Some(key.clone()));
        if let Some(grandparent_key) = &parent_links.parent {
            let mut grandparent = next.expect_block(grandparent_key).clone();
            let parent_position = grandparent
                .children()
                .iter()
                .position(|child| child == &parent_key)
                .expect("parent listed in the grandparent");
            grandparent
                .links_mut()
                .children
                .insert(parent_position, key.clone());
            next.blocks_mut().replace(grandparent);
        }
        // Depth-first order now puts the block's subtree before its old
        // parent.
        next.blocks_mut().move_subtree_before(key, &parent_key);
    } else {
        // The block becomes the parent's next sibling.
        if let Some(new_last) = parent_links
            .children
            .len()
            .checked_sub(2)
            .and_then(|idx| parent_links.children.get(idx))
        {
            set_sibling(&mut next, new_last, SiblingSide::Next, None);
        }
        let mut child = next.expect_block(key).clone();
        {
            let child_links = child.links_mut();
            child_links.parent = parent_links.parent.clone();
            child_links.prev_sibling = Some(parent_key.clone());
            child_links.next_sibling = parent_links.next_sibling.clone();
        }
        next.blocks_mut().replace(child);
        if let Some(next_key) = &parent_links.next_sibling {
            set_sibling(&mut next, next_key, SiblingSide::Previous, Some(key.clone()));
        }
        set_sibling(&mut next, &parent_key, SiblingSide::Next, Some(key.clone()));
        if let Some(grandparent_key) = &parent_links.parent {
            let mut grandparent = next.expect_block(grandparent_key).clone();
            let parent_position = grandparent
                .children()
                .iter()
                .position(|child| child == &parent_key)
                .expect("parent listed in the grandparent");
            grandparent
                .links_mut()
                .children
                .insert(parent_position + 1, key.clone());
            next.blocks_mut().replace(grandparent);
        }
        // The last child already trails the parent's subtree in map order.
    }

    if parent_now_childless {
        remove_childless_parent(&mut next, &parent_key, key, first);
    }

    debug_assert!(validate_tree(&next).is_ok());
    next
}

/// Deletes a parent emptied by [`move_child_up`], splicing the promoted
/// block into the parent's old sibling chain.
fn remove_childless_parent(next: &mut Document, parent_key: &BlockKey, key: &BlockKey, first: bool) {
    let parent = next.expect_block(parent_key).clone();
    let parent_links = parent.links().expect("parent is a tree node").clone();
    next.blocks_mut().remove(parent_key);

    if let Some(grandparent_key) = &parent_links.parent {
        let mut grandparent = next.expect_block(grandparent_key).clone();
        grandparent
            .links_mut()
            .children
            .retain(|child| child != parent_key);
        next.blocks_mut().replace(grandparent);
    }

    let mut child = next.expect_block(key).clone();
    if first {
        // Chain was prev -> key -> parent -> parent.next.
        child.links_mut().next_sibling = parent_links.next_sibling.clone();
        next.blocks_mut().replace(child);
        if let Some(next_key) = &parent_links.next_sibling {
            set_sibling(next, next_key, SiblingSide::Previous, Some(key.clone()));
        }
    } else {
        // Chain was parent.prev -> parent -> key -> next.
        child.links_mut().prev_sibling = parent_links.prev_sibling.clone();
        next.blocks_mut().replace(child);
        if let Some(prev_key) = &parent_links.prev_sibling {
            set_sibling(next, prev_key, SiblingSide::Next, Some(key.clone()));
        }
    }
}

/// Merges `key`'s children with its next sibling's children when both are
/// containers of the same kind, deleting the emptied sibling. Anything else
/// is returned unchanged.
pub fn merge_blocks(doc: &Document, key: &BlockKey) -> Document {
    let block = doc.expect_block(key).clone();
    let Some(sibling_key) = block.next_sibling().cloned() else {
        return doc.clone();
    };
    let sibling = doc.expect_block(&sibling_key).clone();
    if block.children().is_empty()
        || sibling.children().is_empty()
        || block.block_type() != sibling.block_type()
    {
        return doc.clone();
    }
    debug!(%key, sibling = %sibling_key, "merge containers");

    let mut next = doc.clone();
    let old_last = block.children().last().cloned();
    let adopted = sibling.children().to_vec();
    let sibling_links = sibling.links().expect("sibling is a tree node").clone();

    let mut merged = block.clone();
    {
        let links = merged.links_mut();
        links.children.extend(adopted.iter().cloned());
        links.next_sibling = sibling_links.next_sibling.clone();
    }
    next.blocks_mut().replace(merged);

    for child_key in &adopted {
        let mut child = next.expect_block(child_key).clone();
        child.links_mut().parent = Some(key.clone());
        next.blocks_mut().replace(child);
    }
    if let (Some(old_last), Some(first_adopted)) = (&old_last, adopted.first()) {
        set_sibling(&mut next, old_last, SiblingSide::Next, Some(first_adopted.clone()));
        set_sibling(&mut next, first_adopted, SiblingSide::Previous, Some(old_last.clone()));
    }
    if let Some(next_key) = &sibling_links.next_sibling {
        set_sibling(&mut next, next_key, SiblingSide::Previous, Some(key.clone()));
    }
    if let Some(parent_key) = &sibling_links.parent {
        let mut parent = next.expect_block(parent_key).clone();
        parent
            .links_mut()
            .children
            .retain(|child| child != &sibling_key);
        next.blocks_mut().replace(parent);
    }
    next.blocks_mut().remove(&sibling_key);

    debug_assert!(validate_tree(&next).is_ok());
    next
}

fn set_sibling(next: &mut Document, key: &BlockKey, side: SiblingSide, target: Option<BlockKey>) {
    let mut block = next.expect_block(key).clone().as_tree_node();
    match side {
        SiblingSide::Previous => block.links_mut().prev_sibling = target,
        SiblingSide::Next => block.links_mut().next_sibling = target,
    }
    next.blocks_mut().replace(block);
}


#[cfg(test)]
#[path = "tree/validate_tests.rs"]
mod validate_tests;
