use tracing::debug;

use super::{RemovalDirection, fresh_block_key, remove};
use crate::block::{ContentBlock, TreeLinks, slice_text};
use crate::document::Document;
use crate::selection::SelectionState;

/// Splits one block into two siblings at the selection point, removing the
/// selected range first if there is one. The head keeps the block's type,
/// depth and data; the tail starts over as an unstyled block. The selection
/// lands at the start of the tail.
pub fn split_block(doc: &Document, sel: &SelectionState) -> Document {
    let (mut base, point) = if sel.is_collapsed() {
        let mut base = doc.clone();
        remove::strip_entity_at(&mut base, sel.start_key(), sel.start_offset());
        (base, sel.clone())
    } else {
        let removed = remove::remove_range(doc, sel, RemovalDirection::Backward);
        let point = removed.selection_after().clone();
        (removed, point)
    };

    let key = point.start_key().clone();
    let offset = point.start_offset();
    let block = base.expect_block(&key).clone();
    assert!(
        block.children().is_empty(),
        "cannot split container block `{key}`"
    );
    debug!(%key, offset, "split block");

    let tail_key = fresh_block_key(base.blocks());
    let head_text = slice_text(block.text(), 0, offset);
    let head_chars = block.chars().slice(0, offset);
    let tail_text = slice_text(block.text(), offset, block.len());
    let tail_chars = block.chars().slice(offset, block.len());

    let mut head = block.clone().with_text_and_chars(&head_text, head_chars);
    let mut tail = ContentBlock::new(tail_key.clone())
        .with_text_and_chars(&tail_text, tail_chars)
        .with_depth(block.depth());

    if let Some(links) = block.links() {
        let old_next = links.next_sibling.clone();
        tail = tail.with_links(TreeLinks {
            parent: links.parent.clone(),
            children: Vec::new(),
            prev_sibling: Some(key.clone()),
            next_sibling: old_next.clone(),
        });
        head.links_mut().next_sibling = Some(tail_key.clone());

        if let Some(parent_key) = &links.parent {
            let mut parent = base.expect_block(parent_key).clone();
            let position = parent
                .children()
                .iter()
                .position(|child| child == &key)
                .expect("block listed in its parent");
            parent.links_mut().children.insert(position + 1, tail_key.clone());
            base.blocks_mut().replace(parent);
        }
        if let Some(next_key) = &old_next {
            let mut next_block = base.expect_block(next_key).clone();
            next_block.links_mut().prev_sibling = Some(tail_key.clone());
            base.blocks_mut().replace(next_block);
        }
    }

    base.blocks_mut().replace(head);
    base.blocks_mut().insert_after(&key, tail);

    let after = SelectionState::collapsed(tail_key, 0).with_has_focus(sel.has_focus());
    base.with_selection_before(sel.clone()).with_selection_after(after)
}
