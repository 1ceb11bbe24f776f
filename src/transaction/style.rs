use tracing::debug;

use super::remove;
use crate::DataMap;
use crate::block::{BlockType, ContentBlock};
use crate::document::Document;
use crate::key::{BlockKey, EntityKey};
use crate::metadata::CharacterMetadata;
use crate::selection::SelectionState;

/// Adds `style` to every character in the selection.
pub fn apply_inline_style(doc: &Document, sel: &SelectionState, style: &str) -> Document {
    debug!(style, "apply inline style");
    transform_chars(doc, sel, |meta| meta.apply_style(style))
}

/// Removes `style` from every character in the selection.
pub fn remove_inline_style(doc: &Document, sel: &SelectionState, style: &str) -> Document {
    debug!(style, "remove inline style");
    transform_chars(doc, sel, |meta| meta.remove_style(style))
}

/// Stamps `entity` onto every character in the selection, after stripping
/// entities cut by the selection edges so a neighboring entity never leaks
/// into the freshly stamped range.
pub fn apply_entity(doc: &Document, sel: &SelectionState, entity: Option<&EntityKey>) -> Document {
    debug!(entity = entity.map(EntityKey::as_str), "apply entity");
    let mut base = doc.clone();
    remove::strip_entity_at(&mut base, sel.start_key(), sel.start_offset());
    remove::strip_entity_at(&mut base, sel.end_key(), sel.end_offset());
    transform_chars(&base, sel, |meta| meta.apply_entity(entity.cloned()))
}

/// Sets the type of every block the selection touches.
pub fn set_block_type(doc: &Document, sel: &SelectionState, block_type: &BlockType) -> Document {
    debug!(block_type = block_type.as_str(), "set block type");
    transform_blocks(doc, sel, |block| block.with_type(block_type.clone()))
}

/// Replaces the data of every block the selection touches.
pub fn set_block_data(doc: &Document, sel: &SelectionState, data: &DataMap) -> Document {
    transform_blocks(doc, sel, |block| block.with_data(data.clone()))
}

/// Overlays `data` onto the data of every block the selection touches.
pub fn merge_block_data(doc: &Document, sel: &SelectionState, data: &DataMap) -> Document {
    transform_blocks(doc, sel, |block| {
        let mut merged = block.data().clone();
        for (name, value) in data {
            merged.insert(name.clone(), value.clone());
        }
        block.with_data(merged)
    })
}

/// Shifts the depth of every block the selection touches by `adjustment`,
/// clamped to `0..=max_depth`.
pub fn adjust_block_depth(
    doc: &Document,
    sel: &SelectionState,
    adjustment: isize,
    max_depth: usize,
) -> Document {
    transform_blocks(doc, sel, |block| {
        let depth = block
            .depth()
            .saturating_add_signed(adjustment)
            .min(max_depth);
        block.with_depth(depth)
    })
}

/// The char range of `block` overlapped by the selection.
fn block_overlap(block: &ContentBlock, key: &BlockKey, sel: &SelectionState) -> (usize, usize) {
    let start = if key == sel.start_key() {
        sel.start_offset().min(block.len())
    } else {
        0
    };
    let end = if key == sel.end_key() {
        sel.end_offset().min(block.len())
    } else {
        block.len()
    };
    (start, end)
}

fn transform_chars<F>(doc: &Document, sel: &SelectionState, f: F) -> Document
where
    F: Fn(&CharacterMetadata) -> CharacterMetadata,
{
    let mut next = doc.clone();
    for key in doc.blocks().keys_in_range(sel.start_key(), sel.end_key()) {
        let block = next.expect_block(&key).clone();
        let (start, end) = block_overlap(&block, &key, sel);
        if start >= end {
            continue;
        }
        let text = block.text().to_string();
        let chars = block.chars().map_range(start, end, &f);
        next.blocks_mut()
            .replace(block.with_text_and_chars(&text, chars));
    }
    next.with_selection_before(sel.clone())
        .with_selection_after(sel.clone())
}

fn transform_blocks<F>(doc: &Document, sel: &SelectionState, f: F) -> Document
where
    F: Fn(ContentBlock) -> ContentBlock,
{
    let mut next = doc.clone();
    for key in doc.blocks().keys_in_range(sel.start_key(), sel.end_key()) {
        let block = next.expect_block(&key).clone();
        next.blocks_mut().replace(f(block));
    }
    next.with_selection_before(sel.clone())
        .with_selection_after(sel.clone())
}
