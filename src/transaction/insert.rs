use tracing::debug;

use super::RemovalDirection;
use super::remove;
use crate::block::splice_text;
use crate::document::Document;
use crate::key::EntityKey;
use crate::metadata::CharacterMetadata;
use crate::selection::SelectionState;
use crate::style::StyleSet;

/// Splices `text` into the block at the collapsed selection, every inserted
/// character carrying `style` and `entity`.
///
/// Panics if the selection is not collapsed: callers with a range must use
/// [`replace_text`].
pub fn insert_text(
    doc: &Document,
    sel: &SelectionState,
    text: &str,
    style: &StyleSet,
    entity: Option<&EntityKey>,
) -> Document {
    assert!(
        sel.is_collapsed(),
        "insert_text requires a collapsed selection"
    );
    debug!(chars = text.chars().count(), "insert text");

    let key = sel.start_key().clone();
    let offset = sel.start_offset();
    let block = doc.expect_block(&key).clone();
    assert!(
        offset <= block.len(),
        "offset {offset} is beyond block `{key}` of length {}",
        block.len()
    );

    let inserted_len = text.chars().count();
    let meta = CharacterMetadata::new(style.clone(), entity.cloned());
    let new_text = splice_text(block.text(), offset, offset, text);
    let new_chars = block.chars().splice(offset, offset, &vec![meta; inserted_len]);

    let mut next = doc.clone();
    next.blocks_mut()
        .replace(block.with_text_and_chars(&new_text, new_chars));

    let after = SelectionState::collapsed(key, offset + inserted_len).with_has_focus(sel.has_focus());
    next.with_selection_before(sel.clone())
        .with_selection_after(after)
}

/// Removes the selected range, then inserts `text` at the collapsed point.
/// Equivalent to [`insert_text`] when the selection is already collapsed.
pub fn replace_text(
    doc: &Document,
    sel: &SelectionState,
    text: &str,
    style: &StyleSet,
    entity: Option<&EntityKey>,
) -> Document {
    if sel.is_collapsed() {
        return insert_text(doc, sel, text, style, entity);
    }
    let removed = remove::remove_range(doc, sel, RemovalDirection::Backward);
    let point = removed.selection_after().clone();
    insert_text(&removed, &point, text, style, entity).with_selection_before(sel.clone())
}
