//! Entity-aware expansion of removal ranges.
//!
//! Deleting inside an entity does not always remove just the requested
//! characters: IMMUTABLE entities go away whole, and SEGMENTED entities go
//! away one segment at a time. The expansion runs before any character is
//! touched.

use super::RemovalDirection;
use crate::block::{CharList, ContentBlock};
use crate::document::Document;
use crate::entity::Mutability;
use crate::key::EntityKey;
use crate::scan;

/// Widens `start..end` within `block` according to the mutability of the
/// entity covering the range. Ranges that are not contained in a single
/// entity run are returned unchanged.
pub(crate) fn expand_for_entity(
    doc: &Document,
    block: &ContentBlock,
    start: usize,
    end: usize,
    direction: RemovalDirection,
) -> (usize, usize) {
    let Some(meta) = block.chars().get(start) else {
        return (start, end);
    };
    let Some(entity_key) = meta.entity().cloned() else {
        return (start, end);
    };
    let (run_start, run_end) = entity_run(block.chars(), start, &entity_key);
    if end > run_end {
        return (start, end);
    }
    match doc.expect_entity(&entity_key).mutability() {
        Mutability::Mutable => (start, end),
        Mutability::Immutable => (run_start, run_end),
        Mutability::Segmented => segmented_range(block, run_start, run_end, start, end, direction),
    }
}

/// The maximal run of characters around `idx` sharing `key`.
pub(crate) fn entity_run(chars: &CharList, idx: usize, key: &EntityKey) -> (usize, usize) {
    let mut start = idx;
    while start > 0 && chars.get(start - 1).and_then(|meta| meta.entity()) == Some(key) {
        start -= 1;
    }
    let mut end = idx + 1;
    while chars.get(end).and_then(|meta| meta.entity()) == Some(key) {
        end += 1;
    }
    (start, end)
}

/// Expands to the boundary of the whitespace-delimited segment nearest the
/// removal, on the side the user was deleting toward.
fn segmented_range(
    block: &ContentBlock,
    run_start: usize,
    run_end: usize,
    start: usize,
    end: usize,
    direction: RemovalDirection,
) -> (usize, usize) {
    let run_chars: Vec<char> = block
        .text()
        .chars()
        .skip(run_start)
        .take(run_end - run_start)
        .collect();
    let mut segments: Vec<(usize, usize)> = Vec::new();
    scan::find_ranges(
        &run_chars,
        |a, b| a.is_whitespace() == b.is_whitespace(),
        |ch| !ch.is_whitespace(),
        |seg_start, seg_end| segments.push((run_start + seg_start, run_start + seg_end)),
    );

    match direction {
        RemovalDirection::Backward => {
            let seg_start = segments
                .iter()
                .find(|(s, e)| *s <= start && start < *e)
                .map(|(s, _)| *s)
                .unwrap_or(start);
            (seg_start, end)
        }
        RemovalDirection::Forward => {
            let last = end.saturating_sub(1);
            let seg_end = segments
                .iter()
                .find(|(s, e)| *s <= last && last < *e)
                .map(|(_, e)| *e)
                .unwrap_or(end);
            (start, seg_end)
        }
    }
}
