use std::collections::HashSet;

use pretty_assertions::assert_eq;

use super::*;
use crate::block::{BlockType, ContentBlock};
use crate::document::Document;
use crate::key::BlockKey;
use crate::selection::SelectionState;

fn text_block(key: &str, text: &str) -> ContentBlock {
    ContentBlock::new(BlockKey::from(key)).with_text(text)
}

fn caret(key: &str, offset: usize) -> SelectionState {
    SelectionState::collapsed(BlockKey::from(key), offset)
}

fn range(start_key: &str, start: usize, end_key: &str, end: usize) -> SelectionState {
    SelectionState::new(
        BlockKey::from(start_key),
        start,
        BlockKey::from(end_key),
        end,
        false,
    )
}

fn fragment(texts: &[&str]) -> Fragment {
    Fragment::new(
        texts
            .iter()
            .enumerate()
            .map(|(idx, text)| text_block(&format!("frag{idx}"), text))
            .collect(),
    )
}

#[test]
fn single_block_fragment_merges_into_the_target() {
    let doc = Document::from_block_array(vec![text_block("a", "AB")]);
    let next = replace_with_fragment(
        &doc,
        &caret("a", 1),
        &fragment(&["XY"]),
        FragmentDataPolicy::RetainExistingData,
    );

    assert_eq!(next.blocks().len(), 1);
    assert_eq!(next.expect_block(&BlockKey::from("a")).text(), "AXYB");
    assert_eq!(
        next.selection_after(),
        &SelectionState::collapsed(BlockKey::from("a"), 3)
    );
}

#[test]
fn fragment_type_wins_only_when_the_target_is_empty() {
    let empty = Document::from_block_array(vec![text_block("a", "")]);
    let quote = Fragment::new(vec![
        text_block("f", "quoted").with_type(BlockType::Blockquote),
    ]);
    let next = replace_with_fragment(
        &empty,
        &caret("a", 0),
        &quote,
        FragmentDataPolicy::RetainExistingData,
    );
    assert_eq!(
        next.expect_block(&BlockKey::from("a")).block_type(),
        &BlockType::Blockquote
    );

    let full = Document::from_block_array(vec![text_block("a", "text")]);
    let next = replace_with_fragment(
        &full,
        &caret("a", 2),
        &quote,
        FragmentDataPolicy::RetainExistingData,
    );
    assert_eq!(
        next.expect_block(&BlockKey::from("a")).block_type(),
        &BlockType::Unstyled
    );
}

#[test]
fn two_block_fragment_merges_head_and_tail() {
    let doc = Document::from_block_array(vec![text_block("a", "AB")]);
    let next = replace_with_fragment(
        &doc,
        &caret("a", 1),
        &fragment(&["X", "Y"]),
        FragmentDataPolicy::RetainExistingData,
    );

    assert_eq!(next.blocks().len(), 2);
    let head = next.expect_block(&BlockKey::from("a"));
    assert_eq!(head.text(), "AX");

    let tail = next.block_after(&BlockKey::from("a")).unwrap();
    assert_eq!(tail.text(), "YB");
    assert_eq!(
        next.selection_after(),
        &SelectionState::collapsed(tail.key().clone(), 1)
    );
}

#[test]
fn middle_fragment_blocks_go_in_verbatim_with_fresh_keys() {
    let doc = Document::from_block_array(vec![text_block("a", "AB")]);
    let next = replace_with_fragment(
        &doc,
        &caret("a", 1),
        &fragment(&["X", "M", "Y"]),
        FragmentDataPolicy::RetainExistingData,
    );

    let texts: Vec<&str> = next.blocks().blocks().map(ContentBlock::text).collect();
    assert_eq!(texts, ["AX", "M", "YB"]);

    // No inserted key may collide with the original fragment keys or with
    // each other.
    let keys: HashSet<&BlockKey> = next.blocks().keys().collect();
    assert_eq!(keys.len(), 3);
    assert!(!keys.contains(&BlockKey::from("frag0")));
    assert!(!keys.contains(&BlockKey::from("frag1")));
    assert!(!keys.contains(&BlockKey::from("frag2")));
}

#[test]
fn reinserting_the_same_fragment_never_collides() {
    let doc = Document::from_block_array(vec![text_block("a", "AB")]);
    let paste = fragment(&["X", "Y"]);
    let once = replace_with_fragment(
        &doc,
        &caret("a", 1),
        &paste,
        FragmentDataPolicy::RetainExistingData,
    );
    let caret_after = once.selection_after().clone();
    let twice = replace_with_fragment(&once, &caret_after, &paste, FragmentDataPolicy::RetainExistingData);

    assert_eq!(twice.blocks().len(), 3);
    let keys: HashSet<&BlockKey> = twice.blocks().keys().collect();
    assert_eq!(keys.len(), 3);
}

#[test]
fn replacing_a_range_deletes_it_before_inserting() {
    let doc = Document::from_block_array(vec![text_block("a", "Hello world")]);
    let next = replace_with_fragment(
        &doc,
        &range("a", 6, "a", 11),
        &fragment(&["there"]),
        FragmentDataPolicy::RetainExistingData,
    );
    assert_eq!(next.expect_block(&BlockKey::from("a")).text(), "Hello there");
}

#[test]
fn fragment_from_selection_slices_head_and_tail() {
    let doc = Document::from_block_array(vec![
        text_block("a", "alpha"),
        text_block("b", "beta"),
        text_block("c", "gamma"),
    ]);
    let captured = fragment_from_selection(&doc, &range("a", 2, "c", 3));

    let texts: Vec<&str> = captured.blocks().iter().map(ContentBlock::text).collect();
    assert_eq!(texts, ["pha", "beta", "gam"]);
}

#[test]
fn move_text_relocates_the_captured_range() {
    let doc = Document::from_block_array(vec![
        text_block("a", "one two"),
        text_block("b", "three"),
    ]);
    // Capture " two" from the first block, then drop it at the end of the
    // second block of the post-removal document.
    let next = move_text(&doc, &range("a", 3, "a", 7), &caret("b", 5));

    assert_eq!(next.expect_block(&BlockKey::from("a")).text(), "one");
    assert_eq!(next.expect_block(&BlockKey::from("b")).text(), "three two");
}

#[test]
#[should_panic(expected = "fragment cannot be empty")]
fn empty_fragments_are_rejected() {
    let _ = Fragment::new(Vec::new());
}
