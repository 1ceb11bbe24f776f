use pretty_assertions::assert_eq;

use super::*;
use crate::block::ContentBlock;
use crate::document::Document;
use crate::key::BlockKey;
use crate::selection::SelectionState;
use crate::style::StyleSet;

fn text_block(key: &str, text: &str) -> ContentBlock {
    ContentBlock::new(BlockKey::from(key)).with_text(text)
}

fn caret(key: &str, offset: usize) -> SelectionState {
    SelectionState::collapsed(BlockKey::from(key), offset)
}

#[test]
fn insert_text_splices_into_the_block() {
    let doc = Document::from_block_array(vec![text_block("a", "Helo")]);
    let next = insert_text(&doc, &caret("a", 3), "l", &StyleSet::empty(), None);

    let block = next.expect_block(&BlockKey::from("a"));
    assert_eq!(block.text(), "Hello");
    assert_eq!(block.chars().len(), 5);
    assert_eq!(next.selection_after(), &caret("a", 4));
    assert_eq!(next.selection_before(), &caret("a", 3));

    // The input document is untouched.
    assert_eq!(doc.expect_block(&BlockKey::from("a")).text(), "Helo");
}

#[test]
fn inserted_characters_carry_the_given_style() {
    let doc = Document::from_block_array(vec![text_block("a", "ac")]);
    let next = insert_text(&doc, &caret("a", 1), "b", &StyleSet::of("BOLD"), None);

    let block = next.expect_block(&BlockKey::from("a"));
    assert!(block.chars().get(1).unwrap().has_style("BOLD"));
    assert!(!block.chars().get(0).unwrap().has_style("BOLD"));
    assert!(!block.chars().get(2).unwrap().has_style("BOLD"));
}

#[test]
fn insert_then_remove_restores_the_block() {
    let doc = Document::from_block_array(vec![text_block("a", "Hello")]);
    let original = doc.expect_block(&BlockKey::from("a")).clone();

    let inserted = insert_text(&doc, &caret("a", 2), "xyz", &StyleSet::of("BOLD"), None);
    let removal = SelectionState::new(BlockKey::from("a"), 2, BlockKey::from("a"), 5, false);
    let restored = remove_range(&inserted, &removal, RemovalDirection::Backward);

    let block = restored.expect_block(&BlockKey::from("a"));
    assert_eq!(block.text(), original.text());
    assert_eq!(block.chars(), original.chars());
}

#[test]
fn insert_into_an_empty_block_works_at_offset_zero() {
    let doc = Document::from_block_array(vec![text_block("a", "")]);
    let next = insert_text(&doc, &caret("a", 0), "hi", &StyleSet::empty(), None);
    assert_eq!(next.expect_block(&BlockKey::from("a")).text(), "hi");
    assert_eq!(next.selection_after(), &caret("a", 2));
}

#[test]
#[should_panic(expected = "collapsed selection")]
fn insert_text_rejects_ranged_selections() {
    let doc = Document::from_block_array(vec![text_block("a", "Hello")]);
    let range = SelectionState::new(BlockKey::from("a"), 1, BlockKey::from("a"), 3, false);
    let _ = insert_text(&doc, &range, "x", &StyleSet::empty(), None);
}

#[test]
#[should_panic(expected = "beyond block")]
fn insert_text_rejects_out_of_range_offsets() {
    let doc = Document::from_block_array(vec![text_block("a", "ab")]);
    let _ = insert_text(&doc, &caret("a", 5), "x", &StyleSet::empty(), None);
}

#[test]
fn replace_text_removes_the_range_first() {
    let doc = Document::from_block_array(vec![text_block("a", "Hello world")]);
    let range = SelectionState::new(BlockKey::from("a"), 6, BlockKey::from("a"), 11, false);
    let next = replace_text(&doc, &range, "there", &StyleSet::empty(), None);

    assert_eq!(next.expect_block(&BlockKey::from("a")).text(), "Hello there");
    assert_eq!(next.selection_after(), &caret("a", 11));
    assert_eq!(next.selection_before(), &range);
}

#[test]
fn replace_text_across_blocks_merges_them() {
    let doc = Document::from_block_array(vec![text_block("a", "one"), text_block("b", "two")]);
    let range = SelectionState::new(BlockKey::from("a"), 2, BlockKey::from("b"), 1, false);
    let next = replace_text(&doc, &range, "-", &StyleSet::empty(), None);

    assert_eq!(next.blocks().len(), 1);
    assert_eq!(next.expect_block(&BlockKey::from("a")).text(), "on-wo");
}
