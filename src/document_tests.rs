use pretty_assertions::assert_eq;

use super::*;
use crate::entity::Mutability;

fn text_block(key: &str, text: &str) -> ContentBlock {
    ContentBlock::new(BlockKey::from(key)).with_text(text)
}

fn three_block_document() -> Document {
    Document::from_block_array(vec![
        text_block("a", "alpha"),
        text_block("b", "beta"),
        text_block("c", "gamma"),
    ])
}

#[test]
fn from_block_array_preserves_document_order() {
    let doc = three_block_document();
    let keys: Vec<&str> = doc.blocks().keys().map(BlockKey::as_str).collect();
    assert_eq!(keys, ["a", "b", "c"]);
    assert_eq!(doc.first_block().text(), "alpha");
    assert_eq!(doc.last_block().text(), "gamma");
}

#[test]
fn from_block_array_of_nothing_yields_one_empty_block() {
    let doc = Document::from_block_array(Vec::new());
    assert_eq!(doc.blocks().len(), 1);
    assert!(doc.first_block().text().is_empty());
    assert_eq!(doc.selection_after().start_key(), doc.first_block().key());
}

#[test]
#[should_panic(expected = "duplicate block key")]
fn duplicate_keys_are_rejected() {
    let _ = Document::from_block_array(vec![text_block("a", "x"), text_block("a", "y")]);
}

#[test]
fn neighbor_queries_walk_document_order() {
    let doc = three_block_document();
    assert_eq!(doc.key_after(&BlockKey::from("a")), Some(&BlockKey::from("b")));
    assert_eq!(doc.key_before(&BlockKey::from("c")), Some(&BlockKey::from("b")));
    assert_eq!(doc.key_before(&BlockKey::from("a")), None);
    assert_eq!(doc.key_after(&BlockKey::from("c")), None);
    assert_eq!(doc.block_after(&BlockKey::from("a")).unwrap().text(), "beta");
}

#[test]
fn keys_in_range_is_inclusive() {
    let doc = three_block_document();
    let keys = doc
        .blocks()
        .keys_in_range(&BlockKey::from("a"), &BlockKey::from("c"));
    assert_eq!(keys.len(), 3);

    let single = doc
        .blocks()
        .keys_in_range(&BlockKey::from("b"), &BlockKey::from("b"));
    assert_eq!(single, vec![BlockKey::from("b")]);
}

#[test]
fn plain_text_joins_blocks_with_the_delimiter() {
    let doc = three_block_document();
    assert_eq!(doc.plain_text("\n"), "alpha\nbeta\ngamma");
}

#[test]
fn from_plain_text_splits_on_the_delimiter() {
    let doc = Document::from_plain_text("one\ntwo\nthree", "\n");
    assert_eq!(doc.blocks().len(), 3);
    assert_eq!(doc.plain_text("\n"), "one\ntwo\nthree");
}

#[test]
fn has_text_ignores_zero_width_spaces() {
    let empty = Document::from_block_array(vec![text_block("a", "")]);
    assert!(!empty.has_text());

    let zero_width = Document::from_block_array(vec![text_block("a", "\u{200B}\u{200B}")]);
    assert!(!zero_width.has_text());

    let content = Document::from_block_array(vec![text_block("a", "x")]);
    assert!(content.has_text());

    let two_empty = Document::from_block_array(vec![text_block("a", ""), text_block("b", "")]);
    assert!(two_empty.has_text());
}

#[test]
fn create_entity_leaves_the_original_document_untouched() {
    let doc = three_block_document();
    let (updated, key) = doc.create_entity(Entity::new(
        "LINK",
        Mutability::Mutable,
        DataMap::new(),
    ));
    assert!(doc.entity(&key).is_none());
    assert_eq!(updated.expect_entity(&key).entity_type(), "LINK");
}

#[test]
#[should_panic(expected = "unknown block key")]
fn expect_block_panics_on_stale_keys() {
    three_block_document().expect_block(&BlockKey::from("zz"));
}
