use pretty_assertions::assert_eq;

use super::*;
use crate::block::{ContentBlock, TreeLinks};
use crate::document::Document;
use crate::key::BlockKey;

fn node(key: &str) -> ContentBlock {
    ContentBlock::new(BlockKey::from(key))
}

fn links(
    parent: Option<&str>,
    children: &[&str],
    prev: Option<&str>,
    next: Option<&str>,
) -> TreeLinks {
    TreeLinks {
        parent: parent.map(BlockKey::from),
        children: children.iter().copied().map(BlockKey::from).collect(),
        prev_sibling: prev.map(BlockKey::from),
        next_sibling: next.map(BlockKey::from),
    }
}

#[test]
fn flat_documents_are_vacuously_valid() {
    let doc = Document::from_block_array(vec![
        node("a").with_text("one"),
        node("b").with_text("two"),
    ]);
    assert_eq!(validate_tree(&doc), Ok(()));
}

#[test]
fn a_minimal_tree_is_valid() {
    let doc = Document::from_block_array(vec![
        node("root").with_links(links(None, &["a"], None, None)),
        node("a").with_text("hi").with_links(links(Some("root"), &[], None, None)),
    ]);
    assert_eq!(validate_tree(&doc), Ok(()));
}

#[test]
fn mixed_variants_are_invalid() {
    let doc = Document::from_block_array(vec![
        node("root").with_links(links(None, &["a"], None, None)),
        node("a").with_text("hi").with_links(links(Some("root"), &[], None, None)),
        node("b").with_text("flat"),
    ]);
    assert_eq!(validate_tree(&doc), Err(TreeError::MixedVariants));
}

#[test]
fn a_child_missing_from_its_parents_list_is_invalid() {
    // b claims root as parent but root does not list it.
    let doc = Document::from_block_array(vec![
        node("root").with_links(links(None, &["a"], None, None)),
        node("a").with_text("hi").with_links(links(Some("root"), &[], None, None)),
        node("b").with_text("lost").with_links(links(Some("root"), &[], None, None)),
    ]);
    assert_eq!(
        validate_tree(&doc),
        Err(TreeError::ParentChildMismatch {
            parent: "root".to_string(),
            child: "b".to_string(),
        })
    );
}

#[test]
fn non_reciprocal_sibling_links_are_invalid() {
    let doc = Document::from_block_array(vec![
        node("root").with_links(links(None, &["a", "b"], None, None)),
        node("a").with_text("one").with_links(links(Some("root"), &[], None, Some("b"))),
        // b forgot its previous sibling.
        node("b").with_text("two").with_links(links(Some("root"), &[], None, None)),
    ]);
    assert!(matches!(
        validate_tree(&doc),
        Err(TreeError::SiblingMismatch { .. })
    ));
}

#[test]
fn identical_prev_and_next_siblings_are_invalid() {
    // Two root-level nodes where y's sibling links loop back to x on both
    // sides. A linear sibling list can never produce this.
    let doc = Document::from_block_array(vec![
        node("x").with_text("one").with_links(links(None, &[], None, Some("y"))),
        node("y").with_text("two").with_links(links(None, &[], Some("x"), Some("x"))),
    ]);
    assert_eq!(
        validate_tree(&doc),
        Err(TreeError::SiblingRing {
            key: "y".to_string(),
        })
    );
}

#[test]
fn text_and_children_together_are_invalid() {
    let doc = Document::from_block_array(vec![
        node("root")
            .with_text("container text")
            .with_links(links(None, &["a"], None, None)),
        node("a").with_text("hi").with_links(links(Some("root"), &[], None, None)),
    ]);
    assert_eq!(
        validate_tree(&doc),
        Err(TreeError::LeafWithChildren {
            key: "root".to_string(),
        })
    );
}

#[test]
fn two_roots_are_invalid() {
    let doc = Document::from_block_array(vec![
        node("r1").with_links(links(None, &["a"], None, None)),
        node("a").with_text("one").with_links(links(Some("r1"), &[], None, None)),
        node("r2").with_links(links(None, &["b"], None, None)),
        node("b").with_text("two").with_links(links(Some("r2"), &[], None, None)),
    ]);
    assert_eq!(validate_tree(&doc), Err(TreeError::RootCount { count: 2 }));
}

#[test]
fn a_disconnected_cluster_fails_traversal_coverage() {
    // c1 and c2 parent each other: individually consistent, but the
    // depth-first walk from the root never reaches them.
    let doc = Document::from_block_array(vec![
        node("root").with_links(links(None, &["a"], None, None)),
        node("a").with_text("hi").with_links(links(Some("root"), &[], None, None)),
        node("c1").with_links(links(Some("c2"), &["c2"], None, None)),
        node("c2").with_links(links(Some("c1"), &["c1"], None, None)),
    ]);
    assert!(matches!(
        validate_tree(&doc),
        Err(TreeError::TraversalCoverage { .. })
    ));
}

#[test]
fn a_link_to_a_missing_block_is_invalid() {
    let doc = Document::from_block_array(vec![
        node("root").with_links(links(None, &["a", "ghost"], None, None)),
        node("a").with_text("hi").with_links(links(Some("root"), &[], None, None)),
    ]);
    assert!(matches!(
        validate_tree(&doc),
        Err(TreeError::MissingBlock { .. })
    ));
}
