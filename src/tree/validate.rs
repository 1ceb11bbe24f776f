use std::collections::HashSet;

use thiserror::Error;

use crate::document::Document;
use crate::key::BlockKey;

/// A violated nested-block invariant, naming the offending blocks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("document mixes flat and tree-node blocks")]
    MixedVariants,
    #[error("link on `{from}` points at missing block `{to}`")]
    MissingBlock { from: String, to: String },
    #[error("`{child}` and `{parent}` disagree about their parent/child relation")]
    ParentChildMismatch { parent: String, child: String },
    #[error("sibling links between `{a}` and `{b}` do not agree")]
    SiblingMismatch { a: String, b: String },
    #[error("`{key}` has identical previous and next siblings")]
    SiblingRing { key: String },
    #[error("`{key}` has text and children")]
    LeafWithChildren { key: String },
    #[error("expected exactly one tree root, found {count}")]
    RootCount { count: usize },
    #[error("depth-first traversal visited {visited} of {total} blocks")]
    TraversalCoverage { visited: usize, total: usize },
}

/// Checks the full nested-block invariant:
///
/// 1. parent and child lists agree in both directions,
/// 2. sibling links are reciprocal and follow child-list order,
/// 3. no block lists the same non-null key as both siblings,
/// 4. a block with text has no children,
/// 5. exactly one block has neither parent nor previous sibling, and a
///    depth-first traversal from it visits every block exactly once.
///
/// Documents made only of flat blocks pass vacuously.
pub fn validate_tree(doc: &Document) -> Result<(), TreeError> {
    let blocks = doc.blocks();
    let tree_count = blocks.blocks().filter(|block| block.is_tree()).count();
    if tree_count == 0 {
        return Ok(());
    }
    if tree_count != blocks.len() {
        return Err(TreeError::MixedVariants);
    }

    for (key, block) in blocks.iter() {
        let links = block.links().expect("counted as a tree node");

        if !block.text().is_empty() && !links.children.is_empty() {
            return Err(TreeError::LeafWithChildren {
                key: key.to_string(),
            });
        }

        if let (Some(prev), Some(next)) = (&links.prev_sibling, &links.next_sibling)
            && prev == next
        {
            return Err(TreeError::SiblingRing {
                key: key.to_string(),
            });
        }

        // Parent/child agreement, both directions.
        if let Some(parent_key) = &links.parent {
            let parent = blocks.get(parent_key).ok_or_else(|| TreeError::MissingBlock {
                from: key.to_string(),
                to: parent_key.to_string(),
            })?;
            if !parent.children().contains(key) {
                return Err(TreeError::ParentChildMismatch {
                    parent: parent_key.to_string(),
                    child: key.to_string(),
                });
            }
        }
        for child_key in &links.children {
            let child = blocks.get(child_key).ok_or_else(|| TreeError::MissingBlock {
                from: key.to_string(),
                to: child_key.to_string(),
            })?;
            if child.parent() != Some(key) {
                return Err(TreeError::ParentChildMismatch {
                    parent: key.to_string(),
                    child: child_key.to_string(),
                });
            }
        }

        // Child-list order must match the sibling chain.
        for (idx, child_key) in links.children.iter().enumerate() {
            let child = blocks.get(child_key).ok_or_else(|| TreeError::MissingBlock {
                from: key.to_string(),
                to: child_key.to_string(),
            })?;
            let expected_prev = idx.checked_sub(1).map(|i| &links.children[i]);
            let expected_next = links.children.get(idx + 1);
            if child.prev_sibling() != expected_prev || child.next_sibling() != expected_next {
                return Err(TreeError::SiblingMismatch {
                    a: child_key.to_string(),
                    b: expected_prev
                        .or(expected_next)
                        .map(ToString::to_string)
                        .unwrap_or_default(),
                });
            }
        }

        // Sibling reciprocity.
        if let Some(next_key) = &links.next_sibling {
            let sibling = blocks.get(next_key).ok_or_else(|| TreeError::MissingBlock {
                from: key.to_string(),
                to: next_key.to_string(),
            })?;
            if sibling.prev_sibling() != Some(key) {
                return Err(TreeError::SiblingMismatch {
                    a: key.to_string(),
                    b: next_key.to_string(),
                });
            }
        }
        if let Some(prev_key) = &links.prev_sibling {
            let sibling = blocks.get(prev_key).ok_or_else(|| TreeError::MissingBlock {
                from: key.to_string(),
                to: prev_key.to_string(),
            })?;
            if sibling.next_sibling() != Some(key) {
                return Err(TreeError::SiblingMismatch {
                    a: prev_key.to_string(),
                    b: key.to_string(),
                });
            }
        }
    }

    // Exactly one tree root: no parent and no previous sibling.
    let roots: Vec<&BlockKey> = blocks
        .iter()
        .filter(|(_, block)| block.parent().is_none() && block.prev_sibling().is_none())
        .map(|(key, _)| key)
        .collect();
    if roots.len() != 1 {
        return Err(TreeError::RootCount { count: roots.len() });
    }

    // Depth-first traversal: parent first, children left to right, then the
    // next sibling. Every block must be reached exactly once.
    let mut visited: HashSet<BlockKey> = HashSet::with_capacity(blocks.len());
    let mut chain = Some(roots[0].clone());
    while let Some(key) = chain {
        visit_subtree(doc, &key, &mut visited)?;
        chain = doc
            .block_for_key(&key)
            .and_then(|block| block.next_sibling().cloned());
    }
    if visited.len() != blocks.len() {
        return Err(TreeError::TraversalCoverage {
            visited: visited.len(),
            total: blocks.len(),
        });
    }

    Ok(())
}

fn visit_subtree(
    doc: &Document,
    key: &BlockKey,
    visited: &mut HashSet<BlockKey>,
) -> Result<(), TreeError> {
    if !visited.insert(key.clone()) {
        // Already seen: the traversal loops somewhere.
        return Err(TreeError::TraversalCoverage {
            visited: visited.len(),
            total: doc.blocks().len(),
        });
    }
    let block = doc
        .block_for_key(key)
        .ok_or_else(|| TreeError::MissingBlock {
            from: String::new(),
            to: key.to_string(),
        })?;
    for child in block.children() {
        visit_subtree(doc, child, visited)?;
    }
    Ok(())
}

/// [`validate_tree`] as a plain predicate.
pub fn is_valid_tree(doc: &Document) -> bool {
    validate_tree(doc).is_ok()
}
