//! Pure edit operations over documents.
//!
//! Every operation takes a document and a selection and returns a new
//! document: the input is never modified. The result carries the input
//! selection as `selection_before` and a computed `selection_after`, so a
//! history layer can restore either side of the edit.

mod expand;
mod fragment;
mod insert;
mod remove;
mod split;
mod style;

pub use fragment::{Fragment, FragmentDataPolicy};
pub use fragment::{fragment_from_selection, move_text, replace_with_fragment};
pub use insert::{insert_text, replace_text};
pub use remove::remove_range;
pub use split::split_block;
pub use style::{
    adjust_block_depth, apply_entity, apply_inline_style, merge_block_data, remove_inline_style,
    set_block_data, set_block_type,
};

use crate::document::BlockMap;
use crate::key::BlockKey;

/// Which way the user was deleting, for entity segment expansion.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum RemovalDirection {
    Backward,
    Forward,
}

/// A random key not present in `blocks`.
pub(crate) fn fresh_block_key(blocks: &BlockMap) -> BlockKey {
    loop {
        let key = BlockKey::random();
        if !blocks.contains_key(&key) {
            return key;
        }
    }
}

#[cfg(test)]
#[path = "transaction/insert_tests.rs"]
mod insert_tests;



#[cfg(test)]
#[path = "transaction/fragment_tests.rs"]
mod fragment_tests;
