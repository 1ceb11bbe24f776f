//! An immutable, versioned rich-text document engine.
//!
//! A [`Document`] is an ordered map of styled text blocks (optionally a tree
//! of nested blocks) plus an owned entity registry. The [`transaction`]
//! module turns a document, a selection and an edit intent into a new
//! document without touching the old one; [`EditorState`] stacks those
//! snapshots into undo/redo history with boundary coalescing and keeps a
//! per-block cache of decorator and style runs. The [`raw`] module reads and
//! writes the persisted interchange shape with offsets in Unicode code
//! points.
//!
//! Rendering, input handling and selection mapping are a consumer's job:
//! this crate only models documents and edits.

pub mod block;
pub mod blocktree;
pub mod document;
pub mod editor_state;
pub mod entity;
pub mod key;
pub mod metadata;
pub mod raw;
pub mod scan;
pub mod selection;
pub mod style;
pub mod transaction;
pub mod tree;

/// String-keyed JSON payload attached to blocks and entities.
pub type DataMap = serde_json::Map<String, serde_json::Value>;

pub use block::{BlockType, CharList, ContentBlock, TreeLinks};
pub use blocktree::{BlockTree, Decorator, DecoratorRange, LeafRange};
pub use document::{BlockMap, Document};
pub use editor_state::{ChangeType, EditorState};
pub use entity::{Entity, EntityMap, Mutability};
pub use key::{BlockKey, EntityKey};
pub use metadata::CharacterMetadata;
pub use raw::{RawBlock, RawDocument, RawEntity, RawError};
pub use selection::SelectionState;
pub use style::StyleSet;
pub use transaction::{Fragment, FragmentDataPolicy, RemovalDirection};
pub use tree::{SiblingSide, TreeError};
