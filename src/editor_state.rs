use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::debug;

use crate::blocktree::{BlockTree, Decorator};
use crate::document::Document;
use crate::key::BlockKey;
use crate::selection::SelectionState;
use crate::style::StyleSet;

/// What kind of edit produced a document, for undo coalescing.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ChangeType {
    InsertCharacters,
    BackspaceCharacter,
    DeleteCharacter,
    RemoveRange,
    InsertFragment,
    SplitBlock,
    ChangeBlockType,
    ChangeBlockData,
    AdjustDepth,
    ChangeInlineStyle,
    ApplyEntity,
    MoveBlock,
    Undo,
    Redo,
}

impl ChangeType {
    /// Runs of the same plain typing or deleting kind coalesce into one undo
    /// boundary.
    fn coalesces(self) -> bool {
        matches!(
            self,
            ChangeType::InsertCharacters
                | ChangeType::BackspaceCharacter
                | ChangeType::DeleteCharacter
        )
    }

    /// Change types that keep a pending inline style override alive.
    fn preserves_style_override(self) -> bool {
        matches!(
            self,
            ChangeType::AdjustDepth | ChangeType::ChangeBlockType | ChangeType::SplitBlock
        )
    }
}

/// One immutable editor snapshot: the current document, the selection, the
/// undo and redo stacks, and the derived block-tree cache.
///
/// Every transition (`push`, `undo`, `redo`, selection updates) returns a
/// new value. The block-tree cache is carried forward entry by entry; only
/// blocks that changed are regenerated.
#[derive(Clone)]
pub struct EditorState {
    content: Document,
    selection: SelectionState,
    undo_stack: Vec<Document>,
    redo_stack: Vec<Document>,
    decorator: Option<Arc<dyn Decorator>>,
    block_tree: IndexMap<BlockKey, BlockTree>,
    last_change_type: Option<ChangeType>,
    inline_style_override: Option<StyleSet>,
    force_selection: bool,
    in_composition_mode: bool,
    allow_undo: bool,
}

/// A partial update applied by [`EditorState::set`]-style transitions.
#[derive(Default)]
struct Update {
    content: Option<Document>,
    selection: Option<SelectionState>,
    undo_stack: Option<Vec<Document>>,
    redo_stack: Option<Vec<Document>>,
    decorator: Option<Option<Arc<dyn Decorator>>>,
    last_change_type: Option<Option<ChangeType>>,
    inline_style_override: Option<Option<StyleSet>>,
    force_selection: Option<bool>,
    in_composition_mode: Option<bool>,
    allow_undo: Option<bool>,
}

impl EditorState {
    /// A fresh state over `content`, caret at the start of the first block.
    pub fn new(content: Document) -> Self {
        Self::with_decorator(content, None)
    }

    pub fn with_decorator(content: Document, decorator: Option<Arc<dyn Decorator>>) -> Self {
        let selection = SelectionState::collapsed(content.first_block().key().clone(), 0);
        let block_tree = generate_all(&content, decorator.as_deref());
        Self {
            content,
            selection,
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            decorator,
            block_tree,
            last_change_type: None,
            inline_style_override: None,
            force_selection: false,
            in_composition_mode: false,
            allow_undo: true,
        }
    }

    pub fn content(&self) -> &Document {
        &self.content
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    pub fn block_tree(&self, key: &BlockKey) -> Option<&BlockTree> {
        self.block_tree.get(key)
    }

    pub fn decorator(&self) -> Option<&Arc<dyn Decorator>> {
        self.decorator.as_ref()
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn last_change_type(&self) -> Option<ChangeType> {
        self.last_change_type
    }

    pub fn inline_style_override(&self) -> Option<&StyleSet> {
        self.inline_style_override.as_ref()
    }

    pub fn is_selection_forced(&self) -> bool {
        self.force_selection
    }

    pub fn is_in_composition_mode(&self) -> bool {
        self.in_composition_mode
    }

    pub fn allows_undo(&self) -> bool {
        self.allow_undo
    }

    /// Disabling undo makes `push` swap content without growing the stacks.
    pub fn set_allow_undo(&self, allow_undo: bool) -> Self {
        self.set(Update {
            allow_undo: Some(allow_undo),
            ..Update::default()
        })
    }

    pub fn set_in_composition_mode(&self, in_composition_mode: bool) -> Self {
        self.set(Update {
            in_composition_mode: Some(in_composition_mode),
            ..Update::default()
        })
    }

    /// Swaps the decorator and regenerates the affected cache entries.
    pub fn set_decorator(&self, decorator: Option<Arc<dyn Decorator>>) -> Self {
        self.set(Update {
            decorator: Some(decorator),
            ..Update::default()
        })
    }

    /// A style override applies to the next inserted characters instead of
    /// the style at the caret.
    pub fn set_inline_style_override(&self, style: Option<StyleSet>) -> Self {
        self.set(Update {
            inline_style_override: Some(style),
            ..Update::default()
        })
    }

    /// Adopts a selection reported by the presentation layer.
    pub fn acknowledge_selection(&self, selection: SelectionState) -> Self {
        self.update_selection(selection, false)
    }

    /// Moves the selection and tells the presentation layer to render it.
    pub fn force_selection(&self, selection: SelectionState) -> Self {
        self.update_selection(selection, true)
    }

    fn update_selection(&self, selection: SelectionState, force: bool) -> Self {
        self.set(Update {
            selection: Some(selection.with_has_focus(true)),
            force_selection: Some(force),
            inline_style_override: Some(None),
            ..Update::default()
        })
    }

    /// The style new characters would take: the override if one is pending,
    /// otherwise the style at the selection start.
    pub fn current_inline_style(&self) -> StyleSet {
        if let Some(style) = &self.inline_style_override {
            return style.clone();
        }
        let content = &self.content;
        let selection = &self.selection;
        let block = content.expect_block(selection.start_key());
        let offset = selection.start_offset();

        if selection.is_collapsed() {
            if offset > 0 {
                return block.style_at(offset - 1);
            }
            if block.len() > 0 {
                return block.style_at(0);
            }
            return look_upward_for_style(content, selection.start_key());
        }
        if offset < block.len() {
            return block.style_at(offset);
        }
        look_upward_for_style(content, selection.start_key())
    }

    /// Installs a new document produced by an edit operation.
    ///
    /// Identical content is a no-op. With undo enabled, the previous
    /// document is pushed onto the undo stack when the edit is a boundary:
    /// always, except that runs of the same plain typing/deleting change
    /// type coalesce into the previous entry. Pushing clears the redo stack.
    pub fn push(
        &self,
        new_content: Document,
        change_type: ChangeType,
        force_selection: bool,
    ) -> Self {
        if new_content == self.content {
            return self.clone();
        }

        let style_override = if change_type.preserves_style_override() {
            self.inline_style_override.clone()
        } else {
            None
        };

        if !self.allow_undo {
            let selection = new_content.selection_after().clone();
            return self.set(Update {
                content: Some(new_content),
                selection: Some(selection),
                last_change_type: Some(Some(change_type)),
                inline_style_override: Some(style_override),
                force_selection: Some(force_selection),
                ..Update::default()
            });
        }

        let selection = self.selection.clone();
        let current = self.content.clone();
        let selection_moved = selection != *current.selection_after();
        let must_become_boundary =
            !(change_type.coalesces() && self.last_change_type == Some(change_type));

        let mut undo_stack = self.undo_stack.clone();
        let mut redo_stack = self.redo_stack.clone();
        let new_content = if selection_moved || must_become_boundary {
            debug!(?change_type, depth = undo_stack.len() + 1, "undo boundary");
            undo_stack.push(current.clone());
            redo_stack.clear();
            new_content.with_selection_before(selection)
        } else {
            // Coalesced: the new document inherits the start of the run.
            new_content.with_selection_before(current.selection_before().clone())
        };

        let selection = new_content.selection_after().clone();
        self.set(Update {
            content: Some(new_content),
            selection: Some(selection),
            undo_stack: Some(undo_stack),
            redo_stack: Some(redo_stack),
            last_change_type: Some(Some(change_type)),
            inline_style_override: Some(style_override),
            force_selection: Some(force_selection),
            ..Update::default()
        })
    }

    /// Restores the top of the undo stack, moving the current document to
    /// the redo stack. The caret returns to where it was before the undone
    /// edit. A no-op when the stack is empty or undo is disabled.
    pub fn undo(&self) -> Self {
        if !self.allow_undo {
            return self.clone();
        }
        let mut undo_stack = self.undo_stack.clone();
        let Some(new_content) = undo_stack.pop() else {
            return self.clone();
        };
        debug!(depth = undo_stack.len(), "undo");
        let current = self.content.clone();
        let selection = current.selection_before().clone();
        let mut redo_stack = self.redo_stack.clone();
        redo_stack.push(current);
        self.set(Update {
            content: Some(new_content),
            selection: Some(selection),
            undo_stack: Some(undo_stack),
            redo_stack: Some(redo_stack),
            last_change_type: Some(Some(ChangeType::Undo)),
            inline_style_override: Some(None),
            force_selection: Some(true),
            ..Update::default()
        })
    }

    /// The inverse of [`undo`], restoring the top of the redo stack and the
    /// selection after the redone edit.
    ///
    /// [`undo`]: EditorState::undo
    pub fn redo(&self) -> Self {
        if !self.allow_undo {
            return self.clone();
        }
        let mut redo_stack = self.redo_stack.clone();
        let Some(new_content) = redo_stack.pop() else {
            return self.clone();
        };
        debug!(depth = redo_stack.len(), "redo");
        let mut undo_stack = self.undo_stack.clone();
        undo_stack.push(self.content.clone());
        let selection = new_content.selection_after().clone();
        self.set(Update {
            content: Some(new_content),
            selection: Some(selection),
            undo_stack: Some(undo_stack),
            redo_stack: Some(redo_stack),
            last_change_type: Some(Some(ChangeType::Redo)),
            inline_style_override: Some(None),
            force_selection: Some(true),
            ..Update::default()
        })
    }

    /// Applies a partial update, regenerating block-tree cache entries only
    /// when the content or the decorator changed.
    fn set(&self, update: Update) -> Self {
        let decorator_changed = update.decorator.is_some();
        let decorator = match update.decorator {
            Some(decorator) => decorator,
            None => self.decorator.clone(),
        };
        let content_changed = update.content.is_some();
        let content = update.content.unwrap_or_else(|| self.content.clone());

        let block_tree = if decorator_changed {
            generate_all(&content, decorator.as_deref())
        } else if content_changed {
            merge_block_tree(&self.block_tree, &self.content, &content, decorator.as_deref())
        } else {
            self.block_tree.clone()
        };

        Self {
            content,
            selection: update.selection.unwrap_or_else(|| self.selection.clone()),
            undo_stack: update.undo_stack.unwrap_or_else(|| self.undo_stack.clone()),
            redo_stack: update.redo_stack.unwrap_or_else(|| self.redo_stack.clone()),
            decorator,
            block_tree,
            last_change_type: update.last_change_type.unwrap_or(self.last_change_type),
            inline_style_override: update
                .inline_style_override
                .unwrap_or_else(|| self.inline_style_override.clone()),
            force_selection: update.force_selection.unwrap_or(self.force_selection),
            in_composition_mode: update
                .in_composition_mode
                .unwrap_or(self.in_composition_mode),
            allow_undo: update.allow_undo.unwrap_or(self.allow_undo),
        }
    }
}

impl fmt::Debug for EditorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EditorState")
            .field("blocks", &self.content.blocks().len())
            .field("selection", &self.selection)
            .field("undo_depth", &self.undo_stack.len())
            .field("redo_depth", &self.redo_stack.len())
            .field("last_change_type", &self.last_change_type)
            .finish_non_exhaustive()
    }
}

/// Walks backward through preceding blocks for the nearest text and returns
/// the style of its last character.
fn look_upward_for_style(content: &Document, from: &BlockKey) -> StyleSet {
    let mut key = content.key_before(from);
    while let Some(current) = key {
        let block = content.expect_block(current);
        if block.len() > 0 {
            return block.style_at(block.len() - 1);
        }
        key = content.key_before(current);
    }
    StyleSet::empty()
}

fn generate_all(
    content: &Document,
    decorator: Option<&dyn Decorator>,
) -> IndexMap<BlockKey, BlockTree> {
    content
        .blocks()
        .iter()
        .map(|(key, block)| (key.clone(), BlockTree::generate(block, decorator, content)))
        .collect()
}

/// Carries cache entries forward from the previous document, regenerating
/// only blocks that differ at the same key. O(changed blocks) regeneration.
fn merge_block_tree(
    previous: &IndexMap<BlockKey, BlockTree>,
    previous_content: &Document,
    content: &Document,
    decorator: Option<&dyn Decorator>,
) -> IndexMap<BlockKey, BlockTree> {
    content
        .blocks()
        .iter()
        .map(|(key, block)| {
            let reusable = previous_content
                .block_for_key(key)
                .is_some_and(|previous_block| previous_block == block);
            let tree = match (reusable, previous.get(key)) {
                (true, Some(entry)) => entry.clone(),
                _ => BlockTree::generate(block, decorator, content),
            };
            (key.clone(), tree)
        })
        .collect()
}

#[cfg(test)]
#[path = "editor_state_tests.rs"]
mod editor_state_tests;
