use crate::key::BlockKey;

/// Anchor/focus position pair defining a possibly collapsed, possibly
/// backward text range.
///
/// The anchor is where a selection gesture started, the focus where it
/// currently ends; `is_backward` records that the focus precedes the anchor
/// in document order. "Start" and "end" are derived from `is_backward`, not
/// from the document.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct SelectionState {
    anchor_key: BlockKey,
    anchor_offset: usize,
    focus_key: BlockKey,
    focus_offset: usize,
    is_backward: bool,
    has_focus: bool,
}

impl SelectionState {
    pub fn new(
        anchor_key: BlockKey,
        anchor_offset: usize,
        focus_key: BlockKey,
        focus_offset: usize,
        is_backward: bool,
    ) -> Self {
        Self {
            anchor_key,
            anchor_offset,
            focus_key,
            focus_offset,
            is_backward,
            has_focus: false,
        }
    }

    /// A collapsed caret at the given position.
    pub fn collapsed(key: BlockKey, offset: usize) -> Self {
        Self {
            anchor_key: key.clone(),
            anchor_offset: offset,
            focus_key: key,
            focus_offset: offset,
            is_backward: false,
            has_focus: false,
        }
    }

    pub fn anchor_key(&self) -> &BlockKey {
        &self.anchor_key
    }

    pub fn anchor_offset(&self) -> usize {
        self.anchor_offset
    }

    pub fn focus_key(&self) -> &BlockKey {
        &self.focus_key
    }

    pub fn focus_offset(&self) -> usize {
        self.focus_offset
    }

    pub fn is_backward(&self) -> bool {
        self.is_backward
    }

    pub fn has_focus(&self) -> bool {
        self.has_focus
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor_key == self.focus_key && self.anchor_offset == self.focus_offset
    }

    pub fn start_key(&self) -> &BlockKey {
        if self.is_backward {
            &self.focus_key
        } else {
            &self.anchor_key
        }
    }

    pub fn start_offset(&self) -> usize {
        if self.is_backward {
            self.focus_offset
        } else {
            self.anchor_offset
        }
    }

    pub fn end_key(&self) -> &BlockKey {
        if self.is_backward {
            &self.anchor_key
        } else {
            &self.focus_key
        }
    }

    pub fn end_offset(&self) -> usize {
        if self.is_backward {
            self.anchor_offset
        } else {
            self.focus_offset
        }
    }

    pub fn with_has_focus(mut self, has_focus: bool) -> Self {
        self.has_focus = has_focus;
        self
    }

    /// The same range with anchor at the start and focus at the end.
    pub fn normalized(&self) -> Self {
        if !self.is_backward {
            return self.clone();
        }
        Self {
            anchor_key: self.focus_key.clone(),
            anchor_offset: self.focus_offset,
            focus_key: self.anchor_key.clone(),
            focus_offset: self.anchor_offset,
            is_backward: false,
            has_focus: self.has_focus,
        }
    }

    pub fn collapse_to_start(&self) -> Self {
        Self::collapsed(self.start_key().clone(), self.start_offset()).with_has_focus(self.has_focus)
    }

    pub fn collapse_to_end(&self) -> Self {
        Self::collapsed(self.end_key().clone(), self.end_offset()).with_has_focus(self.has_focus)
    }
}
