//! UiState - selection, focus and pending notices
//!
//! Form data lives in the session; this only tracks where the cursor is.

use std::collections::VecDeque;

use crate::model::{Field, FormId, Notice};

#[derive(Debug)]
pub struct UiState {
    /// Index into the container's display order
    pub selected: usize,
    pub field: Field,
    /// Oldest first; one is dismissed per key press
    pub notices: VecDeque<Notice>,
    /// Hint shown when a command was refused
    pub hint: Option<&'static str>,
    pub show_help: bool,
    pub should_quit: bool,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            selected: 0,
            field: Field::Country,
            notices: VecDeque::new(),
            hint: None,
            show_help: false,
            should_quit: false,
        }
    }
}

impl UiState {
    /// Selected form id for the given display order
    pub fn selected_id(&self, order: &[FormId]) -> Option<FormId> {
        order.get(self.selected).copied()
    }

    pub fn select_next(&mut self, len: usize) {
        if len > 0 {
            self.selected = (self.selected + 1).min(len - 1);
        }
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn select_last(&mut self, len: usize) {
        self.selected = len.saturating_sub(1);
    }

    /// Keep the selection inside the list after a removal
    pub fn clamp(&mut self, len: usize) {
        if self.selected >= len {
            self.selected = len.saturating_sub(1);
        }
    }

    /// First index of the window of `visible` cards containing the selection
    pub fn window_start(&self, visible: usize) -> usize {
        if visible == 0 {
            return self.selected;
        }
        self.selected.saturating_sub(visible - 1)
    }

    pub fn push_notices(&mut self, notices: impl IntoIterator<Item = Notice>) {
        self.notices.extend(notices);
    }

    /// Notice shown in the footer
    pub fn current_notice(&self) -> Option<&Notice> {
        self.notices.front()
    }

    /// Clear the hint and the notice on screen (on any key)
    pub fn dismiss(&mut self) {
        self.notices.pop_front();
        self.hint = None;
    }
}
