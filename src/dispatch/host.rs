//! Host environment contracts: status text and focus
//!
//! The dispatcher never paints and never asks a toolkit for anything. It
//! emits status text and asks who has focus, nothing more.

use std::cell::RefCell;
use std::rc::Rc;

use crate::keymap::FocusId;

/// Where partial accelerators and dispatch messages are shown
pub trait StatusDisplay {
    fn set_status_text(&self, text: &str, column: usize);
}

/// Identity of the currently focused control
pub trait FocusProvider {
    fn current_focus(&self) -> Option<FocusId>;
}

/// Status display that discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoStatus;

impl StatusDisplay for NoStatus {
    fn set_status_text(&self, _text: &str, _column: usize) {}
}

/// Shared status line that remembers its current text and every update
#[derive(Debug, Default, Clone)]
pub struct StatusLine {
    inner: Rc<RefCell<StatusLog>>,
}

#[derive(Debug, Default)]
struct StatusLog {
    text: String,
    history: Vec<String>,
}

impl StatusLine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Text currently shown
    pub fn text(&self) -> String {
        self.inner.borrow().text.clone()
    }

    /// Every update, oldest first
    pub fn history(&self) -> Vec<String> {
        self.inner.borrow().history.clone()
    }
}

impl StatusDisplay for StatusLine {
    fn set_status_text(&self, text: &str, _column: usize) {
        let mut log = self.inner.borrow_mut();
        log.text = text.to_string();
        log.history.push(text.to_string());
    }
}

/// Focus provider for hosts without focusable controls
#[derive(Debug, Default, Clone, Copy)]
pub struct NoFocus;

impl FocusProvider for NoFocus {
    fn current_focus(&self) -> Option<FocusId> {
        None
    }
}

/// Focus slot the host updates as focus moves
#[derive(Debug, Default, Clone)]
pub struct SharedFocus {
    current: Rc<RefCell<Option<FocusId>>>,
}

impl SharedFocus {
    pub fn new(initial: Option<FocusId>) -> Self {
        Self {
            current: Rc::new(RefCell::new(initial)),
        }
    }

    pub fn set(&self, focus: impl Into<FocusId>) {
        *self.current.borrow_mut() = Some(focus.into());
    }

    pub fn clear(&self) {
        *self.current.borrow_mut() = None;
    }
}

impl FocusProvider for SharedFocus {
    fn current_focus(&self) -> Option<FocusId> {
        self.current.borrow().clone()
    }
}
