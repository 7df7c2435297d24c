//! Requests actions make of the dispatcher, and the built-in actions that
//! use them

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use crate::keymap::{BindingSet, KeySequence, Keystroke};

use super::action::Action;
use super::event::KeyEvent;

/// Callback receiving the next raw keystroke
pub type KeystrokeCallback = Box<dyn FnOnce(Keystroke)>;

/// Callback receiving the next matched action instead of running it
pub type DescribeCallback = Box<dyn FnOnce(&dyn Action, &KeySequence)>;

pub(crate) enum DispatchRequest {
    QuotedInsert(u32),
    CaptureKeystroke(KeystrokeCallback),
    DescribeNext(DescribeCallback),
    Status(String),
}

/// Cloneable channel from actions back to their dispatcher
///
/// An action runs while the dispatcher is mid-event, so requests are queued
/// and applied once the action returns.
#[derive(Clone, Default)]
pub struct DispatchHandle {
    queue: Rc<RefCell<VecDeque<DispatchRequest>>>,
}

impl DispatchHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Send the next keystroke to the default key action verbatim
    pub fn quoted_insert(&self, multiplier: u32) {
        self.push(DispatchRequest::QuotedInsert(multiplier));
    }

    /// Hand the next keystroke to `callback` without matching it
    pub fn capture_next_keystroke(&self, callback: impl FnOnce(Keystroke) + 'static) {
        self.push(DispatchRequest::CaptureKeystroke(Box::new(callback)));
    }

    /// Report the next matched action to `callback` instead of running it
    pub fn describe_next(&self, callback: impl FnOnce(&dyn Action, &KeySequence) + 'static) {
        self.push(DispatchRequest::DescribeNext(Box::new(callback)));
    }

    pub fn show_status(&self, text: impl Into<String>) {
        self.push(DispatchRequest::Status(text.into()));
    }

    pub fn has_pending(&self) -> bool {
        !self.queue.borrow().is_empty()
    }

    fn push(&self, request: DispatchRequest) {
        self.queue.borrow_mut().push_back(request);
    }

    pub(crate) fn drain(&self) -> Vec<DispatchRequest> {
        self.queue.borrow_mut().drain(..).collect()
    }
}

impl fmt::Debug for DispatchHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchHandle")
            .field("pending", &self.queue.borrow().len())
            .finish()
    }
}

/// `quoted-insert`: the next keystroke is inserted as a character
#[derive(Debug, Clone)]
pub struct QuotedInsert {
    handle: DispatchHandle,
}

impl QuotedInsert {
    pub const NAME: &'static str = "quoted-insert";

    pub fn new(handle: DispatchHandle) -> Self {
        Self { handle }
    }
}

impl Action for QuotedInsert {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn key_bindings(&self) -> BindingSet {
        BindingSet::single("C-q").with("mac", "^q")
    }

    fn invoke_from_key(&self, _event: &KeyEvent, multiplier: u32) -> anyhow::Result<()> {
        self.handle.quoted_insert(multiplier);
        self.handle.show_status("C-q-");
        Ok(())
    }

    fn is_recordable(&self) -> bool {
        false
    }
}

/// `describe-key`: name the action the next key sequence would run
#[derive(Debug, Clone)]
pub struct DescribeKey {
    handle: DispatchHandle,
}

impl DescribeKey {
    pub const NAME: &'static str = "describe-key";

    pub fn new(handle: DispatchHandle) -> Self {
        Self { handle }
    }
}

impl Action for DescribeKey {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn key_bindings(&self) -> BindingSet {
        BindingSet::single("C-h k")
    }

    fn invoke_from_key(&self, _event: &KeyEvent, _multiplier: u32) -> anyhow::Result<()> {
        let reply = self.handle.clone();
        self.handle.describe_next(move |action, keys| {
            reply.show_status(format!("{} runs the command {}", keys, action.name()));
        });
        self.handle.show_status("Describe key:");
        Ok(())
    }

    fn is_recordable(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requests_queue_in_order() {
        let handle = DispatchHandle::new();
        let clone = handle.clone();
        clone.quoted_insert(3);
        clone.show_status("hello");
        assert!(handle.has_pending());

        let drained = handle.drain();
        assert_eq!(drained.len(), 2);
        assert!(matches!(drained[0], DispatchRequest::QuotedInsert(3)));
        assert!(matches!(&drained[1], DispatchRequest::Status(text) if text == "hello"));
        assert!(!handle.has_pending());
    }

    #[test]
    fn test_quoted_insert_action_requests_quoting() {
        let handle = DispatchHandle::new();
        let action = QuotedInsert::new(handle.clone());
        action
            .invoke_from_key(&KeyEvent::typed('q'), 2)
            .unwrap();
        assert!(matches!(handle.drain()[0], DispatchRequest::QuotedInsert(2)));
        assert!(!action.is_recordable());
    }
}
