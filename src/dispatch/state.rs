//! Per-frame dispatch state threaded through every key event

use std::fmt;

use crate::keymap::{Keystroke, NodeId};

use super::control::{DescribeCallback, KeystrokeCallback};

/// Where the dispatcher is between keystrokes
///
/// Returns to its initial value after every completed dispatch, every
/// undefined sequence and every cancel.
pub struct DispatchState {
    pub(crate) current_node: NodeId,
    pub(crate) pending_keystrokes: Vec<Keystroke>,
    pub(crate) prefix_count: usize,
    pub(crate) repeat_value: u32,
    pub(crate) repeat_initialized: bool,
    pub(crate) meta_next: bool,
    pub(crate) processing_esc_digit: bool,
    /// The next digit replaces the repeat value (set by the universal argument)
    pub(crate) universal_replace: bool,
    pub(crate) quoted_next: Option<u32>,
    pub(crate) quoted_raw_callback: Option<KeystrokeCallback>,
    pub(crate) report_next: Option<DescribeCallback>,
}

impl Default for DispatchState {
    fn default() -> Self {
        Self {
            current_node: NodeId::ROOT,
            pending_keystrokes: Vec::new(),
            prefix_count: 0,
            repeat_value: 1,
            repeat_initialized: false,
            meta_next: false,
            processing_esc_digit: false,
            universal_replace: false,
            quoted_next: None,
            quoted_raw_callback: None,
            report_next: None,
        }
    }
}

impl DispatchState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// True when nothing is in flight
    pub fn is_initial(&self) -> bool {
        self.current_node == NodeId::ROOT
            && self.pending_keystrokes.is_empty()
            && self.prefix_count == 0
            && self.repeat_value == 1
            && !self.repeat_initialized
            && !self.meta_next
            && !self.processing_esc_digit
            && !self.universal_replace
            && self.quoted_next.is_none()
            && self.quoted_raw_callback.is_none()
            && self.report_next.is_none()
    }

    pub fn current_node(&self) -> NodeId {
        self.current_node
    }

    pub fn pending_keystrokes(&self) -> &[Keystroke] {
        &self.pending_keystrokes
    }

    /// Keystrokes after the numeric prefix
    pub fn command_keystrokes(&self) -> &[Keystroke] {
        &self.pending_keystrokes[self.prefix_count.min(self.pending_keystrokes.len())..]
    }

    pub fn prefix_count(&self) -> usize {
        self.prefix_count
    }

    pub fn repeat_value(&self) -> u32 {
        self.repeat_value
    }

    pub fn repeat_initialized(&self) -> bool {
        self.repeat_initialized
    }

    pub fn meta_next(&self) -> bool {
        self.meta_next
    }

    pub fn processing_esc_digit(&self) -> bool {
        self.processing_esc_digit
    }

    pub fn quoted_next(&self) -> Option<u32> {
        self.quoted_next
    }

    pub fn has_raw_callback(&self) -> bool {
        self.quoted_raw_callback.is_some()
    }

    pub fn has_report_next(&self) -> bool {
        self.report_next.is_some()
    }

    /// Multiplier handed to actions; an explicit 0 counts as 1
    pub fn multiplier(&self) -> u32 {
        self.repeat_value.max(1)
    }

    /// Fold one decimal digit into the repeat value
    pub(crate) fn accumulate(&mut self, digit: u32) {
        if !self.repeat_initialized || self.universal_replace {
            self.repeat_value = digit;
        } else {
            self.repeat_value = self.repeat_value.saturating_mul(10).saturating_add(digit);
        }
        self.repeat_initialized = true;
        self.universal_replace = false;
    }

    /// Universal argument: 4, then times four for each further press
    pub(crate) fn universal(&mut self) {
        self.repeat_value = if self.repeat_initialized {
            self.repeat_value.saturating_mul(4)
        } else {
            4
        };
        self.repeat_initialized = true;
        self.universal_replace = true;
    }

    /// Record a keystroke consumed by the numeric prefix
    pub(crate) fn push_prefix(&mut self, stroke: Keystroke) {
        self.pending_keystrokes.push(stroke);
        self.prefix_count += 1;
    }
}

impl fmt::Debug for DispatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchState")
            .field("current_node", &self.current_node)
            .field("pending_keystrokes", &self.pending_keystrokes)
            .field("prefix_count", &self.prefix_count)
            .field("repeat_value", &self.repeat_value)
            .field("repeat_initialized", &self.repeat_initialized)
            .field("meta_next", &self.meta_next)
            .field("processing_esc_digit", &self.processing_esc_digit)
            .field("quoted_next", &self.quoted_next)
            .field("quoted_raw_callback", &self.quoted_raw_callback.is_some())
            .field("report_next", &self.report_next.is_some())
            .finish()
    }
}
