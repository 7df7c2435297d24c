//! multikey - Emacs-style multi-keystroke action dispatch
//!
//! This crate turns raw key events, menu selections and toolbar clicks into
//! action invocations. It supports multi-keystroke accelerators such as
//! `C-x C-s`, numeric prefix arguments, sticky meta, quoted insert and
//! per-control bindings, and keeps a toolkit's menus in sync with the
//! bindings.

pub mod cli;
pub mod config;
pub mod config_paths;
pub mod dispatch;
pub mod keymap;
pub mod tracing;

// Re-export commonly used types
pub use config::DispatchConfig;
pub use dispatch::{
    AcceleratorManager, Action, ActionRecorder, DispatchHandle, FocusProvider, KeyEvent,
    KeyOutcome, MacroRecorder, MenuId, StatusDisplay,
};
pub use keymap::{
    parse_key_sequence, ActionId, FocusId, KeyCode, KeySequence, KeymapConfig, KeymapError,
    Keystroke, Modifiers,
};
