//! Keystrokes, accelerator strings and binding storage
//!
//! This module provides the data side of the dispatch engine:
//! - Keystroke values with platform-aware modifier handling (Cmd on macOS,
//!   Ctrl elsewhere)
//! - Parsing and formatting of Emacs-style and native accelerator text
//! - The key sequence trie and its per-focus action maps
//! - YAML keymap files layered over an embedded default
//!
//! # Architecture
//!
//! ```text
//! "C-x C-s" → parse_key_sequence() → KeySequence → KeySequenceTrie → ActionMap → ActionId
//! ```
//!
//! # Loading Keymaps
//!
//! ```ignore
//! // Embedded defaults merged with ~/.config/multikey/keymap.yaml
//! let keymap = load_default_keymap();
//!
//! // Or a specific file
//! let keymap = load_keymap_file(Path::new("keymap.yaml"))?;
//! manager.apply_keymap(&keymap)?;
//! ```

mod action_map;
pub(crate) mod binding;
mod config;
mod defaults;
mod error;
mod parse;
mod trie;
mod types;

pub use action_map::{ActionId, ActionMap, FocusId, Slot};
pub use binding::{
    current_platform_label, BindingSet, KeySpec, ResolvedKeys, DEFAULT_LABEL, NATIVE_TOKEN,
};
pub use config::{
    load_keymap_file, parse_keymap_yaml, BindingConfig, CancelConfig, ElectricConfig,
    KeymapConfig, KeysConfig,
};
pub use defaults::{
    get_default_keymap_yaml, layer_user_keymap, load_default_keymap, merge_keymaps,
    placeholder_keystrokes, RESERVED_PUNCTUATION,
};
pub use error::{DuplicateBinding, KeymapError};
pub use parse::{join_emacs, parse_key_sequence, parse_keystroke, KeySequence};
pub use trie::{KeySequenceTrie, NodeId};
pub use types::{KeyCode, Keystroke, Modifiers};
