//! Errors raised at the keymap boundary

use thiserror::Error;

/// Errors that can occur when parsing keymaps or registering bindings
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeymapError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Empty accelerator")]
    EmptyAccelerator,
    #[error("Unknown action: {0}")]
    UnknownAction(String),
    #[error(transparent)]
    Duplicate(#[from] DuplicateBinding),
}

/// A real action collided with a different real action at the same
/// (sequence, focus target)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{sequence} ({target}) is already bound to {existing}; cannot bind {new}")]
pub struct DuplicateBinding {
    pub sequence: String,
    pub target: String,
    pub existing: String,
    pub new: String,
}
