//! Default keymap and reserved keystrokes
//!
//! The default keymap ships embedded in the binary; a user keymap at
//! `~/.config/multikey/keymap.yaml` is layered on top.

use std::path::Path;

use super::config::{load_keymap_file, parse_keymap_yaml, KeymapConfig};
use super::types::{KeyCode, Keystroke, Modifiers};

/// Default keymap YAML embedded at compile time
const DEFAULT_KEYMAP_YAML: &str = include_str!("../../keymap.yaml");

/// Punctuation reserved under every modifier combination
pub const RESERVED_PUNCTUATION: &str = "`~!@#$%^&*()-_=+[{]}\\|;:'\",<.>/?";

/// Get the embedded default keymap YAML
pub fn get_default_keymap_yaml() -> &'static str {
    DEFAULT_KEYMAP_YAML
}

/// Load and merge keymaps: embedded defaults, then the user's file
///
/// A missing or broken user file is logged and skipped.
pub fn load_default_keymap() -> KeymapConfig {
    let base = match parse_keymap_yaml(DEFAULT_KEYMAP_YAML) {
        Ok(config) => {
            tracing::info!(
                "Loaded embedded default keymap ({} bindings)",
                config.bindings.len()
            );
            config
        }
        Err(e) => {
            tracing::warn!("Failed to parse embedded keymap: {}", e);
            KeymapConfig::default()
        }
    };

    match crate::config_paths::keymap_file() {
        Some(path) => layer_user_keymap(base, &path),
        None => base,
    }
}

/// Merge the keymap at `path` over `base`, if it exists and parses
pub fn layer_user_keymap(base: KeymapConfig, path: &Path) -> KeymapConfig {
    if !path.exists() {
        return base;
    }
    match load_keymap_file(path) {
        Ok(user) => {
            tracing::info!(
                "Merging user keymap from {} ({} bindings)",
                path.display(),
                user.bindings.len()
            );
            merge_keymaps(base, user)
        }
        Err(e) => {
            tracing::warn!("Failed to load user keymap from {}: {}", path.display(), e);
            base
        }
    }
}

/// Merge user entries into base entries
///
/// - A user binding for an action (and focus) replaces every base binding
///   for that same action and focus
/// - A user cancel key replaces a base cancel key with the same text
/// - A user electric character replaces the base one for the same focus
pub fn merge_keymaps(base: KeymapConfig, user: KeymapConfig) -> KeymapConfig {
    let mut result = base;

    result.bindings.retain(|b| {
        !user
            .bindings
            .iter()
            .any(|u| u.action == b.action && u.focus == b.focus)
    });
    result.bindings.extend(user.bindings);

    result
        .cancel
        .retain(|c| !user.cancel.iter().any(|u| u.key == c.key));
    result.cancel.extend(user.cancel);

    result
        .electric
        .retain(|e| !user.electric.iter().any(|u| u.char == e.char && u.focus == e.focus));
    result.electric.extend(user.electric);

    result
}

/// Every keystroke reserved with a placeholder binding
///
/// `C-`, `M-`, `S-C-`, `S-M-` and `S-C-M-` combined with letters, digits and
/// [`RESERVED_PUNCTUATION`].
pub fn placeholder_keystrokes() -> Vec<Keystroke> {
    let cmd = Modifiers::cmd();
    let prefixes = [
        cmd,
        Modifiers::ALT,
        Modifiers::SHIFT | cmd,
        Modifiers::SHIFT | Modifiers::ALT,
        Modifiers::SHIFT | cmd | Modifiers::ALT,
    ];

    let keys = ('A'..='Z')
        .chain('0'..='9')
        .chain(RESERVED_PUNCTUATION.chars())
        .map(KeyCode::Char);

    keys.flat_map(|key| prefixes.iter().map(move |&mods| Keystroke::new(key, mods)))
        .collect()
}
