//! YAML configuration parsing for keymaps
//!
//! A keymap file names actions and says which keys run them:
//!
//! ```yaml
//! bindings:
//!   - action: save-buffer
//!     keys: { default: "C-x C-s", mac: "C-s" }
//!   - action: send-message
//!     keys: "C-c C-c"
//!     focus: chat
//! cancel:
//!   - key: "C-g"
//! electric:
//!   - char: "}"
//!     action: electric-brace
//! ```

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::binding::BindingSet;
use super::error::KeymapError;
use super::parse::parse_key_sequence;

/// Root structure of a keymap YAML file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeymapConfig {
    #[serde(default)]
    pub bindings: Vec<BindingConfig>,
    #[serde(default)]
    pub cancel: Vec<CancelConfig>,
    #[serde(default)]
    pub electric: Vec<ElectricConfig>,
}

/// A single binding entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingConfig {
    pub action: String,
    pub keys: KeysConfig,
    /// Only bind while this control has focus
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub focus: Option<String>,
}

/// Keys as written in YAML: one accelerator, a list, or per platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeysConfig {
    One(String),
    Many(Vec<String>),
    Platforms(BindingSet),
}

impl KeysConfig {
    pub fn to_binding_set(&self) -> BindingSet {
        match self {
            KeysConfig::One(text) => BindingSet::single(text),
            KeysConfig::Many(list) => {
                let keys: Vec<&str> = list.iter().map(String::as_str).collect();
                BindingSet::new().with_many(super::binding::DEFAULT_LABEL, &keys)
            }
            KeysConfig::Platforms(set) => set.clone(),
        }
    }
}

/// A cancel key, optionally running an action after cancelling
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelConfig {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
}

/// A character that runs an action instead of being inserted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectricConfig {
    pub char: char,
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub focus: Option<String>,
}

impl KeymapConfig {
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty() && self.cancel.is_empty() && self.electric.is_empty()
    }

    /// Every action name the keymap refers to
    pub fn action_names(&self) -> BTreeSet<&str> {
        self.bindings
            .iter()
            .map(|b| b.action.as_str())
            .chain(self.cancel.iter().filter_map(|c| c.action.as_deref()))
            .chain(self.electric.iter().map(|e| e.action.as_str()))
            .collect()
    }

    /// Reject accelerators that can never parse (empty strings)
    fn validate(&self) -> Result<(), KeymapError> {
        for binding in &self.bindings {
            let set = binding.keys.to_binding_set();
            for label in set.labels() {
                if let super::binding::ResolvedKeys::Keys(keys) = set.resolve(label) {
                    for text in keys {
                        parse_key_sequence(&text).map_err(|e| {
                            KeymapError::Parse(format!("{} ({}): {}", binding.action, label, e))
                        })?;
                    }
                }
            }
        }
        for cancel in &self.cancel {
            parse_key_sequence(&cancel.key)
                .map_err(|e| KeymapError::Parse(format!("cancel key: {}", e)))?;
        }
        Ok(())
    }
}

/// Load a keymap from a YAML file
pub fn load_keymap_file(path: &Path) -> Result<KeymapConfig, KeymapError> {
    let content = std::fs::read_to_string(path).map_err(|e| KeymapError::Io(e.to_string()))?;

    parse_keymap_yaml(&content)
}

/// Parse a keymap from a YAML string
pub fn parse_keymap_yaml(yaml: &str) -> Result<KeymapConfig, KeymapError> {
    let config: KeymapConfig =
        serde_yaml::from_str(yaml).map_err(|e| KeymapError::Parse(e.to_string()))?;
    config.validate()?;
    Ok(config)
}
