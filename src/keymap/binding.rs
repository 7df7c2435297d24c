//! Binding sets: per-platform accelerator declarations for an action

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Label used when a binding set has no entry for the selected platform
pub const DEFAULT_LABEL: &str = "default";

/// Value that defers to the platform's own binding and shows no accelerator
pub const NATIVE_TOKEN: &str = "default";

/// One platform entry: a single accelerator or several
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeySpec {
    One(String),
    Many(Vec<String>),
}

/// How a binding set resolves for one platform label
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedKeys {
    /// The `default` token: nothing is bound, no accelerator text is shown
    Native,
    /// Accelerator strings to bind (possibly none)
    Keys(Vec<String>),
}

/// Mapping of platform label (`default`, `win`, `mac`, `emacs`, ...) to
/// accelerator strings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BindingSet {
    entries: BTreeMap<String, KeySpec>,
}

impl BindingSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// A binding set with only a `default` entry
    pub fn single(accelerator: &str) -> Self {
        Self::new().with(DEFAULT_LABEL, accelerator)
    }

    /// Add an entry (builder pattern)
    pub fn with(mut self, label: &str, accelerator: &str) -> Self {
        self.entries
            .insert(label.to_string(), KeySpec::One(accelerator.to_string()));
        self
    }

    /// Add an entry with several accelerators (builder pattern)
    pub fn with_many(mut self, label: &str, accelerators: &[&str]) -> Self {
        let keys = accelerators.iter().map(|s| s.to_string()).collect();
        self.entries.insert(label.to_string(), KeySpec::Many(keys));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Labels present in this set
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Resolve for a platform label, falling back to `default`
    pub fn resolve(&self, label: &str) -> ResolvedKeys {
        let Some(spec) = self
            .entries
            .get(label)
            .or_else(|| self.entries.get(DEFAULT_LABEL))
        else {
            return ResolvedKeys::Keys(Vec::new());
        };

        match spec {
            KeySpec::One(text) if text.trim() == NATIVE_TOKEN => ResolvedKeys::Native,
            KeySpec::One(text) => ResolvedKeys::Keys(vec![text.clone()]),
            KeySpec::Many(list) => ResolvedKeys::Keys(
                list.iter()
                    .filter(|text| text.trim() != NATIVE_TOKEN)
                    .cloned()
                    .collect(),
            ),
        }
    }
}

/// Platform label matching the running OS
pub fn current_platform_label() -> &'static str {
    if cfg!(target_os = "macos") {
        "mac"
    } else if cfg!(target_os = "windows") {
        "win"
    } else {
        DEFAULT_LABEL
    }
}
