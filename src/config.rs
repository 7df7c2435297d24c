//! Dispatcher configuration persistence
//!
//! Stores dispatcher settings in `~/.config/multikey/config.yaml`

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::keymap::current_platform_label;

/// Dispatcher settings; every field has a default
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Binding-set label used to resolve per-platform accelerators
    /// (e.g., "mac", "win", "gtk"; "default" when nothing more specific)
    #[serde(default = "default_platform")]
    pub platform: String,

    /// Column hint passed along with every status text
    #[serde(default)]
    pub status_column: usize,

    /// Accelerator for the universal argument; `null` disables it
    #[serde(default = "default_universal_argument")]
    pub universal_argument: Option<String>,

    /// Keys that abort a prefix in progress
    #[serde(default = "default_cancel_keys")]
    pub cancel_keys: Vec<String>,

    /// Reserve common modifier combinations with placeholders
    #[serde(default = "default_preallocate")]
    pub preallocate: bool,
}

fn default_platform() -> String {
    current_platform_label().to_string()
}

fn default_universal_argument() -> Option<String> {
    Some("C-u".to_string())
}

fn default_cancel_keys() -> Vec<String> {
    vec!["C-g".to_string()]
}

fn default_preallocate() -> bool {
    true
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            platform: default_platform(),
            status_column: 0,
            universal_argument: default_universal_argument(),
            cancel_keys: default_cancel_keys(),
            preallocate: default_preallocate(),
        }
    }
}

impl DispatchConfig {
    /// Load config from disk, or return defaults if not found
    pub fn load() -> Self {
        let Some(path) = crate::config_paths::config_file() else {
            tracing::debug!("No config directory available, using defaults");
            return Self::default();
        };
        Self::load_from(&path)
    }

    /// Load config from a specific file; never fails
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            tracing::debug!(
                "Config file not found at {}, using defaults",
                path.display()
            );
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => match Self::from_yaml(&content) {
                Ok(config) => {
                    tracing::info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse config at {}: {}", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to read config at {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// Save config to disk
    ///
    /// Creates the config directory if it doesn't exist.
    pub fn save(&self) -> Result<(), String> {
        let path = crate::config_paths::config_file()
            .ok_or_else(|| "No config directory available".to_string())?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create config directory: {}", e))?;
        }

        let content = serde_yaml::to_string(self)
            .map_err(|e| format!("Failed to serialize config: {}", e))?;

        std::fs::write(path, content)
            .map_err(|e| format!("Failed to write config to {}: {}", path.display(), e))?;

        tracing::info!("Saved config to {}", path.display());
        Ok(())
    }
}
