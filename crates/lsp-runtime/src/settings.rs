//! Runtime selection settings
//!
//! Mirrors the `lsp_utils.sublime-settings` keys that drive runtime
//! resolution. Missing keys take their defaults.

use serde::{Deserialize, Serialize};
use std::path::Path;

use lsp_fs::ConfigStore;

use crate::error::Result;

/// Source identifier for the runtime found on `PATH`.
pub const SOURCE_SYSTEM: &str = "system";
/// Source identifier for the runtime managed under package storage.
pub const SOURCE_LOCAL: &str = "local";

fn default_nodejs_runtime() -> Vec<String> {
    vec![SOURCE_SYSTEM.to_string(), SOURCE_LOCAL.to_string()]
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeSettings {
    /// Runtime sources to try, in priority order.
    #[serde(default = "default_nodejs_runtime")]
    pub nodejs_runtime: Vec<String>,

    /// Install Electron (running as Node) instead of the Node.js distribution.
    #[serde(default)]
    pub local_use_electron: bool,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            nodejs_runtime: default_nodejs_runtime(),
            local_use_electron: false,
        }
    }
}

impl RuntimeSettings {
    /// Load settings from a JSON settings file; a missing file yields the
    /// defaults.
    pub fn load(path: &Path) -> Result<Self> {
        Ok(ConfigStore::new().load_or_default(path)?)
    }

    /// Whether the locally managed runtime is the first preference.
    pub fn prefers_local(&self) -> bool {
        self.nodejs_runtime.first().map(String::as_str) == Some(SOURCE_LOCAL)
    }
}
