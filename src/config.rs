//! Engine configuration

use crate::error::{Result, SearchError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Tunables for the search engine.
///
/// Every field has a default, so a config file only needs the keys it
/// changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// ripgrep binary name or path
    pub rg_binary: String,
    pub timeout_ms: u64,
    /// Context requests above this are clamped
    pub max_context: u32,
    /// Passed to ripgrep as `--max-count`
    pub max_count_per_file: u64,
    /// Lines longer than this many characters are folded
    pub fold_width: usize,
    pub truncation_marker: String,
    /// Search paths equal to or under these prefixes are refused
    pub blocked_prefixes: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            rg_binary: "rg".to_string(),
            timeout_ms: 30_000,
            max_context: 50,
            max_count_per_file: 10_000,
            fold_width: 1000,
            truncation_marker: "...".to_string(),
            blocked_prefixes: ["/etc", "/proc", "/sys", "/dev", "/boot", "/sbin"]
                .iter()
                .map(|p| p.to_string())
                .collect(),
        }
    }
}

impl EngineConfig {
    /// Load a JSON config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            SearchError::invalid_request("config", format!("{}: {}", path.display(), e))
        })
    }

    pub fn with_rg_binary(mut self, binary: impl Into<String>) -> Self {
        self.rg_binary = binary.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}
