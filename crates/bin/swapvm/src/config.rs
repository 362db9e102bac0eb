//! TOML configuration for the CLI
//!
//! ```toml
//! timestamp = 1700000000
//!
//! [limits]
//! max_steps = 4096
//! max_depth = 256
//! ```

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use swapvm::Limits;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CliConfig {
    pub limits: Limits,
    /// Ledger clock; wall clock when unset
    pub timestamp: Option<u64>,
}

impl CliConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        toml::from_str(&contents).with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Command line values win over the file
    pub fn with_overrides(mut self, max_steps: Option<usize>, max_depth: Option<usize>, timestamp: Option<u64>) -> Self {
        if let Some(max_steps) = max_steps {
            self.limits.max_steps = max_steps;
        }
        if let Some(max_depth) = max_depth {
            self.limits.max_depth = max_depth;
        }
        if timestamp.is_some() {
            self.timestamp = timestamp;
        }
        self
    }
}
