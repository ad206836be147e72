//! Engine configuration.
//!
//! Every field has a default, so an empty TOML document (or no file at all)
//! yields a working configuration:
//!
//! ```toml
//! max_occurrences = 730
//! max_steps = 100000
//! uid_domain = "almanac"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::expander::{ExpandOptions, DEFAULT_MAX_OCCURRENCES, DEFAULT_MAX_STEPS};

/// Tunables shared by the manager, the store's expansion helpers, and the adapters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Cap on occurrences emitted by a single expansion.
    pub max_occurrences: usize,
    /// Hard ceiling on candidate steps walked by a single expansion.
    pub max_steps: usize,
    /// Suffix placed after `@` in generated uids.
    pub uid_domain: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_occurrences: DEFAULT_MAX_OCCURRENCES,
            max_steps: DEFAULT_MAX_STEPS,
            uid_domain: "almanac".to_string(),
        }
    }
}

impl EngineConfig {
    /// Parse configuration from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: EngineConfig =
            toml::from_str(content).map_err(|e| EngineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("{}: {}", path.display(), e)))?;
        tracing::debug!(path = %path.display(), "loading engine config");
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_occurrences == 0 {
            return Err(EngineError::Config(
                "max_occurrences must be at least 1".to_string(),
            ));
        }
        if self.max_steps == 0 {
            return Err(EngineError::Config("max_steps must be at least 1".to_string()));
        }
        if self.uid_domain.trim().is_empty() {
            return Err(EngineError::Config("uid_domain must not be empty".to_string()));
        }
        Ok(())
    }

    /// Expansion limits derived from this configuration.
    pub fn expand_options(&self) -> ExpandOptions {
        ExpandOptions {
            max_occurrences: self.max_occurrences,
            max_steps: self.max_steps,
        }
    }
}
