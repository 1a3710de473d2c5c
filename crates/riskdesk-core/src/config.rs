//! Service configuration
//!
//! Loaded from a TOML file, then overridden from the environment:
//!
//! | variable            | field              |
//! |---------------------|--------------------|
//! | `RISKDESK_URL`      | `backend.url`      |
//! | `RISKDESK_ANON_KEY` | `backend.anon_key` |
//! | `RISKDESK_LOG`      | `log.filter`       |

use crate::error::{DeskError, DeskResult};
use riskdesk_backend::BackendConfig;
use riskdesk_model::{CsvOptions, LineEnding};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Backend URL override
pub const ENV_URL: &str = "RISKDESK_URL";
/// Anon key override
pub const ENV_ANON_KEY: &str = "RISKDESK_ANON_KEY";
/// Log filter override
pub const ENV_LOG: &str = "RISKDESK_LOG";

/// Logging settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `tracing-subscriber` env-filter directive
    pub filter: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            json: false,
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeskConfig {
    pub backend: BackendConfig,
    pub log: LogConfig,
    pub export: CsvOptions,
}

impl DeskConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With backend settings
    #[inline]
    #[must_use]
    pub fn with_backend(mut self, backend: BackendConfig) -> Self {
        self.backend = backend;
        self
    }

    /// With log filter
    #[inline]
    #[must_use]
    pub fn with_log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log.filter = filter.into();
        self
    }

    /// With JSON log output
    #[inline]
    #[must_use]
    pub fn with_json_logs(mut self, json: bool) -> Self {
        self.log.json = json;
        self
    }

    /// With CSV line ending
    #[inline]
    #[must_use]
    pub fn with_line_ending(mut self, line_ending: LineEnding) -> Self {
        self.export = self.export.with_line_ending(line_ending);
        self
    }

    /// Parse TOML text
    ///
    /// # Errors
    /// `DeskError::Config` on malformed TOML
    pub fn from_toml(text: &str) -> DeskResult<Self> {
        toml::from_str(text).map_err(|e| DeskError::Config(e.to_string()))
    }

    /// Read a TOML file, then apply environment overrides
    ///
    /// # Errors
    /// `DeskError::Config` if the file cannot be read or parsed
    pub fn load(path: impl AsRef<Path>) -> DeskResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| DeskError::Config(format!("{}: {e}", path.display())))?;
        Ok(Self::from_toml(&text)?.with_env_overrides(|key| std::env::var(key).ok()))
    }

    /// Apply overrides looked up through `var`
    #[must_use]
    pub fn with_env_overrides(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = var(ENV_URL) {
            self.backend.url = url;
        }
        if let Some(key) = var(ENV_ANON_KEY) {
            self.backend.anon_key = key;
        }
        if let Some(filter) = var(ENV_LOG) {
            self.log.filter = filter;
        }
        self
    }
}
