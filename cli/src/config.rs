//! CLI configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::Path;

use streakduel_engine::EngineConfig;
use streakduel_transport::TransportConfig;

use crate::logging::LogFormat;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("config error: {0}")]
    Config(String),
}

/// Everything the `streakduel` binary needs to run.
///
/// Loaded from a TOML file via [`CliConfig::from_toml_file`]; flags and
/// `STREAKDUEL_*` environment variables override file values.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CliConfig {
    /// This device's install id. Required by every command except `config`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub install_id: Option<String>,

    /// Log format: "human" or "json".
    #[serde(default)]
    pub log_format: LogFormat,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub transport: TransportConfig,

    #[serde(default)]
    pub engine: EngineConfig,
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl CliConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, CliError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| CliError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, CliError> {
        toml::from_str(s).map_err(|e| CliError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, CliError> {
        toml::to_string_pretty(self).map_err(|e| CliError::Config(e.to_string()))
    }
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            install_id: None,
            log_format: LogFormat::default(),
            log_level: default_log_level(),
            transport: TransportConfig::default(),
            engine: EngineConfig::default(),
        }
    }
}
