//! Top-level runtime configuration, loaded from TOML: the defaults this
//! substrate's [`crate::ToolRuntimeBuilder`] applies when a request omits
//! a field.

use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::sync::Arc<std::io::Error>,
    },
    #[error("failed to parse config: {0}")]
    Parse(String),
}

impl ConfigError {
    pub fn kind(&self) -> toolrt_types::ErrorKind {
        toolrt_types::ErrorKind::Configuration
    }
}

/// Defaults applied by [`crate::ToolRuntimeBuilder`] — mirrors
/// [`toolrt_exec::ExecutorConfig`] plus the chain-step cap, expressed as a
/// serializable document so a host can ship it as a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub default_language: String,
    pub default_timeout_ms: u64,
    pub default_max_tool_calls: usize,
    pub default_max_chain_steps: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            default_language: "javascript".to_string(),
            default_timeout_ms: 30_000,
            default_max_tool_calls: 0,
            default_max_chain_steps: 0,
        }
    }
}

impl RuntimeConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: std::sync::Arc::new(e),
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }

    pub fn into_executor_config(self) -> toolrt_exec::ExecutorConfig {
        toolrt_exec::ExecutorConfig {
            default_language: self.default_language,
            default_timeout: self.default_timeout(),
            max_tool_calls: self.default_max_tool_calls,
        }
    }
}
