//! TOML-based settings for a flow manager.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

fn default_id() -> String {
    "batch-flow".to_string()
}

fn default_working_dir() -> PathBuf {
    PathBuf::from("work")
}

fn default_max_parallel() -> usize {
    4
}

/// Operator-facing settings for one flow manager, loaded from a TOML file.
///
/// ```toml
/// id = "ingest-flow"
/// working_dir = "/var/lib/terrabatch/work"
/// max_parallel = 8
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowSettings {
    /// Identifier of the flow, used for logging and registry naming.
    #[serde(default = "default_id")]
    pub id: String,

    /// Root directory for per-consumer working directories.
    #[serde(default = "default_working_dir")]
    pub working_dir: PathBuf,

    /// Maximum number of consumers executing at once on the shared pool.
    #[serde(default = "default_max_parallel")]
    pub max_parallel: usize,
}

impl Default for FlowSettings {
    fn default() -> Self {
        Self {
            id: default_id(),
            working_dir: default_working_dir(),
            max_parallel: default_max_parallel(),
        }
    }
}

impl FlowSettings {
    /// Parse settings from a TOML string.
    pub fn from_toml(input: &str) -> Result<Self> {
        Ok(toml::from_str(input)?)
    }

    /// Load settings from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&raw)
    }
}
