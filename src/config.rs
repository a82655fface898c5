use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

fn default_db_path() -> PathBuf {
    PathBuf::from("ecommerce.db")
}

fn default_sessions_db() -> PathBuf {
    PathBuf::from("sessions.db")
}

fn default_prompts_dir() -> PathBuf {
    PathBuf::from("prompts")
}

fn default_model() -> String {
    "gemini-2.5-pro".to_string()
}

fn default_python_bin() -> String {
    "python3".to_string()
}

fn default_max_steps() -> usize {
    100
}

/// Application configuration.
///
/// Loaded from an optional TOML file; every field has a working default so a
/// bare checkout runs with `seed` + `ask` alone. CLI flags override file
/// values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalystConfig {
    /// Path to the analytics dataset
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Path to the session store
    #[serde(default = "default_sessions_db")]
    pub sessions_db: PathBuf,

    /// Directory holding the prompt templates
    #[serde(default = "default_prompts_dir")]
    pub prompts_dir: PathBuf,

    /// Gemini model name
    #[serde(default = "default_model")]
    pub model: String,

    /// Python interpreter for the code-execution tool
    #[serde(default = "default_python_bin")]
    pub python_bin: String,

    /// Cap on reasoning-loop steps per worker run
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
}

impl Default for AnalystConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            sessions_db: default_sessions_db(),
            prompts_dir: default_prompts_dir(),
            model: default_model(),
            python_bin: default_python_bin(),
            max_steps: default_max_steps(),
        }
    }
}

impl AnalystConfig {
    /// Load configuration from a TOML file, or defaults when `path` is None.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}
