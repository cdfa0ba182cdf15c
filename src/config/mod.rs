//! Runner configuration
//!
//! Settings are layered, lowest priority first:
//!
//! 1. Hardcoded defaults
//! 2. `longtask.toml` in the working directory, or the file named by
//!    `LONGTASK_CONFIG`
//! 3. Environment variables (`LONGTASK_*`)

use crate::checkpoint::{CheckpointFormat, FileStore};
use crate::error::{ErrorCode, LongtaskError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "longtask.toml";

/// Valid log levels for configuration validation.
pub const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Directory holding `.<task>.task` checkpoint files
    pub checkpoint_dir: PathBuf,
    /// Gzip the checkpoint
    pub compress: bool,
    /// Default log level when `RUST_LOG` is not set
    pub log_level: Option<String>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            checkpoint_dir: PathBuf::from("."),
            compress: false,
            log_level: None,
        }
    }
}

impl RunnerConfig {
    /// Load from the working directory and the process environment
    pub fn load() -> Result<Self> {
        let cwd = std::env::current_dir().map_err(|e| {
            LongtaskError::config("cannot determine working directory").with_source(e)
        })?;
        Self::load_with(&cwd, |key| std::env::var(key).ok())
    }

    /// Load with an explicit working directory and environment lookup
    pub fn load_with(cwd: &Path, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = match env("LONGTASK_CONFIG") {
            Some(path) => Self::from_file(&cwd.join(path))?,
            None => {
                let default_path = cwd.join(CONFIG_FILE_NAME);
                if default_path.exists() {
                    Self::from_file(&default_path)?
                } else {
                    Self::default()
                }
            }
        };
        config.merge_env_vars(env)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            LongtaskError::config_with_code(
                ErrorCode::CONFIG_NOT_FOUND,
                format!("cannot read {}", path.display()),
            )
            .with_source(e)
        })?;
        toml::from_str(&contents).map_err(|e| {
            LongtaskError::config_with_code(
                ErrorCode::CONFIG_INVALID_TOML,
                format!("invalid config file {}", path.display()),
            )
            .with_source(e)
        })
    }

    pub fn merge_env_vars(&mut self, env: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(dir) = env("LONGTASK_CHECKPOINT_DIR") {
            self.checkpoint_dir = PathBuf::from(dir);
        }

        if let Some(compress) = env("LONGTASK_COMPRESS") {
            self.compress = compress.parse::<bool>().map_err(|_| {
                LongtaskError::config_with_code(
                    ErrorCode::CONFIG_INVALID_VALUE,
                    format!("LONGTASK_COMPRESS must be true or false, got '{}'", compress),
                )
            })?;
        }

        if let Some(log_level) = env("LONGTASK_LOG_LEVEL") {
            self.log_level = Some(log_level);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(level) = &self.log_level {
            if !VALID_LOG_LEVELS.contains(&level.to_lowercase().as_str()) {
                return Err(LongtaskError::config_with_code(
                    ErrorCode::CONFIG_INVALID_VALUE,
                    format!(
                        "log_level must be one of {}, got '{}'",
                        VALID_LOG_LEVELS.join(", "),
                        level
                    ),
                ));
            }
        }
        Ok(())
    }

    pub fn checkpoint_format(&self) -> CheckpointFormat {
        if self.compress {
            CheckpointFormat::Gzip
        } else {
            CheckpointFormat::Json
        }
    }

    /// Checkpoint store for a task under this configuration
    pub fn store_for(&self, task_name: &str) -> FileStore {
        FileStore::with_format(&self.checkpoint_dir, task_name, self.checkpoint_format())
    }
}
