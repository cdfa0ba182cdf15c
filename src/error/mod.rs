use std::path::{Path, PathBuf};
use thiserror::Error;

pub mod codes;

pub use codes::{describe_error_code, ErrorCode};

type BoxedSource = Box<dyn std::error::Error + Send + Sync>;

/// The error type for engine construction, configuration and checkpoint storage.
///
/// Per-item failures never surface here; they are recorded in the
/// [`ErrorLedger`](crate::ledger::ErrorLedger) and the run continues.
#[derive(Error, Debug)]
pub enum LongtaskError {
    #[error("[E{code:04}] Configuration error: {message}")]
    Config {
        code: u16,
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    #[error("[E{code:04}] Storage error: {message}")]
    Storage {
        code: u16,
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<BoxedSource>,
    },

    #[error("[E{code:04}] Serialization error: {message}")]
    Serialization {
        code: u16,
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },
}

impl LongtaskError {
    /// Create a configuration error with default code
    pub fn config(message: impl Into<String>) -> Self {
        Self::config_with_code(ErrorCode::CONFIG_GENERIC, message)
    }

    /// Create a configuration error with specific code
    pub fn config_with_code(code: u16, message: impl Into<String>) -> Self {
        Self::Config {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Create a storage error for a checkpoint path
    pub fn storage(code: u16, message: impl Into<String>, path: &Path) -> Self {
        Self::Storage {
            code,
            message: message.into(),
            path: Some(path.to_path_buf()),
            source: None,
        }
    }

    /// Create a serialization error with specific code
    pub fn serialization(code: u16, message: impl Into<String>) -> Self {
        Self::Serialization {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Add a source error to this error
    pub fn with_source(mut self, source: impl Into<BoxedSource>) -> Self {
        match &mut self {
            Self::Config { source: src, .. }
            | Self::Storage { source: src, .. }
            | Self::Serialization { source: src, .. } => {
                *src = Some(source.into());
            }
        }
        self
    }

    /// Get the error code
    pub fn code(&self) -> u16 {
        match self {
            Self::Config { code, .. }
            | Self::Storage { code, .. }
            | Self::Serialization { code, .. } => *code,
        }
    }

    /// Get the process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config { .. } => 2,
            Self::Storage { .. } => 4,
            Self::Serialization { .. } => 4,
        }
    }
}

impl From<serde_json::Error> for LongtaskError {
    fn from(err: serde_json::Error) -> Self {
        let code = if err.is_io() {
            ErrorCode::SERIALIZATION_ENCODE
        } else {
            ErrorCode::SERIALIZATION_DECODE
        };
        Self::serialization(code, err.to_string()).with_source(err)
    }
}

/// Result type alias for longtask operations
pub type Result<T> = std::result::Result<T, LongtaskError>;
