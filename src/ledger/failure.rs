//! Failure values produced by item processors and their classification.

use serde::{Deserialize, Serialize};
use std::any::Any;
use std::backtrace::{Backtrace, BacktraceStatus};
use std::fmt;
use std::io;
use std::panic::Location;
use thiserror::Error;

/// Coarse category of a recorded item failure.
///
/// Persisted by name, so the variant names are part of the checkpoint format.
/// Names this version does not know load back as [`ErrorClass::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ErrorClass {
    Io,
    NotFound,
    PermissionDenied,
    Timeout,
    Parse,
    Validation,
    Panic,
    Other,
}

impl ErrorClass {
    pub const ALL: [ErrorClass; 8] = [
        ErrorClass::Io,
        ErrorClass::NotFound,
        ErrorClass::PermissionDenied,
        ErrorClass::Timeout,
        ErrorClass::Parse,
        ErrorClass::Validation,
        ErrorClass::Panic,
        ErrorClass::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Io => "Io",
            Self::NotFound => "NotFound",
            Self::PermissionDenied => "PermissionDenied",
            Self::Timeout => "Timeout",
            Self::Parse => "Parse",
            Self::Validation => "Validation",
            Self::Panic => "Panic",
            Self::Other => "Other",
        }
    }

    /// Map an I/O error kind onto a class
    pub fn from_io_kind(kind: io::ErrorKind) -> Self {
        match kind {
            io::ErrorKind::NotFound => Self::NotFound,
            io::ErrorKind::PermissionDenied => Self::PermissionDenied,
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => Self::Timeout,
            io::ErrorKind::InvalidData | io::ErrorKind::UnexpectedEof => Self::Parse,
            io::ErrorKind::InvalidInput => Self::Validation,
            _ => Self::Io,
        }
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<ErrorClass> for String {
    fn from(class: ErrorClass) -> Self {
        class.as_str().to_string()
    }
}

impl From<&str> for ErrorClass {
    fn from(name: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|class| class.as_str() == name)
            .unwrap_or(Self::Other)
    }
}

impl From<String> for ErrorClass {
    fn from(name: String) -> Self {
        Self::from(name.as_str())
    }
}

/// Error types that know which [`ErrorClass`] they belong to.
///
/// Implement this on a processor's own error enum so its failures are
/// grouped by a stable kind instead of falling back to `Other`.
pub trait Classify {
    fn error_class(&self) -> ErrorClass;
}

impl Classify for io::Error {
    fn error_class(&self) -> ErrorClass {
        ErrorClass::from_io_kind(self.kind())
    }
}

impl Classify for serde_json::Error {
    fn error_class(&self) -> ErrorClass {
        if self.is_io() {
            ErrorClass::Io
        } else {
            ErrorClass::Parse
        }
    }
}

impl Classify for std::num::ParseIntError {
    fn error_class(&self) -> ErrorClass {
        ErrorClass::Parse
    }
}

impl Classify for std::num::ParseFloatError {
    fn error_class(&self) -> ErrorClass {
        ErrorClass::Parse
    }
}

impl Classify for std::str::Utf8Error {
    fn error_class(&self) -> ErrorClass {
        ErrorClass::Parse
    }
}

impl Classify for std::string::FromUtf8Error {
    fn error_class(&self) -> ErrorClass {
        ErrorClass::Parse
    }
}

/// Walk an error chain and return the class of the first cause we recognise.
fn classify_chain(err: &anyhow::Error) -> ErrorClass {
    for cause in err.chain() {
        if let Some(e) = cause.downcast_ref::<io::Error>() {
            return e.error_class();
        }
        if let Some(e) = cause.downcast_ref::<serde_json::Error>() {
            return e.error_class();
        }
        if let Some(e) = cause.downcast_ref::<std::num::ParseIntError>() {
            return e.error_class();
        }
        if let Some(e) = cause.downcast_ref::<std::num::ParseFloatError>() {
            return e.error_class();
        }
        if let Some(e) = cause.downcast_ref::<std::str::Utf8Error>() {
            return e.error_class();
        }
        if let Some(e) = cause.downcast_ref::<std::string::FromUtf8Error>() {
            return e.error_class();
        }
        if let Some(e) = cause.downcast_ref::<ItemFailure>() {
            return e.class;
        }
    }
    ErrorClass::Other
}

/// A single item's failure: its class, message and traceback.
///
/// The traceback names the site that produced the failure (captured with
/// `#[track_caller]`, so a `?` in a processor points at that `?`), followed
/// by a full backtrace when `RUST_BACKTRACE` enables capture. It is the
/// finer grouping key inside a class; the message is not part of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemFailure {
    class: ErrorClass,
    message: String,
    traceback: String,
}

impl ItemFailure {
    /// Create a failure of an explicit class at the caller's location
    #[track_caller]
    pub fn new(class: ErrorClass, message: impl Into<String>) -> Self {
        Self::at(class, message.into(), Location::caller())
    }

    /// Create a failure from an error that carries its own class
    #[track_caller]
    pub fn classified<E: Classify + fmt::Display + ?Sized>(err: &E) -> Self {
        Self::at(err.error_class(), err.to_string(), Location::caller())
    }

    /// Create a failure from an `anyhow` chain, classifying by its causes
    #[track_caller]
    pub fn from_anyhow(err: &anyhow::Error) -> Self {
        Self::at(classify_chain(err), format!("{:#}", err), Location::caller())
    }

    /// Create a failure from a caught panic payload.
    ///
    /// `site` is the `file:line:col` the panic hook saw, if any.
    pub(crate) fn from_panic(payload: Box<dyn Any + Send>, site: Option<String>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        let site = site.unwrap_or_else(|| "unknown location".to_string());
        Self {
            class: ErrorClass::Panic,
            traceback: format!("{} at {}", ErrorClass::Panic, site),
            message,
        }
    }

    fn at(class: ErrorClass, message: String, location: &'static Location<'static>) -> Self {
        let mut traceback = format!(
            "{} at {}:{}:{}",
            class,
            location.file(),
            location.line(),
            location.column()
        );
        let backtrace = Backtrace::capture();
        if backtrace.status() == BacktraceStatus::Captured {
            traceback.push('\n');
            traceback.push_str(&backtrace.to_string());
        }
        Self {
            class,
            message,
            traceback,
        }
    }

    pub fn class(&self) -> ErrorClass {
        self.class
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn traceback(&self) -> &str {
        &self.traceback
    }
}

impl fmt::Display for ItemFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.class, self.message)
    }
}

impl std::error::Error for ItemFailure {}

/// What a processor returns when an item does not complete normally.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// Abort the whole run after persisting state. Not recorded as a failure.
    #[error("stop requested")]
    Stop,

    /// The item failed; record it and carry on with the next one.
    #[error(transparent)]
    Failed(#[from] ItemFailure),
}

impl ProcessError {
    /// Shorthand for a failure of an explicit class at the caller's location
    #[track_caller]
    pub fn failed(class: ErrorClass, message: impl Into<String>) -> Self {
        Self::Failed(ItemFailure::new(class, message))
    }
}

impl From<anyhow::Error> for ProcessError {
    #[track_caller]
    fn from(err: anyhow::Error) -> Self {
        Self::Failed(ItemFailure::from_anyhow(&err))
    }
}

impl From<io::Error> for ProcessError {
    #[track_caller]
    fn from(err: io::Error) -> Self {
        Self::Failed(ItemFailure::classified(&err))
    }
}

impl From<serde_json::Error> for ProcessError {
    #[track_caller]
    fn from(err: serde_json::Error) -> Self {
        Self::Failed(ItemFailure::classified(&err))
    }
}
