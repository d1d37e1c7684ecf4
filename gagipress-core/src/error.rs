use std::error::Error as StdError;
use std::fmt;
use std::io;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io { source: io::Error, path: PathBuf },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        source: toml::de::Error,
        path: PathBuf,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

pub type AppResult<T> = std::result::Result<T, AppError>;

type Cause = Box<dyn StdError + Send + Sync + 'static>;

/// Failure classes shared by every component of the generation pipeline.
///
/// Only `Validation` is definitionally non-transient; the retry executor never
/// repeats work that failed with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Api,
    Storage,
    NotFound,
    Network,
    Cancelled,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Api => "api",
            ErrorKind::Storage => "storage",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Network => "network",
            ErrorKind::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error tagged with an [`ErrorKind`], optionally wrapping the failure that
/// caused it. The kind never changes after construction.
#[derive(Debug)]
pub struct AppError {
    kind: ErrorKind,
    message: String,
    source: Option<Cause>,
}

impl AppError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn wrap<E>(cause: E, kind: ErrorKind, message: impl Into<String>) -> Self
    where
        E: Into<Cause>,
    {
        Self {
            kind,
            message: message.into(),
            source: Some(cause.into()),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn cancelled() -> Self {
        Self::new(ErrorKind::Cancelled, "operation cancelled")
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_kind(&self, kind: ErrorKind) -> bool {
        self.kind == kind
    }

    /// The wrapped cause, if any.
    pub fn cause(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.source.as_deref()
    }

    pub fn into_cause(self) -> Option<Cause> {
        self.source
    }

    /// Walks the cause chain looking for an error of type `E`.
    pub fn find_cause<E: StdError + 'static>(&self) -> Option<&E> {
        let mut current: Option<&(dyn StdError + 'static)> = self.source();
        while let Some(err) = current {
            if let Some(found) = err.downcast_ref::<E>() {
                return Some(found);
            }
            current = err.source();
        }
        None
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Some(cause) => write!(f, "{}: {}: {}", self.kind, self.message, cause),
            None => write!(f, "{}: {}", self.kind, self.message),
        }
    }
}

impl StdError for AppError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_deref()
            .map(|cause| cause as &(dyn StdError + 'static))
    }
}

/// Reports whether `err` is an [`AppError`] of the given kind. Other error
/// types never match.
pub fn is_kind(err: &(dyn StdError + 'static), kind: ErrorKind) -> bool {
    err.downcast_ref::<AppError>()
        .map(|app| app.is_kind(kind))
        .unwrap_or(false)
}
