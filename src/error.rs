// src/error.rs

//! Unified error handling for the extraction pipeline.
//!
//! `AppError` covers failures that end a whole run. `DocumentError` covers
//! failures of a single input document, which are reported and skipped.

use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[cfg(feature = "fetch")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// URL parsing failed
    #[cfg(feature = "fetch")]
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// File watcher failed
    #[cfg(feature = "watch")]
    #[error("Watch error: {0}")]
    Watch(#[from] notify::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Input directory is missing or holds no recognized documents
    #[error("No input at {}: {message}\n{hint}", path.display())]
    InputMissing {
        path: PathBuf,
        message: String,
        hint: String,
    },

    /// Every document failed or was a duplicate
    #[error("No gear sets were extracted from {0} document(s)")]
    NoData(usize),
}

impl AppError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create an input-absent error with a remediation hint.
    pub fn input_missing(
        path: impl AsRef<Path>,
        message: impl fmt::Display,
        hint: impl Into<String>,
    ) -> Self {
        Self::InputMissing {
            path: path.as_ref().to_path_buf(),
            message: message.to_string(),
            hint: hint.into(),
        }
    }
}

/// Why a single document could not be turned into a gear set.
#[derive(Error, Debug)]
pub enum DocumentError {
    /// The file could not be read
    #[error("unreadable: {0}")]
    Read(#[from] std::io::Error),

    /// The wrapper is not valid JSON
    #[error("invalid JSON wrapper: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// A required wrapper field is absent or not a string
    #[error("missing `{0}` field")]
    MissingField(&'static str),

    /// The extension maps to no known decoder
    #[error("unsupported file type '{0}'")]
    UnsupportedFormat(String),

    /// No gear-set name could be derived
    #[error("could not derive a gear-set name")]
    MissingName,

    /// Parsing failed for another reason
    #[error("{0}")]
    Malformed(String),
}

impl DocumentError {
    /// Create a generic malformed-document error.
    pub fn malformed(message: impl fmt::Display) -> Self {
        Self::Malformed(message.to_string())
    }
}
