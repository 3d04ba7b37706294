//! Error types for Celexta.
//!
//! Collection, adapter and controller operations never fail: they degrade to
//! logged no-ops. Only boundaries that touch the outside world (files,
//! configuration, user-typed values) return [`CelextaError`].

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors raised at Celexta's I/O and input boundaries.
#[derive(Debug, Error)]
pub enum CelextaError {
    /// A file system operation failed.
    #[error("i/o error at {}: {source}", path.display())]
    Io {
        /// The path involved.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: io::Error,
    },

    /// JSON (de)serialization failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed.
    #[error("toml error in {}: {source}", path.display())]
    TomlDe {
        /// The file being parsed.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: toml::de::Error,
    },

    /// TOML serialization failed.
    #[error("toml serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    /// CSV reading or writing failed.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// A required column is missing from a tabular file.
    #[error("{} is missing required column '{column}'", path.display())]
    MissingColumn {
        /// The file that was read.
        path: PathBuf,
        /// The missing column name.
        column: String,
    },

    /// A persisted descriptor could not be turned back into an item.
    #[error("invalid descriptor: {0}")]
    InvalidDescriptor(String),

    /// A user-entered value could not be parsed.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The user configuration contains a key the defaults do not know.
    #[error("user configuration {} contains unknown key '{key}'", path.display())]
    UnknownConfigKey {
        /// The offending file.
        path: PathBuf,
        /// Dotted key path.
        key: String,
    },

    /// Logging setup failed.
    #[error(transparent)]
    Logging(#[from] celexta_core::CoreError),
}

impl CelextaError {
    /// Wraps an I/O error with the path it happened at.
    pub fn io(path: impl AsRef<Path>, source: io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Returns true for failures caused by what the user typed.
    pub fn is_user_input(&self) -> bool {
        matches!(self, Self::InvalidInput(_))
    }
}

/// A specialized Result type for Celexta operations.
pub type Result<T> = std::result::Result<T, CelextaError>;
