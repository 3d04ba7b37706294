//! Error types for Celexta core.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by core facilities.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The logging subscriber could not be configured.
    #[error("failed to configure logging: {0}")]
    Logging(String),
    /// A file system operation failed.
    #[error("i/o error at {}: {source}", path.display())]
    Io {
        /// The path involved.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: io::Error,
    },
}

/// A specialized Result type for core operations.
pub type CoreResult<T> = std::result::Result<T, CoreError>;
