//! Error types for file-based logging

use std::io;
use std::path::PathBuf;

/// Result type for file sink operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur during file logging
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Opening, writing or syncing the log file failed
    #[error("I/O error on {path}: {source}")]
    Io {
        /// The file involved
        path: PathBuf,
        /// The underlying error
        source: io::Error,
    },

    /// Failed to create log directory
    #[error("Failed to create log directory at {path}: {source}")]
    CreateDirectory {
        /// The path that failed to be created
        path: PathBuf,
        /// The underlying error
        source: io::Error,
    },

    /// Failed to move the active file to its backup name
    #[error("Failed to rotate {from} to {to}: {source}")]
    Rotation {
        /// The active log file
        from: PathBuf,
        /// The backup name
        to: PathBuf,
        /// The underlying error
        source: io::Error,
    },

    /// Failed to gzip a backup
    #[error("Failed to compress backup {path}: {source}")]
    Compression {
        /// The backup being compressed
        path: PathBuf,
        /// The underlying error
        source: io::Error,
    },

    /// Failed to list or delete old backups
    #[error("Failed to prune backups in {path}: {source}")]
    Prune {
        /// The backup or directory involved
        path: PathBuf,
        /// The underlying error
        source: io::Error,
    },

    /// A single formatted line is larger than the maximum file size
    #[error("Log line of {len} bytes exceeds maximum file size of {max} bytes")]
    LineTooLong {
        /// Length of the rejected line
        len: u64,
        /// Configured maximum size
        max: u64,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),
}
