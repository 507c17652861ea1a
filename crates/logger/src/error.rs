//! Error types for the logging core

use crate::sink::SinkError;

use std::io;

use thiserror::Error;

/// Result type for logging operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while configuring or driving a logger
#[derive(Debug, Error)]
pub enum Error {
    /// A level name could not be parsed
    #[error("invalid log level: {0:?}")]
    InvalidLevel(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Configuration(String),

    /// I/O error on the logger's own output
    #[error("{context}: {source}")]
    Io {
        /// What the logger was doing
        context: String,
        /// The underlying error
        #[source]
        source: io::Error,
    },

    /// A sink failed to accept an event
    #[error("sink {sink} failed: {source}")]
    Sink {
        /// Diagnostic name of the sink
        sink: String,
        /// The error reported by the sink
        #[source]
        source: SinkError,
    },
}
