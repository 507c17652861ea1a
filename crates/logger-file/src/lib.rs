//! Rotating file sink for hooklog
//!
//! This crate provides a [`Sink`](hooklog_logger::Sink) that:
//! - Appends formatted events to a single active file
//! - Rotates the file once it would grow past a size limit
//! - Keeps a bounded number of timestamped backups, deleting old ones
//! - Optionally gzips backups

#![warn(missing_docs, unreachable_pub)]
#![forbid(unsafe_code)]

pub mod backup;
mod config;
mod error;
mod sink;

pub use config::{
    DEFAULT_MAX_AGE_DAYS, DEFAULT_MAX_BACKUPS, DEFAULT_MAX_SIZE_MB, DEFAULT_PATH,
    RotatingFileConfig, RotationSettings,
};
pub use error::{Error, Result};
pub use sink::RotatingFileSink;
