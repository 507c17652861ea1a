//! Structured, leveled logging with caller context and pluggable sinks.
//!
//! A [`Logger`] checks each event against its threshold, optionally attaches
//! the calling function and source location, hands the event to every
//! registered [`Sink`] whose level set contains it, and finally renders it
//! with its [`Formatter`] to its own output.
//!
//! ```no_run
//! use hooklog_logger::{Level, Logger, MemorySink};
//! use std::sync::Arc;
//!
//! let audit = MemorySink::with_levels([Level::Error]);
//! let logger = Logger::builder()
//!     .level(Level::Debug)
//!     .field("service", "api")
//!     .sink(Arc::new(audit.clone()))
//!     .build()
//!     .expect("valid configuration");
//!
//! logger.with_field("user", "alice").info("signed in");
//! ```
//!
//! # Caller context and debuginfo
//!
//! `func` and `src` come from walking the stack, which needs line tables and
//! qualified symbol names (`debug = true` or `debug = 1` in the profile).
//! Without them `src` falls back to the logging call site tracked by the
//! compiler, and `func` is taken from the symbol table when it is available
//! and omitted otherwise. A bare `debug = false` release build keeps `func`;
//! `debug = "line-tables-only"` reports `src` alone.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![forbid(unsafe_code)]

pub mod caller;
pub mod color;
pub mod compat;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod formatter;
pub mod level;
pub mod logger;
pub mod memory;
pub mod registry;
pub mod sink;

mod macros;

pub use caller::{CallerInfo, CallerResolver, FrameFilter, FunctionName, MAX_CALLER_DEPTH};
pub use color::ColorFormatter;
pub use config::{FormatKind, LoggerConfig};
pub use dispatch::HookDispatcher;
pub use error::{Error, Result};
pub use event::{fields_from_pairs, FieldValue, Fields, LogEvent, FUNC_KEY, SRC_KEY};
pub use formatter::{Formatter, JsonFormatter, TextFormatter};
pub use level::{Level, LevelSet};
pub use logger::{ExitHandler, Logger, LoggerBuilder};
pub use memory::{MemorySink, SharedBuffer};
pub use registry::{global, LoggerRegistry};
pub use sink::{Sink, SinkError};
