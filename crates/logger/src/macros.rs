//! Logging macros
//!
//! Each macro takes either a format string, logging through the global
//! registry, or `logger: <expr>,` followed by a format string.
//!
//! ```no_run
//! use hooklog_logger::{info, warn, Logger};
//!
//! info!("listening on port {}", 8080);
//!
//! let logger = Logger::builder().build().unwrap();
//! warn!(logger: logger, "disk {}% full", 91);
//! ```

/// Logs at an explicit level.
#[macro_export]
macro_rules! log_at {
    (logger: $logger:expr, $level:expr, $($arg:tt)+) => {{
        let logger = &$logger;
        let level: $crate::Level = $level;
        if logger.is_enabled(level) {
            logger.log(level, ::std::format_args!($($arg)+));
        }
    }};
    ($level:expr, $($arg:tt)+) => {{
        let level: $crate::Level = $level;
        if let ::std::option::Option::Some(logger) = $crate::global().get_if_enabled(level) {
            logger.log(level, ::std::format_args!($($arg)+));
        }
    }};
}

/// Logs at Trace.
#[macro_export]
macro_rules! trace {
    (logger: $logger:expr, $($arg:tt)+) => {
        $crate::log_at!(logger: $logger, $crate::Level::Trace, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::log_at!($crate::Level::Trace, $($arg)+)
    };
}

/// Logs at Debug.
#[macro_export]
macro_rules! debug {
    (logger: $logger:expr, $($arg:tt)+) => {
        $crate::log_at!(logger: $logger, $crate::Level::Debug, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::log_at!($crate::Level::Debug, $($arg)+)
    };
}

/// Logs at Info.
#[macro_export]
macro_rules! info {
    (logger: $logger:expr, $($arg:tt)+) => {
        $crate::log_at!(logger: $logger, $crate::Level::Info, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::log_at!($crate::Level::Info, $($arg)+)
    };
}

/// Logs at Warn.
#[macro_export]
macro_rules! warn {
    (logger: $logger:expr, $($arg:tt)+) => {
        $crate::log_at!(logger: $logger, $crate::Level::Warn, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::log_at!($crate::Level::Warn, $($arg)+)
    };
}

/// Logs at Error.
#[macro_export]
macro_rules! error {
    (logger: $logger:expr, $($arg:tt)+) => {
        $crate::log_at!(logger: $logger, $crate::Level::Error, $($arg)+)
    };
    ($($arg:tt)+) => {
        $crate::log_at!($crate::Level::Error, $($arg)+)
    };
}
