//! Bridge from the `log` crate to hooklog

use crate::{Level, Logger};

use log::{Log, Metadata, Record};

/// Forwards records from the `log` facade into a [`Logger`].
///
/// The record's target is kept as the `target` field.
pub struct LogBridge {
    logger: Logger,
}

impl LogBridge {
    /// Create a new log bridge
    pub fn new(logger: Logger) -> Self {
        Self { logger }
    }
}

impl Log for LogBridge {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.logger.is_enabled(map_level(metadata.level()))
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        self.logger
            .with_field("target", record.target())
            .log(map_level(record.level()), record.args());
    }

    fn flush(&self) {}
}

/// Map log levels to our levels
pub(crate) fn map_level(level: log::Level) -> Level {
    match level {
        log::Level::Error => Level::Error,
        log::Level::Warn => Level::Warn,
        log::Level::Info => Level::Info,
        log::Level::Debug => Level::Debug,
        log::Level::Trace => Level::Trace,
    }
}

fn level_filter(level: Level) -> log::LevelFilter {
    match level {
        Level::Trace => log::LevelFilter::Trace,
        Level::Debug => log::LevelFilter::Debug,
        Level::Info => log::LevelFilter::Info,
        Level::Warn => log::LevelFilter::Warn,
        Level::Error | Level::Fatal | Level::Panic => log::LevelFilter::Error,
    }
}

/// Installs a [`LogBridge`] as the `log` crate's global logger.
///
/// The `log` max level follows the compile-time floor; the logger's own
/// threshold still applies per record.
///
/// # Example
/// ```no_run
/// use hooklog_logger::{compat::init_log_bridge, Logger};
///
/// let logger = Logger::builder().build().unwrap();
/// init_log_bridge(logger).expect("Failed to set log bridge");
/// ```
pub fn init_log_bridge(logger: Logger) -> Result<(), log::SetLoggerError> {
    log::set_boxed_logger(Box::new(LogBridge::new(logger)))?;
    log::set_max_level(level_filter(Level::static_min()));
    Ok(())
}
