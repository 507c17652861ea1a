//! Process-wide logger slot

use crate::{Level, Logger, Result};

use parking_lot::{const_rwlock, RwLock};

static GLOBAL: LoggerRegistry = LoggerRegistry::new();

/// The registry used by the logging macros.
pub fn global() -> &'static LoggerRegistry {
    &GLOBAL
}

/// Holds at most one logger and hands out clones of it.
///
/// The first successful initializer wins; concurrent callers block until it
/// finishes and then share its result. A failing initializer leaves the
/// registry empty so a later call can try again.
///
/// Lookups of an installed logger only take the read lock. Initializers run
/// under the write lock and must not call back into the same registry.
pub struct LoggerRegistry {
    slot: RwLock<Option<Logger>>,
}

impl LoggerRegistry {
    /// Creates an empty registry.
    pub const fn new() -> Self {
        Self {
            slot: const_rwlock(None),
        }
    }

    /// Returns the installed logger, running `init` if there is none yet.
    pub fn get_or_try_init<F>(&self, init: F) -> Result<Logger>
    where
        F: FnOnce() -> Result<Logger>,
    {
        if let Some(logger) = self.try_get() {
            return Ok(logger);
        }
        let mut slot = self.slot.write();
        if let Some(logger) = slot.as_ref() {
            return Ok(logger.clone());
        }
        let logger = init()?;
        *slot = Some(logger.clone());
        Ok(logger)
    }

    /// Infallible form of [`get_or_try_init`](Self::get_or_try_init).
    pub fn get_or_init<F>(&self, init: F) -> Logger
    where
        F: FnOnce() -> Logger,
    {
        if let Some(logger) = self.try_get() {
            return logger;
        }
        self.slot.write().get_or_insert_with(init).clone()
    }

    /// Returns the installed logger, installing a default one if needed.
    pub fn get(&self) -> Logger {
        self.get_or_init(Logger::default)
    }

    /// Returns the installed logger, if any.
    pub fn try_get(&self) -> Option<Logger> {
        self.slot.read().clone()
    }

    /// Returns the logger only if it would emit at `level`.
    ///
    /// The threshold is checked under the read lock, so dropped events never
    /// clone the logger. A default logger is installed if there is none.
    pub fn get_if_enabled(&self, level: Level) -> Option<Logger> {
        if let Some(logger) = self.slot.read().as_ref() {
            return logger.is_enabled(level).then(|| logger.clone());
        }
        let logger = self.get();
        logger.is_enabled(level).then_some(logger)
    }

    /// Replaces the installed logger and returns the previous one.
    pub fn install(&self, logger: Logger) -> Option<Logger> {
        self.slot.write().replace(logger)
    }

    /// Empties the registry.
    pub fn reset(&self) -> Option<Logger> {
        self.slot.write().take()
    }
}

impl Default for LoggerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for LoggerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoggerRegistry")
            .field("installed", &self.slot.read().is_some())
            .finish()
    }
}
