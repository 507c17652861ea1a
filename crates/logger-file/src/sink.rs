//! The rotating file sink

use crate::backup;
use crate::config::{RotatingFileConfig, RotationSettings};
use crate::{Error, Result};

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use hooklog_logger::{Formatter, Level, LevelSet, LogEvent, Sink, SinkError, TextFormatter};
use parking_lot::Mutex;
use tracing::debug;

/// Writes events to a file that rotates by size, keeping a bounded number of
/// backups.
///
/// Accepts every event at least as severe as the least severe configured
/// level. Lines are rendered as plain text with full timestamps unless
/// another formatter is set. The file is opened on the first accepted event.
///
/// One lock covers the size check, rotation and the write, so concurrent
/// events never interleave and the recorded size matches the file.
pub struct RotatingFileSink {
    settings: RotationSettings,
    formatter: Arc<dyn Formatter>,
    state: Mutex<RotationState>,
}

#[derive(Default)]
struct RotationState {
    file: Option<File>,
    size: u64,
}

impl RotatingFileSink {
    /// Creates a sink; nothing is opened until the first write.
    pub fn new(config: RotatingFileConfig) -> Result<Self> {
        Ok(Self::from_settings(config.resolve()?))
    }

    /// Creates a sink from already validated settings.
    pub fn from_settings(settings: RotationSettings) -> Self {
        Self {
            settings,
            formatter: Arc::new(TextFormatter::new()),
            state: Mutex::new(RotationState::default()),
        }
    }

    /// Replaces the line formatter.
    #[must_use]
    pub fn with_formatter(mut self, formatter: impl Formatter) -> Self {
        self.formatter = Arc::new(formatter);
        self
    }

    /// The active log file
    pub fn path(&self) -> &Path {
        &self.settings.path
    }

    /// Effective settings
    pub fn settings(&self) -> &RotationSettings {
        &self.settings
    }

    /// Least severe accepted level
    pub fn min_level(&self) -> Level {
        self.settings.min_level
    }

    /// Returns true if events at `level` are written.
    pub fn accepts(&self, level: Level) -> bool {
        level.is_at_least(self.settings.min_level)
    }

    /// Writes one event, rotating first if it would not fit.
    ///
    /// Events below the minimum level are ignored.
    pub fn write_event(&self, event: &LogEvent) -> Result<()> {
        if !self.accepts(event.level()) {
            return Ok(());
        }
        let line = self.formatter.format(event);
        let mut state = self.state.lock();
        self.write_line(&mut state, &line)
    }

    /// Rotates now, even if the active file has room left.
    pub fn rotate(&self) -> Result<()> {
        let mut state = self.state.lock();
        let file = self.rotate_locked(&mut state)?;
        state.file = Some(file);
        backup::prune(&self.settings, Utc::now())
    }

    /// Syncs and closes the active file. The next write reopens it.
    pub fn close_file(&self) -> Result<()> {
        let mut state = self.state.lock();
        let Some(file) = state.file.take() else {
            return Ok(());
        };
        file.sync_all().map_err(|source| self.io_error(source))
    }

    fn write_line(&self, state: &mut RotationState, line: &[u8]) -> Result<()> {
        let len = line.len() as u64;
        let max = self.settings.max_bytes;
        if len > max {
            return Err(Error::LineTooLong { len, max });
        }

        let mut rotated = false;
        let mut file = match state.file.take() {
            Some(file) => file,
            None => self.open_existing_or_new(state, len, &mut rotated)?,
        };
        if state.size + len > max {
            drop(file);
            file = self.rotate_locked(state)?;
            rotated = true;
        }

        let written = file.write_all(line);
        match written {
            Ok(()) => state.size += len,
            Err(_) => state.size = file.metadata().map_or(state.size, |meta| meta.len()),
        }
        state.file = Some(file);
        written.map_err(|source| self.io_error(source))?;

        if rotated {
            backup::prune(&self.settings, Utc::now())?;
        }
        Ok(())
    }

    /// Opens the active file for appending if it has room for `len` more
    /// bytes, otherwise rotates it away first.
    fn open_existing_or_new(
        &self,
        state: &mut RotationState,
        len: u64,
        rotated: &mut bool,
    ) -> Result<File> {
        self.ensure_directory()?;

        let existing = match fs::metadata(&self.settings.path) {
            Ok(meta) => meta.len(),
            Err(error) if error.kind() == io::ErrorKind::NotFound => return self.create_new(state),
            Err(source) => return Err(self.io_error(source)),
        };
        if existing + len > self.settings.max_bytes {
            *rotated = true;
            return self.rotate_locked(state);
        }

        let file = OpenOptions::new()
            .append(true)
            .open(&self.settings.path)
            .map_err(|source| self.io_error(source))?;
        state.size = existing;
        Ok(file)
    }

    /// Moves the active file to a fresh backup name and starts a new one.
    fn rotate_locked(&self, state: &mut RotationState) -> Result<File> {
        state.file = None;
        self.ensure_directory()?;

        let path = &self.settings.path;
        if path.exists() {
            let backup = backup::unique_backup_path(path, Utc::now());
            fs::rename(path, &backup).map_err(|source| Error::Rotation {
                from: path.clone(),
                to: backup.clone(),
                source,
            })?;
            debug!(backup = %backup.display(), "rotated log file");
        }
        self.create_new(state)
    }

    fn create_new(&self, state: &mut RotationState) -> Result<File> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&self.settings.path)
            .map_err(|source| self.io_error(source))?;
        state.size = 0;
        Ok(file)
    }

    fn ensure_directory(&self) -> Result<()> {
        match self.settings.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => {
                fs::create_dir_all(dir).map_err(|source| Error::CreateDirectory {
                    path: dir.to_path_buf(),
                    source,
                })
            }
            _ => Ok(()),
        }
    }

    fn io_error(&self, source: io::Error) -> Error {
        Error::Io {
            path: self.settings.path.clone(),
            source,
        }
    }

    #[cfg(test)]
    pub(crate) fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.settings.max_bytes = max_bytes;
        self
    }
}

impl Sink for RotatingFileSink {
    fn fire(&self, event: &LogEvent) -> std::result::Result<(), SinkError> {
        Ok(self.write_event(event)?)
    }

    fn levels(&self) -> LevelSet {
        LevelSet::at_least(self.settings.min_level)
    }

    fn close(&self) -> std::result::Result<(), SinkError> {
        Ok(self.close_file()?)
    }

    fn name(&self) -> &str {
        "rotating-file"
    }
}

impl std::fmt::Debug for RotatingFileSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RotatingFileSink")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
