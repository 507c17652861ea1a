//! In-memory sink and output buffer
//!
//! Used to inspect what a logger produced, mostly from tests.

use crate::{LevelSet, LogEvent, Sink, SinkError};

use std::io::{self, Write};
use std::sync::Arc;

use parking_lot::Mutex;

/// A sink that keeps every event it receives.
///
/// Clones share the same storage.
#[derive(Debug, Clone)]
pub struct MemorySink {
    events: Arc<Mutex<Vec<LogEvent>>>,
    levels: LevelSet,
}

impl MemorySink {
    /// Accepts every level.
    pub fn new() -> Self {
        Self::with_levels(LevelSet::all())
    }

    /// Accepts the given levels only.
    pub fn with_levels(levels: impl Into<LevelSet>) -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
            levels: levels.into(),
        }
    }

    /// Snapshot of the received events
    pub fn events(&self) -> Vec<LogEvent> {
        self.events.lock().clone()
    }

    /// Messages of the received events, in arrival order
    pub fn messages(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .map(|event| event.message().to_string())
            .collect()
    }

    /// Returns true if any received message contains `text`
    pub fn contains(&self, text: &str) -> bool {
        self.events
            .lock()
            .iter()
            .any(|event| event.message().contains(text))
    }

    /// Number of received events
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Returns true if nothing was received
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    /// Drops all received events
    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new()
    }
}

impl Sink for MemorySink {
    fn fire(&self, event: &LogEvent) -> Result<(), SinkError> {
        self.events.lock().push(event.clone());
        Ok(())
    }

    fn levels(&self) -> LevelSet {
        self.levels
    }

    fn name(&self) -> &str {
        "memory"
    }
}

/// A cloneable [`Write`] target backed by a shared byte buffer.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, decoded lossily.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.bytes.lock()).into_owned()
    }

    /// Written output split into lines.
    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_string).collect()
    }

    /// Returns true if the output contains `text`.
    pub fn contains(&self, text: &str) -> bool {
        self.contents().contains(text)
    }

    /// Discards everything written so far.
    pub fn clear(&self) {
        self.bytes.lock().clear();
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bytes.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
