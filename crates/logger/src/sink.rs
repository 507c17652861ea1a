//! Sink trait

use crate::{LevelSet, LogEvent};

/// Error returned by a sink.
pub type SinkError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A destination for log events, registered with a
/// [`HookDispatcher`](crate::HookDispatcher).
pub trait Sink: Send + Sync + 'static {
    /// Accept one event. Called synchronously on the logging thread.
    fn fire(&self, event: &LogEvent) -> Result<(), SinkError>;

    /// Levels this sink wants to receive.
    fn levels(&self) -> LevelSet {
        LevelSet::all()
    }

    /// Release any resources held by the sink.
    fn close(&self) -> Result<(), SinkError> {
        Ok(())
    }

    /// Name used in diagnostics.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}
