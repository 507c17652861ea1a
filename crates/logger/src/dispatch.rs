//! Fan-out of events to registered sinks

use crate::{Error, LevelSet, LogEvent, Result, Sink};

use std::fmt;
use std::sync::Arc;

use tracing::warn;

#[derive(Clone)]
struct Registration {
    sink: Arc<dyn Sink>,
    levels: LevelSet,
}

/// An ordered set of sinks, each with the levels it asked for.
///
/// Registration happens at setup time through `&mut self`; [`fire`] only needs
/// `&self` and may be called from many threads at once.
///
/// [`fire`]: HookDispatcher::fire
#[derive(Clone, Default)]
pub struct HookDispatcher {
    registrations: Vec<Registration>,
}

impl HookDispatcher {
    /// Creates an empty dispatcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a sink for the levels it reports through [`Sink::levels`].
    pub fn register(&mut self, sink: Arc<dyn Sink>) {
        let levels = sink.levels();
        self.register_with_levels(sink, levels);
    }

    /// Registers a sink for an explicit level set.
    pub fn register_with_levels(&mut self, sink: Arc<dyn Sink>, levels: LevelSet) {
        self.registrations.push(Registration { sink, levels });
    }

    /// Number of registered sinks
    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    /// Returns true if no sink is registered
    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    /// Delivers `event` to every sink whose level set contains its level.
    ///
    /// Sinks are called in registration order. A failing sink does not stop
    /// delivery to the rest; the first failure is returned and later ones are
    /// only reported through `tracing`.
    pub fn fire(&self, event: &LogEvent) -> Result<()> {
        let mut first_error = None;

        for registration in &self.registrations {
            if !registration.levels.contains(event.level()) {
                continue;
            }
            let Err(source) = registration.sink.fire(event) else {
                continue;
            };
            if first_error.is_none() {
                first_error = Some(Error::Sink {
                    sink: registration.sink.name().to_string(),
                    source,
                });
            } else {
                warn!(sink = registration.sink.name(), error = %source, "sink failed to accept event");
            }
        }

        first_error.map_or(Ok(()), Err)
    }

    /// Closes every sink, in registration order. The first failure is returned.
    pub fn close_all(&self) -> Result<()> {
        let mut first_error = None;

        for registration in &self.registrations {
            if let Err(source) = registration.sink.close() {
                if first_error.is_none() {
                    first_error = Some(Error::Sink {
                        sink: registration.sink.name().to_string(),
                        source,
                    });
                } else {
                    warn!(sink = registration.sink.name(), error = %source, "sink failed to close");
                }
            }
        }

        first_error.map_or(Ok(()), Err)
    }
}

impl fmt::Debug for HookDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(
                self.registrations
                    .iter()
                    .map(|registration| (registration.sink.name(), registration.levels)),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Level, MemorySink, SinkError};

    use parking_lot::Mutex;

    struct Recorder {
        name: &'static str,
        calls: Arc<Mutex<Vec<&'static str>>>,
        fail: bool,
    }

    impl Sink for Recorder {
        fn fire(&self, _event: &LogEvent) -> std::result::Result<(), SinkError> {
            self.calls.lock().push(self.name);
            if self.fail {
                Err(format!("{} is broken", self.name).into())
            } else {
                Ok(())
            }
        }

        fn name(&self) -> &str {
            self.name
        }
    }

    fn recorder(name: &'static str, calls: &Arc<Mutex<Vec<&'static str>>>, fail: bool) -> Arc<dyn Sink> {
        Arc::new(Recorder {
            name,
            calls: calls.clone(),
            fail,
        })
    }

    #[test]
    fn test_registration_order() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut dispatcher = HookDispatcher::new();
        dispatcher.register(recorder("first", &calls, false));
        dispatcher.register(recorder("second", &calls, false));
        dispatcher.register(recorder("third", &calls, false));

        dispatcher.fire(&LogEvent::new(Level::Info, "hello")).unwrap();
        assert_eq!(*calls.lock(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_first_error_wins_and_delivery_continues() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut dispatcher = HookDispatcher::new();
        dispatcher.register(recorder("ok", &calls, false));
        dispatcher.register(recorder("broken-a", &calls, true));
        dispatcher.register(recorder("broken-b", &calls, true));
        dispatcher.register(recorder("last", &calls, false));

        let error = dispatcher
            .fire(&LogEvent::new(Level::Error, "boom"))
            .unwrap_err();
        assert!(matches!(&error, Error::Sink { sink, .. } if sink == "broken-a"));
        assert!(error.to_string().contains("broken-a is broken"));
        assert_eq!(*calls.lock(), vec!["ok", "broken-a", "broken-b", "last"]);
    }

    #[test]
    fn test_membership_not_threshold() {
        let sink = MemorySink::new();
        let mut dispatcher = HookDispatcher::new();
        dispatcher.register_with_levels(Arc::new(sink.clone()), LevelSet::only(Level::Warn));

        for level in Level::ALL {
            dispatcher.fire(&LogEvent::new(level, level.as_str())).unwrap();
        }
        assert_eq!(sink.messages(), vec!["warning".to_string()]);
    }

    #[test]
    fn test_empty_dispatcher() {
        let dispatcher = HookDispatcher::new();
        assert!(dispatcher.is_empty());
        dispatcher.fire(&LogEvent::new(Level::Panic, "nobody listens")).unwrap();
        dispatcher.close_all().unwrap();
    }
}
