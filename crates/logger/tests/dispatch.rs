//! Sink dispatch through the logger

use hooklog_logger::*;
use std::sync::Arc;

struct FailingSink {
    reason: &'static str,
}

impl Sink for FailingSink {
    fn fire(&self, _event: &LogEvent) -> std::result::Result<(), SinkError> {
        Err(self.reason.into())
    }

    fn name(&self) -> &str {
        self.reason
    }
}

#[test]
fn test_failing_sink_does_not_block_others() {
    let before = MemorySink::new();
    let after = MemorySink::new();
    let buffer = SharedBuffer::new();
    let logger = Logger::builder()
        .output(buffer.clone())
        .sink(Arc::new(before.clone()))
        .sink(Arc::new(FailingSink { reason: "disk full" }))
        .sink(Arc::new(after.clone()))
        .build()
        .unwrap();

    logger.error("still delivered");

    assert!(before.contains("still delivered"));
    assert!(after.contains("still delivered"));
    assert!(buffer.contains("still delivered"));
}

#[test]
fn test_sink_failures_are_reported_through_tracing() {
    let diagnostics = SharedBuffer::new();
    let writer = diagnostics.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .finish();

    let logger = Logger::builder()
        .null_output()
        .sink(Arc::new(FailingSink { reason: "first broken" }))
        .sink(Arc::new(FailingSink { reason: "second broken" }))
        .build()
        .unwrap();

    tracing::subscriber::with_default(subscriber, || logger.warn("nobody home"));

    let output = diagnostics.contents();
    assert!(output.contains("failed to deliver log event"));
    assert!(output.contains("first broken"));
    assert!(output.contains("second broken"));
}

#[test]
fn test_per_sink_level_sets() {
    let errors = MemorySink::with_levels([Level::Error, Level::Fatal]);
    let everything = MemorySink::new();
    let logger = Logger::builder()
        .null_output()
        .sink(Arc::new(errors.clone()))
        .sink_with_levels(Arc::new(everything.clone()), LevelSet::all())
        .build()
        .unwrap();

    logger.info("routine");
    logger.error("broken");
    logger.warn("odd");

    assert_eq!(errors.messages(), vec!["broken"]);
    assert_eq!(everything.messages(), vec!["routine", "broken", "odd"]);
}

#[test]
fn test_threshold_applies_before_sinks() {
    let sink = MemorySink::new();
    let logger = Logger::builder()
        .level(Level::Warn)
        .null_output()
        .sink(Arc::new(sink.clone()))
        .build()
        .unwrap();

    logger.info("filtered by the threshold");
    logger.debug("also filtered");
    assert!(sink.is_empty());
}

#[test]
fn test_sinks_receive_identical_events() {
    let first = MemorySink::new();
    let second = MemorySink::new();
    let logger = Logger::builder()
        .level(Level::Debug)
        .null_output()
        .field("service", "api")
        .sink(Arc::new(first.clone()))
        .sink(Arc::new(second.clone()))
        .build()
        .unwrap();

    logger.debug("shared");
    assert_eq!(first.events(), second.events());
    assert!(first.events()[0].field(SRC_KEY).is_some());
}

#[test]
fn test_close_reports_first_error() {
    struct ClosingSink(&'static str);

    impl Sink for ClosingSink {
        fn fire(&self, _event: &LogEvent) -> std::result::Result<(), SinkError> {
            Ok(())
        }

        fn close(&self) -> std::result::Result<(), SinkError> {
            Err(format!("{} cannot close", self.0).into())
        }

        fn name(&self) -> &str {
            self.0
        }
    }

    let logger = Logger::builder()
        .null_output()
        .sink(Arc::new(ClosingSink("alpha")))
        .sink(Arc::new(ClosingSink("beta")))
        .build()
        .unwrap();

    let error = logger.close().unwrap_err();
    assert!(matches!(&error, Error::Sink { sink, .. } if sink == "alpha"));
}
