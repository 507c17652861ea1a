//! Tests for the `log` crate bridge

use hooklog_logger::compat::init_log_bridge;
use hooklog_logger::*;
use std::sync::Arc;

#[test]
fn test_log_bridge() {
    let sink = MemorySink::new();
    let logger = Logger::builder()
        .level(Level::Info)
        .null_output()
        .sink(Arc::new(sink.clone()))
        .build()
        .unwrap();

    init_log_bridge(logger).unwrap();

    log::error!("Error from log crate");
    log::warn!("Warning from log crate");
    log::info!(target: "billing", "Info from log crate");
    log::debug!("Debug from log crate");

    assert_eq!(
        sink.messages(),
        vec![
            "Error from log crate",
            "Warning from log crate",
            "Info from log crate"
        ]
    );

    let events = sink.events();
    assert_eq!(events[0].level(), Level::Error);
    assert_eq!(events[1].level(), Level::Warn);
    assert_eq!(events[2].field("target"), Some(&FieldValue::from("billing")));
    assert_eq!(events[0].field("target"), Some(&FieldValue::from("compat_test")));

    // The global `log` logger can only be set once per process.
    assert!(init_log_bridge(Logger::default()).is_err());
}
