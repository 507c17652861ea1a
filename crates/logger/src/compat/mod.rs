//! Compatibility bridges for other logging crates

#[cfg(feature = "log-compat")]
pub mod log_bridge;

#[cfg(feature = "log-compat")]
pub use log_bridge::{init_log_bridge, LogBridge};
