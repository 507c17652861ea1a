//! Declarative logger configuration

use crate::color::ColorFormatter;
use crate::formatter::{JsonFormatter, TextFormatter};
use crate::{Level, LoggerBuilder};

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Output format of a configured logger
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatKind {
    /// `key=value` text
    #[default]
    Text,
    /// Colored terminal output
    Color,
    /// One JSON object per line
    Json,
}

/// Logger settings, typically read from a TOML or JSON document.
///
/// ```toml
/// level = "debug"
/// format = "json"
/// runtime_context = true
///
/// [fields]
/// service = "api"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    /// Threshold; Info when absent
    pub level: Option<Level>,
    /// Output format
    pub format: FormatKind,
    /// Attach caller context to every event
    pub runtime_context: bool,
    /// Base fields
    pub fields: BTreeMap<String, String>,
}

impl LoggerConfig {
    /// Turns the settings into a builder, so output and sinks can still be
    /// added in code.
    pub fn into_builder(self) -> LoggerBuilder {
        let mut builder = LoggerBuilder::new();
        if let Some(level) = self.level {
            builder = builder.level(level);
        }
        if self.runtime_context {
            builder = builder.runtime_context();
        }
        builder = match self.format {
            FormatKind::Text if self.runtime_context => builder,
            FormatKind::Text => builder.formatter(TextFormatter::new()),
            FormatKind::Color => builder.formatter(ColorFormatter::new()),
            FormatKind::Json => builder.formatter(JsonFormatter::new()),
        };
        for (key, value) in self.fields {
            builder = builder.field(key, value);
        }
        builder
    }
}

impl From<LoggerConfig> for LoggerBuilder {
    fn from(config: LoggerConfig) -> Self {
        config.into_builder()
    }
}
