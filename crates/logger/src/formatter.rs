//! Rendering events to bytes

use crate::event::{FieldValue, LogEvent};
use crate::Level;

use std::io::Write;

use chrono::SecondsFormat;
use serde_json::{Map, Value};
use termcolor::{Buffer, Color, ColorSpec, WriteColor};

/// Turns an event into one output line.
///
/// Implementations must be pure: the same event always renders to the same
/// bytes, and no state is mutated.
pub trait Formatter: Send + Sync + 'static {
    /// Render `event`, including the trailing newline.
    fn format(&self, event: &LogEvent) -> Vec<u8>;
}

/// Color used for a level's label in colored output.
pub(crate) fn level_color(level: Level) -> ColorSpec {
    let mut spec = ColorSpec::new();
    match level {
        Level::Trace => spec.set_fg(Some(Color::Magenta)).set_intense(true),
        Level::Debug => spec.set_fg(Some(Color::Green)).set_intense(true),
        Level::Info => spec.set_fg(Some(Color::Blue)).set_intense(true),
        Level::Warn => spec.set_fg(Some(Color::Yellow)),
        Level::Error | Level::Fatal | Level::Panic => spec
            .set_fg(Some(Color::White))
            .set_bg(Some(Color::Red))
            .set_bold(true),
    };
    spec
}

/// `key=value` text output.
///
/// ```text
/// time=2024-01-01T12:00:00Z level=info msg="user created" id=7 user=alice
/// ```
#[derive(Debug, Clone)]
pub struct TextFormatter {
    full_timestamp: bool,
    timestamp_format: Option<String>,
    disable_timestamp: bool,
    force_colors: bool,
}

impl TextFormatter {
    /// Plain text with full RFC 3339 timestamps.
    pub fn new() -> Self {
        Self {
            full_timestamp: true,
            timestamp_format: None,
            disable_timestamp: false,
            force_colors: false,
        }
    }

    /// Full date and time when true, time of day only when false.
    #[must_use]
    pub fn full_timestamp(mut self, enabled: bool) -> Self {
        self.full_timestamp = enabled;
        self
    }

    /// Custom `chrono` format string for the timestamp.
    #[must_use]
    pub fn timestamp_format(mut self, format: impl Into<String>) -> Self {
        self.timestamp_format = Some(format.into());
        self
    }

    /// Omit the `time` key entirely.
    #[must_use]
    pub fn disable_timestamp(mut self, disabled: bool) -> Self {
        self.disable_timestamp = disabled;
        self
    }

    /// Color the level value with ANSI escapes.
    #[must_use]
    pub fn force_colors(mut self, enabled: bool) -> Self {
        self.force_colors = enabled;
        self
    }

    fn timestamp(&self, event: &LogEvent) -> String {
        let timestamp = event.timestamp();
        match (&self.timestamp_format, self.full_timestamp) {
            (Some(format), _) => timestamp.format(format).to_string(),
            (None, true) => timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
            (None, false) => timestamp.format("%H:%M:%S").to_string(),
        }
    }
}

impl Default for TextFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl Formatter for TextFormatter {
    fn format(&self, event: &LogEvent) -> Vec<u8> {
        let mut buffer = if self.force_colors {
            Buffer::ansi()
        } else {
            Buffer::no_color()
        };

        if !self.disable_timestamp {
            let _ = write!(buffer, "time={} ", quote(&self.timestamp(event)));
        }

        let _ = write!(buffer, "level=");
        let _ = buffer.set_color(&level_color(event.level()));
        let _ = write!(buffer, "{}", event.level());
        let _ = buffer.reset();

        let _ = write!(buffer, " msg={}", quote(event.message()));

        for (key, value) in event.fields() {
            let _ = write!(buffer, " {}={}", key, quote_value(value));
        }

        let _ = writeln!(buffer);
        buffer.into_inner()
    }
}

fn needs_quoting(text: &str) -> bool {
    text.is_empty()
        || !text.chars().all(|c| {
            c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | '/' | '@' | '^' | '+' | ':')
        })
}

fn quote(text: &str) -> String {
    if needs_quoting(text) {
        format!("{text:?}")
    } else {
        text.to_string()
    }
}

fn quote_value(value: &FieldValue) -> String {
    match value {
        FieldValue::Str(s) => quote(s),
        other => quote(&other.to_string()),
    }
}

/// One JSON object per line.
#[derive(Debug, Clone, Default)]
pub struct JsonFormatter {
    pretty: bool,
}

impl JsonFormatter {
    /// Compact JSON output.
    pub fn new() -> Self {
        Self::default()
    }

    /// Indented output, mostly useful when reading logs by hand.
    #[must_use]
    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }
}

fn json_value(value: &FieldValue) -> Value {
    match value {
        FieldValue::Str(s) => Value::String(s.clone()),
        FieldValue::Int(n) => Value::from(*n),
        FieldValue::Uint(n) => Value::from(*n),
        FieldValue::Float(n) => Value::from(*n),
        FieldValue::Bool(b) => Value::Bool(*b),
    }
}

impl Formatter for JsonFormatter {
    fn format(&self, event: &LogEvent) -> Vec<u8> {
        let mut object = Map::new();
        for (key, value) in event.fields() {
            // Fields may not shadow the keys every line carries.
            let key = match key.as_str() {
                "time" | "level" | "msg" => format!("fields.{key}"),
                _ => key.clone(),
            };
            object.insert(key, json_value(value));
        }
        object.insert(
            "time".to_string(),
            Value::String(event.timestamp().to_rfc3339_opts(SecondsFormat::Millis, true)),
        );
        object.insert("level".to_string(), Value::String(event.level().to_string()));
        object.insert("msg".to_string(), Value::String(event.message().to_string()));

        let object = Value::Object(object);
        let mut line = if self.pretty {
            serde_json::to_vec_pretty(&object)
        } else {
            serde_json::to_vec(&object)
        }
        .unwrap_or_default();
        line.push(b'\n');
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{TimeZone, Utc};

    fn event() -> LogEvent {
        LogEvent::new(Level::Info, "user created")
            .with_timestamp(Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap())
            .with_field("user", "alice")
            .with_field("id", 7)
    }

    fn text(formatter: &dyn Formatter, event: &LogEvent) -> String {
        String::from_utf8(formatter.format(event)).unwrap()
    }

    #[test]
    fn test_text_layout() {
        let line = text(&TextFormatter::new(), &event());
        assert_eq!(
            line,
            "time=2024-01-02T03:04:05Z level=info msg=\"user created\" id=7 user=alice\n"
        );
    }

    #[test]
    fn test_text_quotes_only_when_needed() {
        let event = LogEvent::new(Level::Warn, "done")
            .with_field("path", "/var/log/app.log")
            .with_field("src", "tests/app.rs:12")
            .with_field("empty", "")
            .with_field("spaced", "a b");
        let line = text(&TextFormatter::new().disable_timestamp(true), &event);
        assert_eq!(
            line,
            "level=warning msg=done empty=\"\" path=/var/log/app.log spaced=\"a b\" src=tests/app.rs:12\n"
        );
    }

    #[test]
    fn test_text_forced_colors() {
        let line = text(&TextFormatter::new().force_colors(true), &event());
        assert!(line.contains("\x1b["));
        assert!(line.contains("user=alice"));
    }

    #[test]
    fn test_text_custom_timestamp() {
        let formatter = TextFormatter::new().timestamp_format("%Y/%m/%d");
        assert!(text(&formatter, &event()).starts_with("time=2024/01/02 "));

        let formatter = TextFormatter::new().full_timestamp(false);
        assert!(text(&formatter, &event()).starts_with("time=03:04:05 "));
    }

    #[test]
    fn test_json_object() {
        let line = JsonFormatter::new().format(&event().with_field("level", "shadow"));
        assert_eq!(line.last(), Some(&b'\n'));

        let value: Value = serde_json::from_slice(&line).unwrap();
        assert_eq!(value["msg"], "user created");
        assert_eq!(value["level"], "info");
        assert_eq!(value["time"], "2024-01-02T03:04:05.000Z");
        assert_eq!(value["id"], 7);
        assert_eq!(value["user"], "alice");
        assert_eq!(value["fields.level"], "shadow");
    }

    #[test]
    fn test_json_pretty() {
        let line = JsonFormatter::new().pretty(true).format(&event());
        let text = String::from_utf8(line.clone()).unwrap();
        assert!(text.starts_with("{\n  \""));
        assert!(text.ends_with("}\n"));

        let value: Value = serde_json::from_slice(&line).unwrap();
        assert_eq!(value["msg"], "user created");
        let compact = JsonFormatter::new().format(&event());
        assert_eq!(compact.iter().filter(|&&byte| byte == b'\n').count(), 1);
    }
}
