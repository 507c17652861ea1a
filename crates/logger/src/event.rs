//! Log events and their fields

use crate::caller::CallerInfo;
use crate::Level;

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};

/// Reserved field holding the resolved calling function.
pub const FUNC_KEY: &str = "func";

/// Reserved field holding the resolved source location.
pub const SRC_KEY: &str = "src";

/// Structured fields attached to an event, kept in key order.
pub type Fields = BTreeMap<String, FieldValue>;

/// Value of a structured field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Text
    Str(String),
    /// Signed integer
    Int(i64),
    /// Unsigned integer
    Uint(u64),
    /// Floating point number
    Float(f64),
    /// Boolean
    Bool(bool),
}

impl FieldValue {
    /// Returns the text if this is a string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => f.write_str(s),
            Self::Int(n) => write!(f, "{n}"),
            Self::Uint(n) => write!(f, "{n}"),
            Self::Float(n) => write!(f, "{n}"),
            Self::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<&String> for FieldValue {
    fn from(value: &String) -> Self {
        Self::Str(value.clone())
    }
}

macro_rules! impl_from_numeric {
    ($variant:ident as $target:ty: $($source:ty),+) => {
        $(
            impl From<$source> for FieldValue {
                fn from(value: $source) -> Self {
                    Self::$variant(<$target>::from(value))
                }
            }
        )+
    };
}

impl_from_numeric!(Int as i64: i8, i16, i32, i64);
impl_from_numeric!(Uint as u64: u8, u16, u32, u64);
impl_from_numeric!(Float as f64: f32, f64);

impl From<usize> for FieldValue {
    fn from(value: usize) -> Self {
        Self::Uint(value as u64)
    }
}

impl From<isize> for FieldValue {
    fn from(value: isize) -> Self {
        Self::Int(value as i64)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// Builds fields from alternating key/value strings.
///
/// # Panics
///
/// Panics if `pairs` has an odd number of elements.
pub fn fields_from_pairs(pairs: &[&str]) -> Fields {
    assert!(
        pairs.len() % 2 == 0,
        "field pairs must have an even number of elements, got {}",
        pairs.len()
    );
    pairs
        .chunks_exact(2)
        .map(|pair| (pair[0].to_string(), FieldValue::from(pair[1])))
        .collect()
}

/// A single log event.
///
/// Events are assembled before dispatch and only read afterwards; every sink
/// sees the same event by reference.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEvent {
    level: Level,
    timestamp: DateTime<Utc>,
    message: String,
    fields: Fields,
}

impl LogEvent {
    /// Creates an event stamped with the current time.
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Self {
            level,
            timestamp: Utc::now(),
            message: message.into(),
            fields: Fields::new(),
        }
    }

    /// Replaces the timestamp.
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Adds a field; an existing key is overwritten.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Merges fields; later keys overwrite earlier ones.
    #[must_use]
    pub fn with_fields(mut self, fields: Fields) -> Self {
        self.fields.extend(fields);
        self
    }

    /// Attaches the reserved `src` field, and `func` when the function is
    /// known.
    #[must_use]
    pub fn with_caller(self, caller: &CallerInfo) -> Self {
        let event = self.with_field(SRC_KEY, caller.src_field());
        match caller.func_field() {
            Some(func) => event.with_field(FUNC_KEY, func),
            None => event,
        }
    }

    /// Severity
    pub fn level(&self) -> Level {
        self.level
    }

    /// Creation time (UTC)
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Message text
    pub fn message(&self) -> &str {
        &self.message
    }

    /// All fields in key order
    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    /// Looks up a single field.
    pub fn field(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    /// Fields other than the reserved caller fields.
    pub fn user_fields(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.fields
            .iter()
            .filter(|(key, _)| !is_reserved(key))
    }

    /// The resolved caller, as `(func, src)`, when both were attached.
    pub fn caller(&self) -> Option<(&FieldValue, &FieldValue)> {
        Some((self.fields.get(FUNC_KEY)?, self.fields.get(SRC_KEY)?))
    }
}

pub(crate) fn is_reserved(key: &str) -> bool {
    key == FUNC_KEY || key == SRC_KEY
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_pairs() {
        let fields = fields_from_pairs(&["service", "api", "region", "eu"]);
        assert_eq!(fields.len(), 2);
        assert_eq!(fields["service"], FieldValue::from("api"));
        assert_eq!(fields["region"].as_str(), Some("eu"));
    }

    #[test]
    #[should_panic(expected = "even number")]
    fn test_odd_field_pairs_panic() {
        let _ = fields_from_pairs(&["key1", "value1", "key2"]);
    }

    #[test]
    fn test_last_write_wins() {
        let event = LogEvent::new(Level::Info, "hello")
            .with_field("user", "alice")
            .with_field("user", "bob");
        assert_eq!(event.field("user"), Some(&FieldValue::from("bob")));
    }

    #[test]
    fn test_caller_fields_are_reserved() {
        let file = std::path::Path::new("src/handlers.rs");
        let caller = CallerInfo::from_parts("app::handlers::create", file, 42).unwrap();
        let event = LogEvent::new(Level::Debug, "created")
            .with_field("id", 7)
            .with_caller(&caller);

        let (func, src) = event.caller().unwrap();
        assert_eq!(func.to_string(), "handlers::create");
        assert_eq!(src.to_string(), "src/handlers.rs:42");
        assert_eq!(event.user_fields().count(), 1);
    }

    #[test]
    fn test_value_display() {
        assert_eq!(FieldValue::from(-3).to_string(), "-3");
        assert_eq!(FieldValue::from(3u8).to_string(), "3");
        assert_eq!(FieldValue::from(1.5).to_string(), "1.5");
        assert_eq!(FieldValue::from(true).to_string(), "true");
    }
}
