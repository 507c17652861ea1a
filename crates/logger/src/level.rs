//! Severity levels and level sets

use crate::Error;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Severity of a log event.
///
/// Variants are declared from least to most severe, so the derived ordering
/// reads naturally: `Level::Trace < Level::Panic`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    /// Very fine-grained diagnostic events.
    Trace,
    /// Events useful while debugging.
    Debug,
    /// Coarse-grained progress of the application.
    Info,
    /// Potentially harmful situations.
    Warn,
    /// Errors the application can recover from.
    Error,
    /// Errors after which the process exits.
    Fatal,
    /// Errors after which the calling thread panics.
    Panic,
}

impl Level {
    /// Every level, least severe first.
    pub const ALL: [Self; 7] = [
        Self::Trace,
        Self::Debug,
        Self::Info,
        Self::Warn,
        Self::Error,
        Self::Fatal,
        Self::Panic,
    ];

    /// Lowercase name, as rendered by the text formatters.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warning",
            Self::Error => "error",
            Self::Fatal => "fatal",
            Self::Panic => "panic",
        }
    }

    /// Uppercase name.
    pub const fn as_upper_str(self) -> &'static str {
        match self {
            Self::Trace => "TRACE",
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARNING",
            Self::Error => "ERROR",
            Self::Fatal => "FATAL",
            Self::Panic => "PANIC",
        }
    }

    /// Returns true if `self` is as severe as `other` or more.
    #[inline(always)]
    pub fn is_at_least(self, other: Self) -> bool {
        self >= other
    }

    /// Returns true if `self` is strictly less severe than `other`.
    #[inline(always)]
    pub fn is_less_severe_than(self, other: Self) -> bool {
        self < other
    }

    /// Returns true for the levels that turn on caller context automatically.
    pub const fn is_verbose(self) -> bool {
        matches!(self, Self::Trace | Self::Debug)
    }

    /// Least severe level compiled into this build.
    ///
    /// Controlled by the `min-level-*` features; the most restrictive enabled
    /// feature wins.
    pub const fn static_min() -> Self {
        if cfg!(feature = "min-level-error") {
            Self::Error
        } else if cfg!(feature = "min-level-warn") {
            Self::Warn
        } else if cfg!(feature = "min-level-info") {
            Self::Info
        } else if cfg!(feature = "min-level-debug") {
            Self::Debug
        } else {
            Self::Trace
        }
    }

    /// Compile-time gate, checked before any runtime threshold.
    #[inline(always)]
    pub fn is_enabled_static(self) -> bool {
        self.is_at_least(Self::static_min())
    }

    const fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            "fatal" => Ok(Self::Fatal),
            "panic" => Ok(Self::Panic),
            _ => Err(Error::InvalidLevel(s.to_string())),
        }
    }
}

impl Serialize for Level {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Level {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}

/// A set of levels, used by sinks to declare which events they want.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct LevelSet(u8);

impl LevelSet {
    /// The empty set.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Every level.
    pub const fn all() -> Self {
        Self(0b0111_1111)
    }

    /// A set holding only `level`.
    pub const fn only(level: Level) -> Self {
        Self(level.bit())
    }

    /// `level` and every level more severe than it.
    pub fn at_least(level: Level) -> Self {
        Level::ALL
            .into_iter()
            .filter(|candidate| candidate.is_at_least(level))
            .collect()
    }

    /// Returns a copy of the set with `level` added.
    #[must_use]
    pub const fn with(self, level: Level) -> Self {
        Self(self.0 | level.bit())
    }

    /// Adds `level` to the set.
    pub fn insert(&mut self, level: Level) {
        self.0 |= level.bit();
    }

    /// Set membership.
    pub const fn contains(self, level: Level) -> bool {
        self.0 & level.bit() != 0
    }

    /// Returns true if the set holds no level.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// The least severe level in the set, if any.
    pub fn least_severe(self) -> Option<Level> {
        self.iter().next()
    }

    /// Levels in the set, least severe first.
    pub fn iter(self) -> impl Iterator<Item = Level> {
        Level::ALL
            .into_iter()
            .filter(move |level| self.contains(*level))
    }
}

impl FromIterator<Level> for LevelSet {
    fn from_iter<I: IntoIterator<Item = Level>>(iter: I) -> Self {
        iter.into_iter().fold(Self::empty(), Self::with)
    }
}

impl From<&[Level]> for LevelSet {
    fn from(levels: &[Level]) -> Self {
        levels.iter().copied().collect()
    }
}

impl<const N: usize> From<[Level; N]> for LevelSet {
    fn from(levels: [Level; N]) -> Self {
        levels.into_iter().collect()
    }
}

impl fmt::Debug for LevelSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl Serialize for LevelSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

impl<'de> Deserialize<'de> for LevelSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let levels = Vec::<Level>::deserialize(deserializer)?;
        Ok(levels.into_iter().collect())
    }
}
