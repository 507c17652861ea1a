//! Configuration for the rotating file sink

use crate::{Error, Result};

use std::path::PathBuf;

use chrono::TimeDelta;
use hooklog_logger::{Level, LevelSet};
use serde::{Deserialize, Serialize};

/// Active log file used when no path is configured.
pub const DEFAULT_PATH: &str = "logs/app.log";

/// Default maximum size of the active file, in megabytes.
pub const DEFAULT_MAX_SIZE_MB: u64 = 100;

/// Default number of backups kept.
pub const DEFAULT_MAX_BACKUPS: usize = 3;

/// Default age after which backups are deleted, in days.
pub const DEFAULT_MAX_AGE_DAYS: u32 = 28;

const MEGABYTE: u64 = 1024 * 1024;

/// Rotating file sink configuration.
///
/// Every field is optional. Missing values, and zero for the numeric ones,
/// fall back to the defaults.
///
/// ```toml
/// path = "/var/log/app/app.log"
/// max_size_mb = 50
/// max_backups = 5
/// compress = true
/// levels = ["warning", "error", "fatal", "panic"]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RotatingFileConfig {
    /// Active log file
    pub path: Option<PathBuf>,
    /// Size in megabytes that triggers rotation
    pub max_size_mb: Option<u64>,
    /// Number of backups to keep
    pub max_backups: Option<usize>,
    /// Age in days after which backups are deleted
    pub max_age_days: Option<u32>,
    /// Gzip backups after rotation
    pub compress: Option<bool>,
    /// Accepted levels; only the least severe one matters, see
    /// [`RotationSettings::min_level`]
    pub levels: Option<LevelSet>,
}

impl RotatingFileConfig {
    /// Configuration with every default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the active file.
    #[must_use]
    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Sets the rotation size in megabytes.
    #[must_use]
    pub fn max_size_mb(mut self, megabytes: u64) -> Self {
        self.max_size_mb = Some(megabytes);
        self
    }

    /// Sets how many backups are kept.
    #[must_use]
    pub fn max_backups(mut self, backups: usize) -> Self {
        self.max_backups = Some(backups);
        self
    }

    /// Sets the backup age limit in days.
    #[must_use]
    pub fn max_age_days(mut self, days: u32) -> Self {
        self.max_age_days = Some(days);
        self
    }

    /// Enables gzip compression of backups.
    #[must_use]
    pub fn compress(mut self, compress: bool) -> Self {
        self.compress = Some(compress);
        self
    }

    /// Sets the accepted levels.
    #[must_use]
    pub fn levels(mut self, levels: impl Into<LevelSet>) -> Self {
        self.levels = Some(levels.into());
        self
    }

    /// Applies defaults and validates.
    pub fn resolve(&self) -> Result<RotationSettings> {
        let path = self
            .path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_PATH));
        if path.file_name().is_none() {
            return Err(Error::Configuration(format!(
                "log path {} has no file name",
                path.display()
            )));
        }

        let max_size_mb = nonzero_or(self.max_size_mb, DEFAULT_MAX_SIZE_MB);
        let max_bytes = max_size_mb.checked_mul(MEGABYTE).ok_or_else(|| {
            Error::Configuration(format!("max_size_mb {max_size_mb} is too large"))
        })?;

        let max_age_days = nonzero_or(self.max_age_days, DEFAULT_MAX_AGE_DAYS);
        let max_age = TimeDelta::try_days(i64::from(max_age_days)).ok_or_else(|| {
            Error::Configuration(format!("max_age_days {max_age_days} is too large"))
        })?;

        let levels = self.levels.unwrap_or_else(LevelSet::all);
        let min_level = levels.least_severe().ok_or_else(|| {
            Error::Configuration("levels must contain at least one level".to_string())
        })?;

        Ok(RotationSettings {
            path,
            max_bytes,
            max_backups: nonzero_or(self.max_backups, DEFAULT_MAX_BACKUPS),
            max_age,
            compress: self.compress.unwrap_or(false),
            min_level,
        })
    }
}

fn nonzero_or<T: Default + PartialEq>(value: Option<T>, default: T) -> T {
    match value {
        Some(value) if value != T::default() => value,
        _ => default,
    }
}

/// Validated settings, with every default applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationSettings {
    /// Active log file
    pub path: PathBuf,
    /// Size in bytes that triggers rotation
    pub max_bytes: u64,
    /// Number of backups kept
    pub max_backups: usize,
    /// Age after which backups are deleted
    pub max_age: TimeDelta,
    /// Gzip backups after rotation
    pub compress: bool,
    /// Least severe accepted level; events at least this severe are written
    pub min_level: Level,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = RotatingFileConfig::default().resolve().unwrap();
        assert_eq!(settings.path, PathBuf::from("logs/app.log"));
        assert_eq!(settings.max_bytes, 100 * 1024 * 1024);
        assert_eq!(settings.max_backups, 3);
        assert_eq!(settings.max_age, TimeDelta::days(28));
        assert!(!settings.compress);
        assert_eq!(settings.min_level, Level::Trace);
    }

    #[test]
    fn test_zero_means_default() {
        let settings = RotatingFileConfig::new()
            .max_size_mb(0)
            .max_backups(0)
            .max_age_days(0)
            .resolve()
            .unwrap();
        assert_eq!(settings.max_bytes, 100 * 1024 * 1024);
        assert_eq!(settings.max_backups, 3);
        assert_eq!(settings.max_age, TimeDelta::days(28));
    }

    #[test]
    fn test_min_level_from_set() {
        let settings = RotatingFileConfig::new()
            .levels([Level::Error, Level::Warn])
            .resolve()
            .unwrap();
        assert_eq!(settings.min_level, Level::Warn);

        let error = RotatingFileConfig::new()
            .levels(LevelSet::empty())
            .resolve()
            .unwrap_err();
        assert!(matches!(error, Error::Configuration(_)));
    }

    #[test]
    fn test_path_without_file_name() {
        let error = RotatingFileConfig::new().path("/").resolve().unwrap_err();
        assert!(matches!(error, Error::Configuration(_)));
    }

    #[test]
    fn test_parse_toml() {
        let config: RotatingFileConfig = toml::from_str(
            r#"
            path = "/var/log/app/app.log"
            max_size_mb = 50
            compress = true
            levels = ["warning", "error"]
            "#,
        )
        .unwrap();

        assert_eq!(config.max_backups, None);
        let settings = config.resolve().unwrap();
        assert_eq!(settings.path, PathBuf::from("/var/log/app/app.log"));
        assert_eq!(settings.max_bytes, 50 * 1024 * 1024);
        assert_eq!(settings.max_backups, 3);
        assert!(settings.compress);
        assert_eq!(settings.min_level, Level::Warn);
    }
}
