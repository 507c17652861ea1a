//! Backup naming, retention and compression
//!
//! The active file `dir/app.log` is rotated to
//! `dir/app-2024-01-02T03-04-05.678.log` (UTC). Compressed backups carry an
//! extra `.gz` suffix.

use crate::config::RotationSettings;
use crate::{Error, Result};

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime, TimeDelta, Utc};
use flate2::Compression;
use flate2::write::GzEncoder;
use tracing::debug;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H-%M-%S%.3f";
const GZ_SUFFIX: &str = ".gz";

/// A rotated file found next to the active one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backup {
    /// Location on disk
    pub path: PathBuf,
    /// Rotation time encoded in the name
    pub timestamp: DateTime<Utc>,
    /// Whether the backup is gzipped
    pub compressed: bool,
}

/// Splits `app.log` into (`app`, `.log`); a name without extension gets an
/// empty one.
fn name_parts(active: &Path) -> (String, String) {
    let stem = active
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = active
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();
    (stem, ext)
}

fn directory(active: &Path) -> &Path {
    match active.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// Backup path for a rotation at `timestamp`.
pub fn backup_path(active: &Path, timestamp: DateTime<Utc>) -> PathBuf {
    let (stem, ext) = name_parts(active);
    let name = format!("{stem}-{}{ext}", timestamp.format(TIMESTAMP_FORMAT));
    directory(active).join(name)
}

/// A backup path for `now` that names no existing file, compressed or not.
///
/// Rotations within the same millisecond move the timestamp forward.
pub fn unique_backup_path(active: &Path, now: DateTime<Utc>) -> PathBuf {
    let mut timestamp = now;
    loop {
        let candidate = backup_path(active, timestamp);
        if !candidate.exists() && !gz_path(&candidate).exists() {
            return candidate;
        }
        timestamp += TimeDelta::milliseconds(1);
    }
}

fn gz_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(GZ_SUFFIX);
    PathBuf::from(name)
}

/// Recovers the rotation time from a file name, if it is a backup of
/// `active`.
fn parse_backup_name(active: &Path, file_name: &str) -> Option<(DateTime<Utc>, bool)> {
    let (stem, ext) = name_parts(active);
    let (name, compressed) = match file_name.strip_suffix(GZ_SUFFIX) {
        Some(name) => (name, true),
        None => (file_name, false),
    };
    let timestamp = name
        .strip_prefix(stem.as_str())?
        .strip_prefix('-')?
        .strip_suffix(ext.as_str())?;
    let timestamp = NaiveDateTime::parse_from_str(timestamp, TIMESTAMP_FORMAT).ok()?;
    Some((timestamp.and_utc(), compressed))
}

/// Backups of `active`, newest first.
pub fn list_backups(active: &Path) -> io::Result<Vec<Backup>> {
    let dir = directory(active);
    let mut backups = Vec::new();

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let file_name = entry.file_name();
        let Some((timestamp, compressed)) = parse_backup_name(active, &file_name.to_string_lossy())
        else {
            continue;
        };
        backups.push(Backup {
            path: entry.path(),
            timestamp,
            compressed,
        });
    }

    backups.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    Ok(backups)
}

/// Gzips `path` to `path.gz` and removes the original.
///
/// A partially written `.gz` is removed on failure.
pub fn compress(path: &Path) -> Result<PathBuf> {
    let target = gz_path(path);
    let compression_error = |source| Error::Compression {
        path: path.to_path_buf(),
        source,
    };

    let result = (|| -> io::Result<()> {
        let mut source = BufReader::new(File::open(path)?);
        let mut encoder = GzEncoder::new(BufWriter::new(File::create(&target)?), Compression::default());
        io::copy(&mut source, &mut encoder)?;
        encoder.finish()?.flush()?;
        Ok(())
    })();

    if let Err(source) = result {
        let _ = fs::remove_file(&target);
        return Err(compression_error(source));
    }
    fs::remove_file(path).map_err(compression_error)?;
    Ok(target)
}

fn prune_error(path: &Path) -> impl FnOnce(io::Error) -> Error {
    let path = path.to_path_buf();
    move |source| Error::Prune { path, source }
}

/// Applies retention to the backups of `settings.path`.
///
/// Keeps the `max_backups` newest, deletes those older than `max_age`, then
/// compresses what is left when compression is enabled.
pub fn prune(settings: &RotationSettings, now: DateTime<Utc>) -> Result<()> {
    let backups = list_backups(&settings.path).map_err(prune_error(directory(&settings.path)))?;
    let cutoff = now - settings.max_age;

    // A backup and its compressed twin count once.
    let mut kept_names = HashSet::new();
    let mut remaining = Vec::new();
    for backup in backups {
        let key = backup.timestamp;
        let within_count = kept_names.contains(&key) || kept_names.len() < settings.max_backups;
        if within_count && backup.timestamp >= cutoff {
            kept_names.insert(key);
            remaining.push(backup);
        } else {
            debug!(path = %backup.path.display(), "removing old log backup");
            fs::remove_file(&backup.path).map_err(prune_error(&backup.path))?;
        }
    }

    if settings.compress {
        for backup in remaining.iter().filter(|backup| !backup.compressed) {
            if gz_path(&backup.path).exists() {
                // An earlier compression finished but the original was left behind.
                fs::remove_file(&backup.path).map_err(prune_error(&backup.path))?;
                continue;
            }
            let target = compress(&backup.path)?;
            debug!(path = %target.display(), "compressed log backup");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::TimeZone;
    use std::io::Read;

    use flate2::read::GzDecoder;

    fn at(secs: u32, millis: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, secs).unwrap() + TimeDelta::milliseconds(i64::from(millis))
    }

    #[test]
    fn test_backup_names() {
        let active = Path::new("/var/log/app.log");
        assert_eq!(
            backup_path(active, at(5, 678)),
            PathBuf::from("/var/log/app-2024-01-02T03-04-05.678.log")
        );

        let bare = Path::new("server");
        assert_eq!(backup_path(bare, at(5, 0)), PathBuf::from("./server-2024-01-02T03-04-05.000"));
    }

    #[test]
    fn test_parse_backup_name() {
        let active = Path::new("logs/app.log");
        assert_eq!(
            parse_backup_name(active, "app-2024-01-02T03-04-05.678.log"),
            Some((at(5, 678), false))
        );
        assert_eq!(
            parse_backup_name(active, "app-2024-01-02T03-04-05.678.log.gz"),
            Some((at(5, 678), true))
        );
        assert_eq!(parse_backup_name(active, "app.log"), None);
        assert_eq!(parse_backup_name(active, "other-2024-01-02T03-04-05.678.log"), None);
        assert_eq!(parse_backup_name(active, "app-garbage.log"), None);
    }

    #[test]
    fn test_unique_backup_path_bumps_millis() {
        let dir = tempfile::tempdir().unwrap();
        let active = dir.path().join("app.log");

        let first = unique_backup_path(&active, at(5, 0));
        fs::write(&first, "one").unwrap();
        let second = unique_backup_path(&active, at(5, 0));
        assert_eq!(second, backup_path(&active, at(5, 1)));

        fs::write(gz_path(&second), "two").unwrap();
        let third = unique_backup_path(&active, at(5, 0));
        assert_eq!(third, backup_path(&active, at(5, 2)));
    }

    #[test]
    fn test_list_backups_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let active = dir.path().join("app.log");
        fs::write(&active, "active").unwrap();
        fs::write(backup_path(&active, at(1, 0)), "old").unwrap();
        fs::write(gz_path(&backup_path(&active, at(3, 0))), "new").unwrap();
        fs::write(dir.path().join("unrelated.txt"), "x").unwrap();

        let backups = list_backups(&active).unwrap();
        assert_eq!(backups.len(), 2);
        assert_eq!(backups[0].timestamp, at(3, 0));
        assert!(backups[0].compressed);
        assert_eq!(backups[1].timestamp, at(1, 0));
    }

    #[test]
    fn test_compress_replaces_original() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app-2024-01-02T03-04-05.000.log");
        fs::write(&path, "line one\nline two\n").unwrap();

        let target = compress(&path).unwrap();
        assert!(!path.exists());
        assert_eq!(target, gz_path(&path));

        let mut contents = String::new();
        GzDecoder::new(File::open(&target).unwrap())
            .read_to_string(&mut contents)
            .unwrap();
        assert_eq!(contents, "line one\nline two\n");
    }

    #[test]
    fn test_prune_by_count_and_age() {
        let dir = tempfile::tempdir().unwrap();
        let active = dir.path().join("app.log");
        let now = at(10, 0);
        for secs in 1..=5 {
            fs::write(backup_path(&active, at(secs, 0)), "backup").unwrap();
        }

        let settings = RotationSettings {
            path: active.clone(),
            max_bytes: 1024,
            max_backups: 3,
            max_age: TimeDelta::seconds(8),
            compress: false,
            min_level: hooklog_logger::Level::Trace,
        };
        prune(&settings, now).unwrap();

        // Count keeps 5, 4, 3; age drops anything before second 2.
        let remaining: Vec<_> = list_backups(&active)
            .unwrap()
            .into_iter()
            .map(|backup| backup.timestamp)
            .collect();
        assert_eq!(remaining, vec![at(5, 0), at(4, 0), at(3, 0)]);

        let settings = RotationSettings {
            max_age: TimeDelta::milliseconds(6500),
            compress: true,
            ..settings
        };
        prune(&settings, now).unwrap();
        let remaining = list_backups(&active).unwrap();
        assert_eq!(remaining.len(), 2);
        assert!(remaining.iter().all(|backup| backup.compressed));
    }
}
