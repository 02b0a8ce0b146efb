//! Persisted previous-sample snapshots, one file per (host, port).
//!
//! # Storage Format
//!
//! `<dir>/.memcached_<host>_<port>.dat` holds the last raw sample as a JSON
//! array of `{variableName, externalId, timestamp, value}` objects.
//!
//! A missing, blank or unreadable file is not an error: it means there is
//! no baseline yet and the next run starts cold.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::error::CollectorError;
use crate::sample::RawSample;

/// Snapshot files under one directory.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Deterministic snapshot path for a target.
    pub fn path_for(&self, host: &str, port: u16) -> PathBuf {
        self.dir.join(format!(".memcached_{}_{}.dat", sanitize_host(host), port))
    }

    /// Previous sample for a target, or `None` on a cold start.
    pub fn load(&self, host: &str, port: u16) -> Option<RawSample> {
        let path = self.path_for(host, port);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::debug!("no snapshot at {}", path.display());
                return None;
            }
            Err(e) => {
                log::warn!("ignoring unreadable snapshot {}: {e}", path.display());
                return None;
            }
        };

        let trimmed = raw.trim();
        if trimmed.is_empty() {
            log::debug!("snapshot {} is empty", path.display());
            return None;
        }

        match serde_json::from_str::<RawSample>(trimmed) {
            Ok(sample) => {
                log::debug!(
                    "loaded {} snapshot entries from {}",
                    sample.len(),
                    path.display()
                );
                Some(sample)
            }
            Err(e) => {
                log::warn!("ignoring malformed snapshot {}: {e}", path.display());
                None
            }
        }
    }

    /// Replace the target's snapshot with `sample`.
    ///
    /// The file is written next to its destination and renamed into place, so
    /// a crash mid-write leaves the previous snapshot intact.
    pub fn save(
        &self,
        host: &str,
        port: u16,
        sample: &RawSample,
    ) -> Result<PathBuf, CollectorError> {
        fs::create_dir_all(&self.dir).map_err(|source| CollectorError::CreateSnapshotDir {
            path: self.dir.clone(),
            source,
        })?;

        let path = self.path_for(host, port);
        let json = serde_json::to_string(sample)
            .map_err(|e| CollectorError::Other(format!("failed to encode snapshot: {e}")))?;

        write_atomic(&self.dir, &path, json.as_bytes()).map_err(|source| {
            CollectorError::WriteSnapshotFile {
                path: path.clone(),
                source,
            }
        })?;

        log::debug!("saved {} snapshot entries to {}", sample.len(), path.display());
        Ok(path)
    }
}

fn write_atomic(dir: &Path, path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Keep host names filesystem-safe; IPv6 colons and path separators become `_`.
fn sanitize_host(host: &str) -> String {
    host.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::SampleEntry;
    use crate::timestamp::Timestamp;

    fn sample() -> RawSample {
        RawSample::new(vec![
            SampleEntry {
                variable_name: "Threads".to_string(),
                external_id: "1534:Threads:4".to_string(),
                timestamp: Timestamp::from_unix_ms(1_771_030_200_123),
                value: 4.0,
            },
            SampleEntry {
                variable_name: "BytesRead/Sec".to_string(),
                external_id: "1539:Bytes Read/Sec:4".to_string(),
                timestamp: Timestamp::from_unix_ms(1_771_030_200_123),
                value: 1234.567_890_123_456_7,
            },
        ])
    }

    #[test]
    fn path_is_deterministic_per_target() {
        let store = SnapshotStore::new("/var/tmp/memrate");
        assert_eq!(
            store.path_for("10.0.0.5", 11211),
            PathBuf::from("/var/tmp/memrate/.memcached_10.0.0.5_11211.dat")
        );
        assert_eq!(store.path_for("a", 1), store.path_for("a", 1));
        assert_ne!(store.path_for("a", 1), store.path_for("a", 2));
    }

    #[test]
    fn path_sanitizes_host() {
        let store = SnapshotStore::new("/d");
        let p = store.path_for("::1", 11211);
        assert_eq!(p, PathBuf::from("/d/.memcached___1_11211.dat"));
        let p = store.path_for("../etc/passwd", 1);
        assert_eq!(p.parent(), Some(Path::new("/d")));
    }

    #[test]
    fn load_missing_file_is_none() {
        let tmp = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(tmp.path());
        assert!(store.load("localhost", 11211).is_none());
    }

    #[test]
    fn load_missing_dir_is_none() {
        let tmp = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(tmp.path().join("not-yet"));
        assert!(store.load("localhost", 11211).is_none());
    }

    #[test]
    fn load_blank_file_is_none() {
        let tmp = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(tmp.path());
        fs::write(store.path_for("h", 1), "  \n\t ").unwrap();
        assert!(store.load("h", 1).is_none());
    }

    #[test]
    fn load_garbage_is_none() {
        let tmp = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(tmp.path());
        fs::write(store.path_for("h", 1), "{not json").unwrap();
        assert!(store.load("h", 1).is_none());
        fs::write(store.path_for("h", 1), r#"[{"externalId":"x"}]"#).unwrap();
        assert!(store.load("h", 1).is_none());
    }

    #[test]
    fn save_then_load_roundtrips_exactly() {
        let tmp = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(tmp.path().join("nested").join("dir"));
        let s = sample();
        let path = store.save("cache-01", 11211, &s).unwrap();
        assert!(path.exists());
        assert_eq!(store.load("cache-01", 11211), Some(s));
    }

    #[test]
    fn save_overwrites_previous_content() {
        let tmp = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(tmp.path());
        store.save("h", 1, &sample()).unwrap();
        let empty = RawSample::default();
        store.save("h", 1, &empty).unwrap();
        let raw = fs::read_to_string(store.path_for("h", 1)).unwrap();
        assert_eq!(raw, "[]");
        assert_eq!(store.load("h", 1), Some(empty));
    }

    #[test]
    fn save_leaves_no_temp_files_behind() {
        let tmp = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(tmp.path());
        store.save("h", 1, &sample()).unwrap();
        store.save("h", 1, &sample()).unwrap();
        let names: Vec<_> = fs::read_dir(tmp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names.len(), 1);
    }

    #[test]
    fn save_fails_when_directory_cannot_be_created() {
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("blocker");
        fs::write(&blocker, "a regular file").unwrap();
        let store = SnapshotStore::new(blocker.join("snapshots"));
        let err = store.save("h", 1, &sample()).unwrap_err();
        assert!(matches!(err, CollectorError::CreateSnapshotDir { .. }));
        assert_eq!(err.exit_code(), 21);
    }

    #[test]
    fn save_fails_when_file_cannot_be_written() {
        let tmp = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(tmp.path());
        // A non-empty directory squatting on the snapshot path cannot be replaced.
        let squatter = store.path_for("h", 1);
        fs::create_dir(&squatter).unwrap();
        fs::write(squatter.join("keep"), "x").unwrap();
        let err = store.save("h", 1, &sample()).unwrap_err();
        assert!(matches!(err, CollectorError::WriteSnapshotFile { .. }));
        assert_eq!(err.exit_code(), 22);
    }
}
