use std::cell::{Cell, RefCell};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, error, warn};

use crate::io::config_io::default_data_file;
use crate::io::recovery::{RecoveryCategory, RecoveryEntry, atomic_write, log_recovery};
use crate::store::{Snapshot, TodoData};
use crate::util::calendar::Week;

/// Error type for persistence
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("could not read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("could not write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
    #[error("could not serialize tasks: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Where a [`TodoData`] lives between runs.
pub trait TaskStorage {
    /// Load the store, mapping legacy weekday baskets onto `week`. Missing
    /// or unreadable-as-JSON data yields a fresh store.
    fn load_in_week(&self, week: &Week) -> Result<TodoData, StorageError>;

    fn load(&self) -> Result<TodoData, StorageError> {
        self.load_in_week(&Week::current())
    }

    fn save(&self, data: &TodoData) -> Result<(), StorageError>;
}

// ---------------------------------------------------------------------------
// JSON file
// ---------------------------------------------------------------------------

/// A single JSON document on disk.
#[derive(Debug, Clone)]
pub struct JsonStorage {
    path: PathBuf,
}

impl JsonStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonStorage { path: path.into() }
    }

    /// Storage at `~/.tltd/tasks.json`.
    pub fn at_default() -> Self {
        Self::new(default_data_file())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory holding the data file (and the recovery log).
    pub fn data_dir(&self) -> &Path {
        match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        }
    }

    /// `tasks.json` -> `tasks.json.backup`
    pub fn backup_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "tasks.json".into());
        name.push(".backup");
        self.path.with_file_name(name)
    }

    pub fn ensure_directory(&self) -> Result<(), StorageError> {
        fs::create_dir_all(self.data_dir()).map_err(|e| StorageError::Write {
            path: self.data_dir().to_path_buf(),
            source: e,
        })
    }

    /// Copy the data file to the backup path. `Ok(false)` when there is no
    /// data file yet.
    pub fn backup(&self) -> Result<bool, StorageError> {
        if !self.path.exists() {
            return Ok(false);
        }
        let target = self.backup_path();
        fs::copy(&self.path, &target).map_err(|e| StorageError::Write {
            path: target,
            source: e,
        })?;
        Ok(true)
    }

    /// Move an unparsable data file aside so the next save cannot
    /// overwrite it.
    fn set_aside_corrupt(&self, reason: &serde_json::Error) {
        let target = self.backup_path();
        match fs::rename(&self.path, &target) {
            Ok(()) => {
                warn!(path = %self.path.display(), backup = %target.display(), error = %reason,
                    "data file unreadable, starting fresh");
                eprintln!(
                    "warning: could not parse {} (moved to {}): {}",
                    self.path.display(),
                    target.display(),
                    reason
                );
            }
            Err(e) => {
                error!(path = %self.path.display(), error = %e, "could not move corrupt data file aside");
                eprintln!(
                    "warning: could not parse {} and could not back it up: {}",
                    self.path.display(),
                    e
                );
            }
        }
        log_recovery(
            self.data_dir(),
            RecoveryEntry::new(RecoveryCategory::Corrupt, "data file could not be parsed")
                .with_field("File", self.path.display().to_string())
                .with_field("Backup", target.display().to_string())
                .with_field("Error", reason.to_string()),
        );
    }
}

impl TaskStorage for JsonStorage {
    fn load_in_week(&self, week: &Week) -> Result<TodoData, StorageError> {
        // bytes, so invalid UTF-8 is reported as a parse failure
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no data file yet");
                return Ok(TodoData::new_for_week(week));
            }
            Err(e) => {
                return Err(StorageError::Read {
                    path: self.path.clone(),
                    source: e,
                });
            }
        };
        match Snapshot::from_slice(&bytes) {
            Ok(snapshot) => Ok(TodoData::from_snapshot_in_week(snapshot, week)),
            Err(e) => {
                self.set_aside_corrupt(&e);
                Ok(TodoData::new_for_week(week))
            }
        }
    }

    fn save(&self, data: &TodoData) -> Result<(), StorageError> {
        let json = data.to_snapshot().to_json_pretty()?;
        let written = self
            .ensure_directory()
            .and_then(|()| {
                atomic_write(&self.path, json.as_bytes()).map_err(|e| StorageError::Write {
                    path: self.path.clone(),
                    source: e,
                })
            });
        if let Err(e) = written {
            error!(path = %self.path.display(), error = %e, "save failed");
            log_recovery(
                self.data_dir(),
                RecoveryEntry::new(RecoveryCategory::Write, "tasks could not be saved")
                    .with_field("File", self.path.display().to_string())
                    .with_field("Error", e.to_string())
                    .with_body(json),
            );
            return Err(e);
        }
        debug!(path = %self.path.display(), tasks = data.len(), "saved");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// In memory
// ---------------------------------------------------------------------------

/// Storage that keeps the last saved snapshot in memory. Useful for
/// driving a session without touching disk.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    saved: RefCell<Option<Snapshot>>,
    saves: Cell<usize>,
    fail_saves: Cell<bool>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage that starts out holding `snapshot`.
    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        let storage = Self::default();
        storage.saved.replace(Some(snapshot));
        storage
    }

    pub fn saved(&self) -> Option<Snapshot> {
        self.saved.borrow().clone()
    }

    pub fn save_count(&self) -> usize {
        self.saves.get()
    }

    /// Make subsequent saves fail, to exercise error paths.
    pub fn set_failing(&self, failing: bool) {
        self.fail_saves.set(failing);
    }
}

impl TaskStorage for MemoryStorage {
    fn load_in_week(&self, week: &Week) -> Result<TodoData, StorageError> {
        Ok(match self.saved() {
            Some(snapshot) => TodoData::from_snapshot_in_week(snapshot, week),
            None => TodoData::new_for_week(week),
        })
    }

    fn save(&self, data: &TodoData) -> Result<(), StorageError> {
        if self.fail_saves.get() {
            return Err(StorageError::Write {
                path: PathBuf::from("<memory>"),
                source: io::Error::other("storage set to fail"),
            });
        }
        self.saved.replace(Some(data.to_snapshot()));
        self.saves.set(self.saves.get() + 1);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::task::Task;
    use crate::util::calendar::parse_date_key;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn week() -> Week {
        Week::containing(parse_date_key("2026-01-21").unwrap())
    }

    #[test]
    fn missing_file_loads_fresh_store() {
        let dir = TempDir::new().unwrap();
        let storage = JsonStorage::new(dir.path().join("tasks.json"));
        let data = storage.load_in_week(&week()).unwrap();
        assert!(data.is_empty());
        assert!(data.has_basket("2026-01-19"));
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = TempDir::new().unwrap();
        let storage = JsonStorage::new(dir.path().join("nested").join("tasks.json"));
        let mut data = TodoData::new_for_week(&week());
        let mut parent = Task::with_id("p", "Parent").with_description("notes");
        parent.add_child(Task::with_id("c", "Child").with_completed(true));
        data.add_task("Later", parent, None).unwrap();

        storage.save(&data).unwrap();
        let loaded = storage.load_in_week(&week()).unwrap();
        assert_eq!(loaded.to_snapshot(), data.to_snapshot());

        let text = fs::read_to_string(storage.path()).unwrap();
        assert!(text.contains("\n  \"Inbox\": []"));
    }

    #[test]
    fn corrupt_file_is_set_aside() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tasks.json");
        fs::write(&path, "{ not json").unwrap();
        let storage = JsonStorage::new(&path);

        let data = storage.load_in_week(&week()).unwrap();
        assert!(data.is_empty());
        assert!(!path.exists());
        assert_eq!(
            fs::read_to_string(dir.path().join("tasks.json.backup")).unwrap(),
            "{ not json"
        );
        let log = fs::read_to_string(dir.path().join("recovery.log")).unwrap();
        assert!(log.contains("corrupt: data file could not be parsed"));
    }

    #[test]
    fn invalid_utf8_is_set_aside() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tasks.json");
        fs::write(&path, b"{\"Inbox\": [\xff\xfe]}").unwrap();
        let storage = JsonStorage::new(&path);

        let data = storage.load_in_week(&week()).unwrap();
        assert!(data.is_empty());
        assert!(!path.exists());
        assert_eq!(
            fs::read(dir.path().join("tasks.json.backup")).unwrap(),
            b"{\"Inbox\": [\xff\xfe]}".to_vec()
        );
        let log = fs::read_to_string(dir.path().join("recovery.log")).unwrap();
        assert!(log.contains("corrupt: data file could not be parsed"));
    }

    #[test]
    fn wrong_shape_counts_as_corrupt() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tasks.json");
        fs::write(&path, r#"{"Inbox": [{"title": "no id"}]}"#).unwrap();
        let data = JsonStorage::new(&path).load_in_week(&week()).unwrap();
        assert!(data.is_empty());
        assert!(dir.path().join("tasks.json.backup").exists());
    }

    #[test]
    fn backup_copies_existing_file() {
        let dir = TempDir::new().unwrap();
        let storage = JsonStorage::new(dir.path().join("tasks.json"));
        assert!(!storage.backup().unwrap());
        storage.save(&TodoData::new_for_week(&week())).unwrap();
        assert!(storage.backup().unwrap());
        assert!(storage.backup_path().exists());
        assert!(storage.path().exists());
    }

    #[test]
    fn failed_save_keeps_old_file_and_logs_payload() {
        let dir = TempDir::new().unwrap();
        // a directory where the file should be makes the rename fail
        let path = dir.path().join("tasks.json");
        fs::create_dir(&path).unwrap();
        let storage = JsonStorage::new(&path);

        let mut data = TodoData::new_for_week(&week());
        data.add_task("Inbox", Task::with_id("x", "Keep me"), None)
            .unwrap();
        assert!(storage.save(&data).is_err());
        assert!(path.is_dir());
        let log = fs::read_to_string(dir.path().join("recovery.log")).unwrap();
        assert!(log.contains("write: tasks could not be saved"));
        assert!(log.contains("Keep me"));
    }

    #[test]
    fn memory_storage_records_saves() {
        let storage = MemoryStorage::new();
        let data = TodoData::new_for_week(&week());
        storage.save(&data).unwrap();
        assert_eq!(storage.save_count(), 1);
        storage.set_failing(true);
        assert!(storage.save(&data).is_err());
        assert_eq!(storage.save_count(), 1);
    }
}
