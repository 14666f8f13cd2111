//! JSON file store: one human-readable document, replaced atomically.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::debug;
use uuid::Uuid;

use crate::model::RosterDocument;

use super::{Result, RunLock, StateStore, StorageError};

/// Roster document stored as pretty-printed JSON at a fixed path.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Takes the single-writer lock for this file, tagged with `run_id`.
    pub fn lock(&self, run_id: Uuid) -> Result<RunLock> {
        let mut lock_path = self.path.clone().into_os_string();
        lock_path.push(".lock");
        self.ensure_parent()?;
        RunLock::acquire(PathBuf::from(lock_path), run_id)
    }

    fn ensure_parent(&self) -> Result<()> {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => {
                fs::create_dir_all(parent).map_err(|source| StorageError::Io {
                    path: parent.to_path_buf(),
                    source,
                })
            }
            _ => Ok(()),
        }
    }

    fn io_error(&self, source: io::Error) -> StorageError {
        StorageError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl StateStore for JsonFileStore {
    fn read(&self) -> Result<Option<RosterDocument>> {
        let json = match fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_error(e)),
        };

        let doc = serde_json::from_str(&json).map_err(|source| StorageError::Corrupt {
            path: self.path.clone(),
            source,
        })?;
        Ok(Some(doc))
    }

    /// Writes a uniquely named sibling temp file, syncs it, then renames it
    /// over the document. Readers see the old or the new file, never a mix.
    fn save(&self, doc: &RosterDocument) -> Result<()> {
        self.ensure_parent()?;

        let mut json = serde_json::to_string_pretty(doc)?;
        json.push('\n');

        let mut temp = self.path.clone().into_os_string();
        temp.push(format!(".{}.tmp", Uuid::new_v4().simple()));
        let temp = PathBuf::from(temp);

        let written = File::create(&temp)
            .and_then(|mut file| {
                file.write_all(json.as_bytes())?;
                file.sync_all()
            })
            .and_then(|()| fs::rename(&temp, &self.path));

        if let Err(e) = written {
            let _ = fs::remove_file(&temp);
            return Err(self.io_error(e));
        }

        debug!(path = %self.path.display(), "saved roster document");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use jiff::civil::date;
    use tempfile::TempDir;

    use crate::model::{Fields, TargetState};
    use crate::testing::sample_registry;

    fn test_store() -> (TempDir, JsonFileStore) {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path().join("nested").join("state.json"));
        (dir, store)
    }

    #[test]
    fn load_without_file_is_fully_populated_default() {
        let (_dir, store) = test_store();
        let doc = store.load(&sample_registry(&["A", "B"])).unwrap();

        assert_eq!(doc.total, 2);
        assert_eq!(doc.targets["A"], TargetState::default());
        assert_eq!(doc.targets["B"], TargetState::default());
    }

    #[test]
    fn save_and_load_round_trip() {
        let (_dir, store) = test_store();
        let registry = sample_registry(&["A"]);
        let mut doc = store.load(&registry).unwrap();
        let mut fields = Fields::new();
        fields.insert("times".into(), "5".into());
        doc.state_mut("A").record_success(date(2024, 1, 1), fields);
        doc.active = vec!["A".into()];

        store.save(&doc).unwrap();
        let loaded = store.load(&registry).unwrap();

        assert_eq!(loaded, doc);
    }

    #[test]
    fn save_is_idempotent_and_leaves_no_temp_files() {
        let (dir, store) = test_store();
        let doc = RosterDocument::for_registry(&sample_registry(&["A"]));

        store.save(&doc).unwrap();
        store.save(&doc).unwrap();

        let entries: Vec<_> = fs::read_dir(dir.path().join("nested"))
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(entries, vec!["state.json"]);
        assert_eq!(store.read().unwrap(), Some(doc));
    }

    #[test]
    fn save_under_a_file_is_an_io_error() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("blocker"), "").unwrap();
        let store = JsonFileStore::new(dir.path().join("blocker").join("state.json"));

        let err = store.save(&RosterDocument::default()).unwrap_err();
        assert!(matches!(err, StorageError::Io { .. }));
    }

    #[test]
    fn failed_replace_removes_temp_file() {
        let (dir, store) = test_store();
        // A directory in the way makes the final rename fail.
        fs::create_dir_all(store.path()).unwrap();

        let err = store.save(&RosterDocument::default()).unwrap_err();

        assert!(matches!(err, StorageError::Io { ref path, .. } if path == store.path()));
        let entries: Vec<_> = fs::read_dir(dir.path().join("nested"))
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(entries, vec!["state.json"]);
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let (_dir, store) = test_store();
        fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        fs::write(store.path(), "{ not json").unwrap();

        let err = store.load(&sample_registry(&["A"])).unwrap_err();
        assert!(matches!(err, StorageError::Corrupt { .. }));
    }

    #[test]
    fn hand_edited_file_is_backfilled() {
        let (_dir, store) = test_store();
        fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        fs::write(
            store.path(),
            r#"{"targets": {"A": {"last_processed_date": "2024-01-01", "fields": {"times": 3}}}}"#,
        )
        .unwrap();

        let doc = store.load(&sample_registry(&["A", "B"])).unwrap();

        assert_eq!(doc.total, 2);
        assert_eq!(doc.targets["A"].last_processed_date, Some(date(2024, 1, 1)));
        assert_eq!(doc.targets["A"].fields["times"].to_string(), "3");
        assert_eq!(doc.targets["B"], TargetState::default());
    }

    #[test]
    fn lock_sits_next_to_state_file() {
        let (dir, store) = test_store();
        let lock = store.lock(Uuid::new_v4()).unwrap();

        assert_eq!(lock.path(), dir.path().join("nested").join("state.json.lock"));
        assert!(matches!(
            store.lock(Uuid::new_v4()),
            Err(StorageError::Locked(_))
        ));
        drop(lock);
        store.lock(Uuid::new_v4()).unwrap();
    }
}
