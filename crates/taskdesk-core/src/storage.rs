use std::collections::BTreeMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, warn};

use taskdesk_shared::{Storage, StorageError};

type Entries = BTreeMap<String, String>;

/// Session storage backed by one JSON object on disk.
///
/// Every write replaces the file atomically, so the token pair and the
/// cached user always change together.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Entries, StorageError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Entries::new()),
            Err(err) => {
                return Err(StorageError::Unavailable(format!(
                    "{}: {err}",
                    self.path.display()
                )));
            }
        };

        if text.trim().is_empty() {
            return Ok(Entries::new());
        }

        match serde_json::from_str(&text) {
            Ok(entries) => Ok(entries),
            Err(err) => {
                warn!(
                    file = %self.path.display(),
                    error = %err,
                    "session file is corrupt; starting from an empty session"
                );
                Ok(Entries::new())
            }
        }
    }

    #[tracing::instrument(skip(self, entries), fields(file = %self.path.display(), count = entries.len()))]
    fn save(&self, entries: &Entries) -> Result<(), StorageError> {
        let dir = self
            .path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir)
            .map_err(|err| StorageError::Write(format!("{}: {err}", dir.display())))?;

        let serialized = serde_json::to_string_pretty(entries)
            .map_err(|err| StorageError::Encode(err.to_string()))?;

        let mut temp = NamedTempFile::new_in(dir)
            .map_err(|err| StorageError::Write(format!("{}: {err}", dir.display())))?;
        temp.write_all(serialized.as_bytes())
            .and_then(|()| temp.flush())
            .map_err(|err| StorageError::Write(err.to_string()))?;
        temp.persist(&self.path).map_err(|err| {
            StorageError::Write(format!("failed to persist {}: {err}", self.path.display()))
        })?;

        debug!("session file written");
        Ok(())
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        match self.load() {
            Ok(mut entries) => entries.remove(key),
            Err(err) => {
                warn!(error = %err, key, "failed reading session file");
                None
            }
        }
    }

    fn set_many(&self, entries: &[(&str, &str)]) -> Result<(), StorageError> {
        let mut current = self.load()?;
        for (key, value) in entries {
            current.insert((*key).to_string(), (*value).to_string());
        }
        self.save(&current)
    }

    fn remove_many(&self, keys: &[&str]) -> Result<(), StorageError> {
        let mut current = self.load()?;
        let before = current.len();
        for key in keys {
            current.remove(*key);
        }
        if current.len() == before && !self.path.exists() {
            return Ok(());
        }
        self.save(&current)
    }
}

#[cfg(test)]
mod storage_tests {
    use taskdesk_shared::SessionStore;
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn missing_file_reads_as_empty() {
        let temp = tempdir().expect("tempdir");
        let storage = FileStorage::new(temp.path().join("session.json"));

        assert_eq!(storage.get("access"), None);
        storage.remove_many(&["access"]).expect("remove");
        assert!(!storage.path().exists());
    }

    #[test]
    fn session_survives_a_new_handle() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("nested").join("session.json");

        let session = SessionStore::new(FileStorage::new(&path));
        session.save_tokens("a1", "r1").expect("save");

        let reopened = SessionStore::new(FileStorage::new(&path));
        assert_eq!(reopened.token().as_deref(), Some("a1"));
        assert_eq!(reopened.refresh_token().as_deref(), Some("r1"));

        reopened.logout().expect("logout");
        assert!(!SessionStore::new(FileStorage::new(&path)).is_authenticated());
    }

    #[test]
    fn corrupt_file_is_treated_as_logged_out() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("session.json");
        fs::write(&path, "{not json").expect("write");

        let storage = FileStorage::new(&path);
        assert_eq!(storage.get("access"), None);

        storage.set("access", "fresh").expect("overwrite");
        assert_eq!(storage.get("access").as_deref(), Some("fresh"));
    }
}
