// CVAS Session
// Copyright (C) 2025 Synerthink

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Durable key/value records

use super::write_owner_only;
use crate::error::{SessionError, SessionResult};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Durable string storage keyed by name
pub trait DurableStore: Send + Sync {
    fn get_item(&self, key: &str) -> SessionResult<Option<String>>;

    fn set_item(&self, key: &str, value: &str) -> SessionResult<()>;

    /// Removing a missing key is not an error
    fn remove_item(&self, key: &str) -> SessionResult<()>;
}

/// In-memory durable store
#[derive(Default)]
pub struct MemoryStore {
    items: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }
}

impl DurableStore for MemoryStore {
    fn get_item(&self, key: &str) -> SessionResult<Option<String>> {
        Ok(self.items.read().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> SessionResult<()> {
        self.items.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> SessionResult<()> {
        self.items.write().remove(key);
        Ok(())
    }
}

/// Durable store keeping one file per key inside a directory
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> SessionResult<PathBuf> {
        let valid = !key.is_empty() && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(SessionError::storage(format!("Invalid storage key: {:?}", key)));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

impl DurableStore for FileStore {
    fn get_item(&self, key: &str) -> SessionResult<Option<String>> {
        match std::fs::read_to_string(self.path_for(key)?) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> SessionResult<()> {
        let path = self.path_for(key)?;
        std::fs::create_dir_all(&self.dir)?;
        write_owner_only(&path, value.as_bytes())
    }

    fn remove_item(&self, key: &str) -> SessionResult<()> {
        match std::fs::remove_file(self.path_for(key)?) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store() {
        let store = MemoryStore::new();
        assert_eq!(store.get_item("cvas_user").unwrap(), None);

        store.set_item("cvas_user", "{}").unwrap();
        assert_eq!(store.get_item("cvas_user").unwrap().as_deref(), Some("{}"));

        store.remove_item("cvas_user").unwrap();
        store.remove_item("cvas_user").unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("records"));

        assert_eq!(store.get_item("cvas_user").unwrap(), None);
        store.set_item("cvas_user", r#"{"name":"Ada"}"#).unwrap();
        assert!(dir.path().join("records/cvas_user.json").exists());

        let reopened = FileStore::new(dir.path().join("records"));
        assert_eq!(reopened.get_item("cvas_user").unwrap().as_deref(), Some(r#"{"name":"Ada"}"#));

        reopened.remove_item("cvas_user").unwrap();
        reopened.remove_item("cvas_user").unwrap();
        assert_eq!(store.get_item("cvas_user").unwrap(), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_file_store_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        store.set_item("cvas_user", "{}").unwrap();
        // Overwriting keeps the mode.
        store.set_item("cvas_user", r#"{"name":"Ada"}"#).unwrap();

        let mode = std::fs::metadata(dir.path().join("cvas_user.json")).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_file_store_rejects_path_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        assert!(store.set_item("../escape", "x").is_err());
        assert!(store.get_item("").is_err());
    }
}
