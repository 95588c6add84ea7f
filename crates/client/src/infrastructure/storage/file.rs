//! File-backed durable storage.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use directories::ProjectDirs;

use crate::infrastructure::ports::StorageProvider;

static TMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// Durable key/value storage in a JSON file.
///
/// Stored at:
/// - Linux: ~/.config/compass/storage.json
/// - macOS: ~/Library/Application Support/io.questbound.compass/storage.json
/// - Windows: C:\Users\<User>\AppData\Roaming\questbound\compass\config\storage.json
///
/// Every write rewrites the file through a temporary sibling so a crash
/// mid-write leaves the previous contents intact.
#[derive(Clone)]
pub struct FileStorageProvider {
    storage_path: PathBuf,
    cache: Arc<RwLock<HashMap<String, String>>>,
}

impl FileStorageProvider {
    /// Storage in the platform config directory, falling back to the
    /// working directory when no home directory is known.
    pub fn in_config_dir() -> Self {
        let storage_path = match ProjectDirs::from("io", "questbound", "compass") {
            Some(dirs) => dirs.config_dir().join("storage.json"),
            None => PathBuf::from("compass_storage.json"),
        };
        Self::at_path(storage_path)
    }

    /// Storage at an explicit path. Existing contents are loaded eagerly.
    pub fn at_path(storage_path: impl Into<PathBuf>) -> Self {
        let storage_path = storage_path.into();
        let cache = read_existing(&storage_path);

        tracing::debug!(path = ?storage_path, entries = cache.len(), "Durable storage initialized");

        Self {
            storage_path,
            cache: Arc::new(RwLock::new(cache)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.storage_path
    }

    /// Write `entries` to disk. Callers hold the cache write guard, so
    /// snapshots reach the file in the order they were taken.
    fn persist(&self, entries: &HashMap<String, String>) {
        if let Some(parent) = self.storage_path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                tracing::error!(error = %e, "Failed to create storage directory");
                return;
            }
        }

        let data = match serde_json::to_string_pretty(entries) {
            Ok(data) => data,
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize storage data");
                return;
            }
        };

        let tmp_path = self.tmp_path();
        if let Err(e) = fs::write(&tmp_path, data) {
            tracing::error!(error = %e, "Failed to write storage file");
            return;
        }
        if let Err(e) = fs::rename(&tmp_path, &self.storage_path) {
            tracing::error!(error = %e, "Failed to replace storage file");
            let _ = fs::remove_file(&tmp_path);
        }
    }

    fn tmp_path(&self) -> PathBuf {
        let seq = TMP_SEQ.fetch_add(1, Ordering::Relaxed);
        let mut name = self
            .storage_path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(format!(".{}.{seq}.tmp", std::process::id()));
        self.storage_path.with_file_name(name)
    }
}

fn read_existing(path: &Path) -> HashMap<String, String> {
    if !path.exists() {
        return HashMap::new();
    }

    match fs::read_to_string(path) {
        Ok(data) => match serde_json::from_str::<HashMap<String, String>>(&data) {
            Ok(map) => map,
            Err(e) => {
                tracing::warn!(error = %e, "Storage file is corrupt, starting empty");
                HashMap::new()
            }
        },
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read storage file");
            HashMap::new()
        }
    }
}

impl StorageProvider for FileStorageProvider {
    fn save(&self, key: &str, value: &str) {
        match self.cache.write() {
            Ok(mut guard) => {
                guard.insert(key.to_string(), value.to_string());
                self.persist(&guard);
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to acquire write lock for storage");
            }
        }
    }

    fn load(&self, key: &str) -> Option<String> {
        match self.cache.read() {
            Ok(guard) => guard.get(key).cloned(),
            Err(e) => {
                tracing::error!(error = %e, "Failed to acquire read lock for storage");
                None
            }
        }
    }

    fn remove(&self, key: &str) {
        match self.cache.write() {
            Ok(mut guard) => {
                if guard.remove(key).is_some() {
                    self.persist(&guard);
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to acquire write lock for storage");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_survive_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("storage.json");

        let storage = FileStorageProvider::at_path(&path);
        storage.save("compass_last_logged_in_username", "megan");
        storage.save("scratch", "1");
        storage.remove("scratch");

        let reopened = FileStorageProvider::at_path(&path);
        assert_eq!(
            reopened.load("compass_last_logged_in_username").as_deref(),
            Some("megan")
        );
        assert_eq!(reopened.load("scratch"), None);
    }

    #[test]
    fn corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("storage.json");
        fs::write(&path, "{not json").expect("write");

        let storage = FileStorageProvider::at_path(&path);
        assert_eq!(storage.load("anything"), None);

        storage.save("key", "value");
        let reopened = FileStorageProvider::at_path(&path);
        assert_eq!(reopened.load("key").as_deref(), Some("value"));
    }

    #[test]
    fn concurrent_writers_do_not_lose_updates() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("storage.json");
        let storage = FileStorageProvider::at_path(&path);

        std::thread::scope(|scope| {
            for i in 0..32 {
                let storage = storage.clone();
                scope.spawn(move || storage.save(&format!("flag:{i}"), "true"));
            }
        });

        let reopened = FileStorageProvider::at_path(&path);
        for i in 0..32 {
            assert_eq!(reopened.load(&format!("flag:{i}")).as_deref(), Some("true"), "flag:{i}");
        }
        let leftovers = fs::read_dir(dir.path()).expect("read_dir").count();
        assert_eq!(leftovers, 1);
    }
}
