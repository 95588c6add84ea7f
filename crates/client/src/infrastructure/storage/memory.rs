//! Process-local storage for tests and the `test` environment.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::infrastructure::ports::StorageProvider;

/// Storage that lives as long as the process. Clones share contents.
#[derive(Clone, Default)]
pub struct MemoryStorageProvider {
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryStorageProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl StorageProvider for MemoryStorageProvider {
    fn save(&self, key: &str, value: &str) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
    }

    fn load(&self, key: &str) -> Option<String> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn remove(&self, key: &str) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }
}
