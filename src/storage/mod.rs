//! Durable key-value storage shared by the session ledger and notes.

use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use anyhow::Result;

mod file;
mod migrations;
mod sqlite;

pub use file::JsonFileStore;
pub use sqlite::SqliteStore;

pub const SESSIONS_KEY: &str = "study-sessions";
pub const NOTES_KEY: &str = "study-notes";

/// String values under fixed keys. `set` replaces the whole value.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

pub type SharedStore = Arc<dyn KeyValueStore>;

#[derive(Default)]
pub struct MemoryStore {
    data: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(key: &str, value: &str) -> Self {
        let store = Self::new();
        store
            .data
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(key.to_string(), value.to_string());
        store
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let guard = self.data.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(guard.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut guard = self.data.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        guard.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_overwrites() {
        let store = MemoryStore::with_entry(NOTES_KEY, "first");
        assert_eq!(store.get(NOTES_KEY).unwrap().as_deref(), Some("first"));
        store.set(NOTES_KEY, "second").unwrap();
        assert_eq!(store.get(NOTES_KEY).unwrap().as_deref(), Some("second"));
        assert_eq!(store.get(SESSIONS_KEY).unwrap(), None);
    }
}
