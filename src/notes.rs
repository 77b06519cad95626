use anyhow::{Context, Result};

use crate::storage::{SharedStore, NOTES_KEY};

/// Free-form study notes kept next to the session history.
#[derive(Clone)]
pub struct NotesStore {
    store: SharedStore,
}

impl NotesStore {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    pub fn load(&self) -> Result<String> {
        Ok(self
            .store
            .get(NOTES_KEY)
            .context("failed to read notes")?
            .unwrap_or_default())
    }

    pub fn save(&self, notes: &str) -> Result<()> {
        self.store.set(NOTES_KEY, notes).context("failed to save notes")
    }

    /// Adds `line` on its own line and returns the updated notes.
    pub fn append(&self, line: &str) -> Result<String> {
        let mut notes = self.load()?;
        if !notes.is_empty() && !notes.ends_with('\n') {
            notes.push('\n');
        }
        notes.push_str(line.trim_end());
        self.save(&notes)?;
        Ok(notes)
    }

    pub fn clear(&self) -> Result<()> {
        self.save("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{KeyValueStore, MemoryStore, SESSIONS_KEY};
    use std::sync::Arc;

    #[test]
    fn test_append_and_clear() {
        let store = Arc::new(MemoryStore::new());
        let notes = NotesStore::new(store.clone());
        assert_eq!(notes.load().unwrap(), "");

        notes.append("mitochondria").unwrap();
        let all = notes.append("ribosomes  ").unwrap();
        assert_eq!(all, "mitochondria\nribosomes");

        notes.clear().unwrap();
        assert_eq!(notes.load().unwrap(), "");
        assert_eq!(store.get(SESSIONS_KEY).unwrap(), None);
    }
}
