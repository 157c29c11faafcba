//! In-process store backed by a concurrent map.

use dashmap::DashMap;

use super::{KeyValueStore, StoreError};

/// A store living in memory, shareable across threads and instances.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).map(|entry| entry.value().clone()))
    }

    fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        self.entries.insert(key.to_owned(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_is_none() {
        let store = MemoryStore::new();
        assert_eq!(store.get("nope").unwrap(), None);
    }

    #[test]
    fn set_get_remove() {
        let store = MemoryStore::new();
        store.set("theme", "\"dark\"".into()).unwrap();
        assert_eq!(store.get("theme").unwrap().as_deref(), Some("\"dark\""));

        store.set("theme", "\"light\"".into()).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("theme").unwrap().as_deref(), Some("\"light\""));

        store.remove("theme").unwrap();
        store.remove("theme").unwrap();
        assert!(store.is_empty());
    }
}
