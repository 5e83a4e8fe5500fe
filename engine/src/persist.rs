//! Key-value persistence boundary.
//!
//! The engine does no IO of its own. Hosts plug in whatever medium they have
//! (browser storage, a file, a database row) by implementing [`KeyValueStore`].
//! [`MemoryStore`] is the in-process implementation used by tests and hosts
//! that only need a session-lifetime stash.

use crate::error::Result;
use std::collections::HashMap;

/// Text storage addressed by key.
pub trait KeyValueStore {
    /// Read the value stored under `key`.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, overwriting any previous value.
    fn set(&mut self, key: &str, value: String) -> Result<()>;

    /// Remove the value stored under `key`, returning whether one existed.
    fn remove(&mut self, key: &str) -> Result<bool>;
}

/// In-memory key-value store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: String) -> Result<()> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<bool> {
        Ok(self.entries.remove(key).is_some())
    }
}
