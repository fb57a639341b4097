//! World-state contract consumed by the ledger
//!
//! The execution host exposes a flat key space of opaque byte values with
//! single-key reads and writes only. There is no multi-key commit and no
//! server-side invariant checking.

use std::collections::BTreeMap;
use std::io;
use thiserror::Error;

/// Storage errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Store unavailable: {0}")]
    Unavailable(String),
    #[error("Invalid data: {0}")]
    InvalidData(String),
    #[error("Read conflict on key {key}: version changed since read")]
    Conflict { key: String },
}

/// Single-key access to the host's world state.
///
/// `get` returns `Ok(None)` for a key that was never written; only a failure
/// of the host itself is an error.
pub trait WorldState {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    fn put(&mut self, key: &str, value: Vec<u8>) -> Result<(), StoreError>;
}

impl<T: WorldState + ?Sized> WorldState for &mut T {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        (**self).get(key)
    }

    fn put(&mut self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        (**self).put(key, value)
    }
}

/// A stored value together with its write version
#[derive(Clone, Debug, PartialEq)]
pub struct VersionedValue {
    pub value: Vec<u8>,
    pub version: u64,
}

/// In-process versioned key-value store.
///
/// Every put bumps the key's version, starting at 1 for the first write.
#[derive(Clone, Debug, Default)]
pub struct MemoryWorldState {
    entries: BTreeMap<String, VersionedValue>,
}

impl MemoryWorldState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current version of a key (0 if never written)
    pub fn version(&self, key: &str) -> u64 {
        self.entries.get(key).map(|e| e.version).unwrap_or(0)
    }

    /// All keys in ascending order
    pub fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over entries in key order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &VersionedValue)> {
        self.entries.iter()
    }

    /// Insert an entry with a known version, as loaded from disk
    pub fn restore(&mut self, key: String, entry: VersionedValue) {
        self.entries.insert(key, entry);
    }
}

impl WorldState for MemoryWorldState {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.entries.get(key).map(|e| e.value.clone()))
    }

    fn put(&mut self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        let version = self.version(key) + 1;
        self.entries
            .insert(key.to_string(), VersionedValue { value, version });
        Ok(())
    }
}
