//! Failure injection around a world state
//!
//! Wraps any [`WorldState`] and makes selected reads or writes fail, so the
//! partially-applied states left by a write failure mid-operation can be
//! observed.

use crate::store::world_state::{StoreError, WorldState};
use std::collections::HashSet;

/// A world state that fails on demand
#[derive(Debug)]
pub struct FaultyWorldState<S> {
    inner: S,
    /// Fail the Nth put (0-based, counted across all keys)
    fail_put_at: Option<usize>,
    /// Keys whose puts always fail
    fail_put_keys: HashSet<String>,
    /// Keys whose gets always fail
    fail_get_keys: HashSet<String>,
    puts: usize,
}

impl<S: WorldState> FaultyWorldState<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            fail_put_at: None,
            fail_put_keys: HashSet::new(),
            fail_get_keys: HashSet::new(),
            puts: 0,
        }
    }

    /// Fail the `n`th put issued through this wrapper
    pub fn fail_put_at(mut self, n: usize) -> Self {
        self.fail_put_at = Some(n);
        self
    }

    pub fn fail_puts_to(mut self, key: &str) -> Self {
        self.fail_put_keys.insert(key.to_string());
        self
    }

    pub fn fail_gets_of(mut self, key: &str) -> Self {
        self.fail_get_keys.insert(key.to_string());
        self
    }

    /// Number of puts attempted so far, including failed ones
    pub fn puts_attempted(&self) -> usize {
        self.puts
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: WorldState> WorldState for FaultyWorldState<S> {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        if self.fail_get_keys.contains(key) {
            return Err(StoreError::Unavailable(format!("injected read failure on {}", key)));
        }
        self.inner.get(key)
    }

    fn put(&mut self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        let n = self.puts;
        self.puts += 1;

        if self.fail_put_at == Some(n) || self.fail_put_keys.contains(key) {
            return Err(StoreError::Unavailable(format!("injected write failure on {}", key)));
        }
        self.inner.put(key, value)
    }
}
