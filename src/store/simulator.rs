//! Optimistic transaction simulation over a versioned store
//!
//! Models how an execution host runs one invocation: reads go to committed
//! state and record the key's version, writes are buffered, and commit
//! validates that nothing read has since been overwritten (MVCC read-set
//! check). A conflicting invocation is rejected as a whole.

use crate::store::world_state::{MemoryWorldState, StoreError, WorldState};
use std::cell::RefCell;
use std::collections::BTreeMap;

/// One in-flight invocation against a [`MemoryWorldState`]
pub struct TxSimulator<'a> {
    state: &'a MemoryWorldState,
    /// Key -> version observed at first read
    read_set: RefCell<BTreeMap<String, u64>>,
    /// Buffered writes in issue order; last write per key wins
    write_set: Vec<(String, Vec<u8>)>,
}

/// Outcome of a successful commit
#[derive(Debug, Clone, PartialEq)]
pub struct CommitSummary {
    pub keys_read: usize,
    pub keys_written: usize,
}

impl<'a> TxSimulator<'a> {
    pub fn new(state: &'a MemoryWorldState) -> Self {
        Self {
            state,
            read_set: RefCell::new(BTreeMap::new()),
            write_set: Vec::new(),
        }
    }

    /// Keys read so far with the versions observed
    pub fn read_set(&self) -> BTreeMap<String, u64> {
        self.read_set.borrow().clone()
    }

    /// Buffered writes in issue order
    pub fn write_set(&self) -> &[(String, Vec<u8>)] {
        &self.write_set
    }

    /// Validate the read set against `target` and apply the buffered writes.
    ///
    /// `target` is the committed state at commit time, which may have moved
    /// on since this simulation started.
    pub fn commit(self, target: &mut MemoryWorldState) -> Result<CommitSummary, StoreError> {
        let read_set = self.read_set.into_inner();

        for (key, seen) in &read_set {
            if target.version(key) != *seen {
                log::debug!(
                    "MVCC conflict on {}: read v{}, now v{}",
                    key,
                    seen,
                    target.version(key)
                );
                return Err(StoreError::Conflict { key: key.clone() });
            }
        }

        let mut written: BTreeMap<String, Vec<u8>> = BTreeMap::new();
        for (key, value) in self.write_set {
            written.insert(key, value);
        }
        let keys_written = written.len();
        for (key, value) in written {
            target.put(&key, value)?;
        }

        Ok(CommitSummary {
            keys_read: read_set.len(),
            keys_written,
        })
    }
}

impl WorldState for TxSimulator<'_> {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        self.read_set
            .borrow_mut()
            .entry(key.to_string())
            .or_insert_with(|| self.state.version(key));
        self.state.get(key)
    }

    fn put(&mut self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        self.write_set.push((key.to_string(), value));
        Ok(())
    }
}
