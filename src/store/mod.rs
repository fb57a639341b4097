//! World-state storage
//!
//! The ledger only ever talks to a [`WorldState`]. The other types here are
//! hosts for it: an in-memory versioned store, a JSON-file store for the CLI,
//! an optimistic transaction simulator and a failure-injecting wrapper.

pub mod faulty;
pub mod persistence;
pub mod simulator;
pub mod world_state;

pub use faulty::FaultyWorldState;
pub use persistence::{FileStoreConfig, FileWorldState, StoreStats};
pub use simulator::{CommitSummary, TxSimulator};
pub use world_state::{MemoryWorldState, StoreError, VersionedValue, WorldState};
