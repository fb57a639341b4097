//! Token Ledger: fungible token bookkeeping over a key-value world state
//!
//! This crate provides the account-and-allowance state machine of a
//! fungible token, written against a host store that offers only single-key
//! get and put:
//! - Token metadata singleton and per-identity account records
//! - Init, account creation, mint, burn, transfer, approve, transfer-from
//! - Documented partial-failure behaviour and an audit to detect it
//! - String-argument invocation dispatch
//! - In-memory, JSON-file, MVCC-simulating and failure-injecting stores
//!
//! # Example
//!
//! ```rust
//! use token_ledger::store::MemoryWorldState;
//! use token_ledger::token::TokenLedger;
//!
//! let mut ledger = TokenLedger::new(MemoryWorldState::new());
//! ledger.init_ledger("TOK", "Tok", 1000.0, "admin1").unwrap();
//! ledger.burn_tokens("admin1", 100.0).unwrap();
//!
//! assert_eq!(ledger.get_balance("admin1").unwrap(), 900.0);
//! // burning leaves the recorded total supply alone
//! assert_eq!(ledger.token_metadata().unwrap().total_supply, 1000.0);
//! ```

pub mod cli;
pub mod store;
pub mod token;

// Re-export commonly used types
pub use store::{FileStoreConfig, FileWorldState, MemoryWorldState, StoreError, WorldState};
pub use token::{
    AccountRecord, LedgerError, Response, TokenContract, TokenLedger, TokenMetadata, TOKEN_KEY,
};
