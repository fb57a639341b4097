//! Fungible token ledger
//!
//! Account-and-allowance bookkeeping over a [`WorldState`](crate::store::WorldState):
//! - Token metadata singleton under the `TOKEN` key
//! - One account record per identity, holding a balance and allowances
//! - Init, account creation, mint, burn, transfer, approve and transfer-from
//!
//! # Example
//!
//! ```rust
//! use token_ledger::store::MemoryWorldState;
//! use token_ledger::token::TokenLedger;
//!
//! let mut ledger = TokenLedger::new(MemoryWorldState::new());
//!
//! ledger.init_ledger("TOK", "Tok", 1000.0, "admin1").unwrap();
//! ledger.mint_tokens("admin1", 500.0).unwrap();
//! ledger.transfer_tokens("admin1", "u1", 300.0).unwrap();
//!
//! assert_eq!(ledger.get_balance("admin1").unwrap(), 1200.0);
//! assert_eq!(ledger.get_balance("u1").unwrap(), 300.0);
//! ```

pub mod audit;
pub mod contract;
pub mod error;
pub mod ledger;
pub mod records;

pub use audit::{audit, AuditReport, Finding};
pub use contract::{Response, TokenContract};
pub use error::{ErrorKind, LedgerError, Missing};
pub use ledger::TokenLedger;
pub use records::{AccountRecord, TokenMetadata, TOKEN_KEY};
