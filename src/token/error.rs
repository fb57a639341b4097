//! Ledger error taxonomy

use crate::store::StoreError;
use std::fmt;
use thiserror::Error;

/// Which required record was absent
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Missing {
    User,
    Owner,
    Spender,
    Sender,
    Token,
}

impl fmt::Display for Missing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let what = match self {
            Missing::User => "user",
            Missing::Owner => "owner",
            Missing::Spender => "spender",
            Missing::Sender => "sender",
            Missing::Token => "token",
        };
        f.write_str(what)
    }
}

/// Ledger operation errors
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Failed to read {key} from world state: {source}")]
    StoreRead { key: String, source: StoreError },
    #[error("Failed to write {key} to world state: {source}")]
    StoreWrite { key: String, source: StoreError },
    #[error("{0} not found: {1}")]
    NotFound(Missing, String),
    #[error("Token already initialized")]
    AlreadyInitialized,
    #[error("User already exists: {0}")]
    UserAlreadyExists(String),
    #[error("Only the token admin can mint: {caller} is not the admin")]
    Unauthorized { caller: String },
    #[error("Insufficient balance: have {have}, need {need}")]
    InsufficientBalance { have: f64, need: f64 },
    #[error("Spender allowance exceeded or not approved: have {have:?}, need {need}")]
    AllowanceExceeded { have: Option<f64>, need: f64 },
    #[error("Invalid amount: {0} (must be finite and non-negative)")]
    InvalidAmount(f64),
    #[error("Reserved identity: {0} names the token metadata record")]
    ReservedIdentity(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Coarse classification of [`LedgerError`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    StoreReadFailure,
    StoreWriteFailure,
    NotFound,
    AlreadyExists,
    Unauthorized,
    InsufficientBalance,
    AllowanceExceeded,
    InvalidArgument,
    SerializationFailure,
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::StoreRead { .. } => ErrorKind::StoreReadFailure,
            LedgerError::StoreWrite { .. } => ErrorKind::StoreWriteFailure,
            LedgerError::NotFound(..) => ErrorKind::NotFound,
            LedgerError::AlreadyInitialized | LedgerError::UserAlreadyExists(_) => {
                ErrorKind::AlreadyExists
            }
            LedgerError::Unauthorized { .. } => ErrorKind::Unauthorized,
            LedgerError::InsufficientBalance { .. } => ErrorKind::InsufficientBalance,
            LedgerError::AllowanceExceeded { .. } => ErrorKind::AllowanceExceeded,
            LedgerError::InvalidAmount(_) | LedgerError::ReservedIdentity(_) => {
                ErrorKind::InvalidArgument
            }
            LedgerError::Serialization(_) => ErrorKind::SerializationFailure,
        }
    }

    /// The missing-record subtype, if this is a not-found error
    pub fn missing(&self) -> Option<Missing> {
        match self {
            LedgerError::NotFound(what, _) => Some(*what),
            _ => None,
        }
    }
}
