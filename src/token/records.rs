//! Ledger records and their world-state encoding
//!
//! Two record kinds share one key space: the token metadata singleton under
//! [`TOKEN_KEY`] and one account record per identity, keyed by the identity
//! itself. Records are stored as JSON objects with camelCase field names.

use crate::token::error::LedgerError;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Well-known key of the token metadata record
pub const TOKEN_KEY: &str = "TOKEN";

/// Token metadata (one per ledger)
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TokenMetadata {
    /// Token symbol (e.g., "TOK")
    pub symbol: String,
    /// Display name
    pub name: String,
    /// Increased only by minting
    pub total_supply: f64,
    /// The only identity allowed to mint
    pub admin: String,
}

/// Per-identity account state
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct AccountRecord {
    /// Owning identity (empty on records created implicitly by older writers)
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub balance: f64,
    /// Spender identity -> approved amount
    #[serde(
        default,
        alias = "allownaces",
        deserialize_with = "null_as_empty"
    )]
    pub allowances: BTreeMap<String, f64>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<BTreeMap<String, f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<BTreeMap<String, f64>>::deserialize(deserializer)?.unwrap_or_default())
}

impl AccountRecord {
    /// A fresh zero-balance account with no allowances
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            balance: 0.0,
            allowances: BTreeMap::new(),
        }
    }

    /// Approved amount for `spender`, if an entry exists
    pub fn allowance(&self, spender: &str) -> Option<f64> {
        self.allowances.get(spender).copied()
    }

    /// Add to the allowance entry for `spender`, creating it at zero first
    pub fn add_allowance(&mut self, spender: &str, amount: f64) {
        *self.allowances.entry(spender.to_string()).or_insert(0.0) += amount;
    }
}

/// Serialize a record for the world state
pub fn encode<T: Serialize>(record: &T) -> Result<Vec<u8>, LedgerError> {
    Ok(serde_json::to_vec(record)?)
}

/// Deserialize a record read from the world state
pub fn decode<'a, T: Deserialize<'a>>(bytes: &'a [u8]) -> Result<T, LedgerError> {
    Ok(serde_json::from_slice(bytes)?)
}
