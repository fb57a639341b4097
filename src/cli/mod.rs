//! Command-line host for the token ledger

pub mod commands;

pub use commands::*;
