//! Ledger engine module.
//!
//! This module contains the core account logic including:
//! - `Ledger` - The account engine enforcing invariants and atomicity
//! - `LedgerStore` - Durable storage (`JsonFileStore`, `MemoryStore`)
//! - `Account` - Account records and read-only snapshots
//! - `Cents` - Integer minor-unit money
//! - `Error` types - Validation and storage errors

mod account;
mod credential;
mod error;
mod ledger;
mod money;
mod store;

pub(crate) use rust_decimal::Decimal;

pub use account::{Account, AccountId, AccountSnapshot};
pub use credential::{PasswordPolicy, Token, DEFAULT_MIN_PASSWORD_LENGTH};
pub use error::Error;
pub use ledger::Ledger;
pub use money::Cents;
pub use store::{Accounts, JsonFileStore, LedgerStore, LoadWarning, Loaded, MemoryStore};
