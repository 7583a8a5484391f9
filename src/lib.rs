//! An account ledger engine: account storage, password authentication and
//! atomic money movement (deposit, withdraw, transfer) over a crash-safe store.
//!
//! ```no_run
//! use ledger_engine::{Cents, JsonFileStore, Ledger};
//!
//! let ledger = Ledger::open(JsonFileStore::new("accounts.json"));
//! ledger.create_account("alice", "secret1")?;
//! ledger.deposit("alice", Cents::parse("100")?)?;
//! # Ok::<(), ledger_engine::Error>(())
//! ```

mod engine;

pub use engine::{
    Account, AccountId, AccountSnapshot, Accounts, Cents, Error, JsonFileStore, Ledger,
    LedgerStore, LoadWarning, Loaded, MemoryStore, PasswordPolicy, Token,
    DEFAULT_MIN_PASSWORD_LENGTH,
};
