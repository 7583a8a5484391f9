use crate::engine::money::Cents;

/// Top-level error type for the ledger engine.
///
/// Every rejected operation leaves the ledger exactly as it was before the call.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Account {id} already exists")]
    AlreadyExists { id: String },

    #[error("Password must be at least {min_length} characters long")]
    WeakPassword { min_length: usize },

    #[error("Account {id} not found")]
    NotFound { id: String },

    #[error("Incorrect username or password")]
    BadCredentials,

    #[error("Invalid amount: {input}")]
    InvalidAmount { input: String },

    #[error("Insufficient funds: account {id} has {available}, requested {requested}")]
    InsufficientFunds {
        id: String,
        available: Cents,
        requested: Cents,
    },

    #[error("Recipient account {id} not found")]
    RecipientNotFound { id: String },

    #[error("Account {id} cannot transfer to itself")]
    SelfTransfer { id: String },

    #[error("Invalid account id: {input:?}")]
    InvalidAccountId { input: String },

    #[error("Balance of account {id} would overflow")]
    BalanceOverflow { id: String },

    #[error("Storage corrupt: {0}")]
    StorageCorrupt(String),

    #[error("Storage IO error: {0}")]
    StorageIo(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Credential error: {0}")]
    Credential(String),
}

impl Error {
    /// Whether the failure comes from the storage layer rather than from the request itself.
    pub fn is_storage(&self) -> bool {
        matches!(self, Error::StorageCorrupt(_) | Error::StorageIo(_))
    }

    pub(crate) fn invalid_amount(input: impl std::fmt::Display) -> Self {
        Error::InvalidAmount {
            input: input.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_errors_are_flagged() {
        let io = Error::from(std::io::Error::other("disk full"));
        assert!(io.is_storage());
        assert!(Error::StorageCorrupt("bad json".into()).is_storage());
        assert!(!Error::BadCredentials.is_storage());
    }

    #[test]
    fn test_insufficient_funds_message_uses_money_format() {
        let err = Error::InsufficientFunds {
            id: "alice".into(),
            available: Cents::new(1050),
            requested: Cents::new(2000),
        };
        assert_eq!(
            err.to_string(),
            "Insufficient funds: account alice has 10.50, requested 20.00"
        );
    }
}
