use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::credential::PasswordHash;
use super::error::Error;
use super::money::Cents;

/// Longest accepted account id, in characters.
const MAX_ID_LENGTH: usize = 64;

/// Unique, immutable account identifier (the username).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountId(String);

impl AccountId {
    /// Validate and build an id. Surrounding whitespace is trimmed.
    pub fn new(input: &str) -> Result<Self, Error> {
        let trimmed = input.trim();
        let valid = !trimmed.is_empty()
            && trimmed.chars().count() <= MAX_ID_LENGTH
            && !trimmed.chars().any(char::is_control);
        if !valid {
            return Err(Error::InvalidAccountId {
                input: input.to_string(),
            });
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for AccountId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        AccountId::new(&value)
    }
}

impl From<AccountId> for String {
    fn from(id: AccountId) -> Self {
        id.0
    }
}

impl Borrow<str> for AccountId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A stored account record, owned exclusively by the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    id: AccountId,
    password_hash: PasswordHash,
    balance: Cents,
}

impl Account {
    pub(super) fn new(id: AccountId, password_hash: PasswordHash) -> Self {
        Self {
            id,
            password_hash,
            balance: Cents::ZERO,
        }
    }

    /// Returns the account id
    pub fn id(&self) -> &AccountId {
        &self.id
    }

    /// Returns the current balance
    pub fn balance(&self) -> Cents {
        self.balance
    }

    pub(super) fn password_hash(&self) -> &PasswordHash {
        &self.password_hash
    }

    /// Credit the account. Fails without touching the balance on overflow.
    pub(super) fn credit(&mut self, amount: Cents) -> Result<Cents, Error> {
        self.balance = self
            .balance
            .checked_add(amount)
            .ok_or_else(|| Error::BalanceOverflow {
                id: self.id.to_string(),
            })?;
        Ok(self.balance)
    }

    /// Debit the account. Fails without touching the balance if funds are short.
    pub(super) fn debit(&mut self, amount: Cents) -> Result<Cents, Error> {
        self.balance =
            self.balance
                .checked_sub(amount)
                .ok_or_else(|| Error::InsufficientFunds {
                    id: self.id.to_string(),
                    available: self.balance,
                    requested: amount,
                })?;
        Ok(self.balance)
    }

    pub fn snapshot(&self) -> AccountSnapshot {
        AccountSnapshot {
            id: self.id.clone(),
            balance: self.balance,
        }
    }
}

/// Read-only copy of an account handed to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    pub id: AccountId,
    pub balance: Cents,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account() -> Account {
        Account::new(
            AccountId::new("alice").unwrap(),
            PasswordHash::new("secret1").unwrap(),
        )
    }

    #[test]
    fn test_new_account_has_zero_balance() {
        assert_eq!(account().balance(), Cents::ZERO);
    }

    #[test]
    fn test_credit_and_debit() {
        let mut account = account();
        assert_eq!(account.credit(Cents::new(100)).unwrap(), Cents::new(100));
        assert_eq!(account.debit(Cents::new(40)).unwrap(), Cents::new(60));
    }

    #[test]
    fn test_debit_beyond_balance_leaves_balance_unchanged() {
        let mut account = account();
        account.credit(Cents::new(50)).unwrap();
        let err = account.debit(Cents::new(51)).unwrap_err();
        assert!(matches!(
            err,
            Error::InsufficientFunds { available, requested, .. }
                if available == Cents::new(50) && requested == Cents::new(51)
        ));
        assert_eq!(account.balance(), Cents::new(50));
    }

    #[test]
    fn test_credit_overflow_leaves_balance_unchanged() {
        let mut account = account();
        account.credit(Cents::new(u64::MAX)).unwrap();
        assert!(matches!(
            account.credit(Cents::new(1)),
            Err(Error::BalanceOverflow { .. })
        ));
        assert_eq!(account.balance(), Cents::new(u64::MAX));
    }

    #[test]
    fn test_account_id_is_trimmed_and_validated() {
        assert_eq!(AccountId::new("  bob ").unwrap().as_str(), "bob");
        assert!(AccountId::new("").is_err());
        assert!(AccountId::new("   ").is_err());
        assert!(AccountId::new("a\nb").is_err());
        assert!(AccountId::new(&"x".repeat(MAX_ID_LENGTH + 1)).is_err());
        assert!(AccountId::new(&"x".repeat(MAX_ID_LENGTH)).is_ok());
    }

    #[test]
    fn test_deserialization_validates_id() {
        let bad: Result<AccountId, _> = serde_json::from_str("\"\"");
        assert!(bad.is_err());
        let good: AccountId = serde_json::from_str("\"carol\"").unwrap();
        assert_eq!(good.as_str(), "carol");
    }

    #[test]
    fn test_debug_output_hides_credential() {
        let rendered = format!("{:?}", account());
        assert!(rendered.contains("<redacted>"));
        assert!(!rendered.contains("argon2"));
    }
}
