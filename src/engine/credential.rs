use std::fmt;

use argon2::{
    password_hash::{PasswordHash as PhcHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use super::account::AccountId;
use super::error::Error;

/// Default minimum password length, in characters.
pub const DEFAULT_MIN_PASSWORD_LENGTH: usize = 6;

/// Number of random bytes behind a token secret.
const TOKEN_BYTES: usize = 32;

/// Rules a new password must satisfy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordPolicy {
    pub min_length: usize,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: DEFAULT_MIN_PASSWORD_LENGTH,
        }
    }
}

impl PasswordPolicy {
    pub fn check(&self, password: &str) -> Result<(), Error> {
        if password.chars().count() < self.min_length {
            return Err(Error::WeakPassword {
                min_length: self.min_length,
            });
        }
        Ok(())
    }
}

/// One-way credential material (an Argon2id PHC string).
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PasswordHash(String);

impl PasswordHash {
    /// Hash a password using Argon2id with a fresh random salt
    pub fn new(password: &str) -> Result<Self, Error> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| Error::Credential(e.to_string()))?
            .to_string();
        Ok(Self(hash))
    }

    /// Check a candidate password. Comparison is constant time inside `argon2`.
    pub fn verify(&self, password: &str) -> bool {
        let Ok(parsed) = PhcHash::new(&self.0) else {
            log::warn!("Stored credential is not a valid PHC string, rejecting login");
            return false;
        };
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }
}

impl fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PasswordHash(<redacted>)")
    }
}

/// Proof of a successful authentication, handed back to the caller.
#[derive(Clone, PartialEq, Eq)]
pub struct Token {
    account_id: AccountId,
    secret: String,
}

impl Token {
    pub(super) fn issue(account_id: AccountId) -> Self {
        let mut bytes = [0u8; TOKEN_BYTES];
        OsRng.fill_bytes(&mut bytes);
        Self {
            account_id,
            secret: hex::encode(bytes),
        }
    }

    /// Returns the authenticated account
    pub fn account_id(&self) -> &AccountId {
        &self.account_id
    }

    /// Returns the opaque, hex encoded token secret
    pub fn secret(&self) -> &str {
        &self.secret
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("account_id", &self.account_id)
            .field("secret", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_counts_characters_not_bytes() {
        let policy = PasswordPolicy::default();
        assert!(policy.check("secret").is_ok());
        assert!(matches!(
            policy.check("short"),
            Err(Error::WeakPassword { min_length: 6 })
        ));
        // 6 chars, 12 bytes
        assert!(policy.check("éééééé").is_ok());
        assert!(policy.check("ééééé").is_err());
    }

    #[test]
    fn test_hash_verifies_only_the_original_password() {
        let hash = PasswordHash::new("secret1").unwrap();
        assert!(hash.verify("secret1"));
        assert!(!hash.verify("secret2"));
        assert!(!hash.verify(""));
    }

    #[test]
    fn test_hash_never_contains_plaintext() {
        let hash = PasswordHash::new("hunter22").unwrap();
        assert!(!hash.0.contains("hunter22"));
        assert!(hash.0.starts_with("$argon2id$"));
    }

    #[test]
    fn test_same_password_hashes_differently() {
        let a = PasswordHash::new("secret1").unwrap();
        let b = PasswordHash::new("secret1").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_garbage_hash_rejects_everything() {
        let hash = PasswordHash("not-a-phc-string".into());
        assert!(!hash.verify("not-a-phc-string"));
    }

    #[test]
    fn test_debug_output_redacts_secrets() {
        let hash = PasswordHash::new("secret1").unwrap();
        assert_eq!(format!("{hash:?}"), "PasswordHash(<redacted>)");

        let token = Token::issue(AccountId::new("alice").unwrap());
        assert_eq!(token.secret().len(), TOKEN_BYTES * 2);
        assert!(!format!("{token:?}").contains(token.secret()));
    }
}
