use std::io::Write;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Serialize, Serializer};

use super::account::{Account, AccountId, AccountSnapshot};
use super::credential::{PasswordHash, PasswordPolicy, Token};
use super::error::Error;
use super::money::Cents;
use super::store::{Accounts, LedgerStore, LoadWarning};

/// Serialize cents as a human amount with exactly 2 decimal places
fn serialize_money<S: Serializer>(value: &Cents, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&value.to_string())
}

#[derive(Serialize)]
struct BalanceRow<'a> {
    id: &'a str,
    #[serde(serialize_with = "serialize_money")]
    balance: Cents,
}

/// The account engine.
///
/// Owns the in-memory view of every account behind a single lock together with
/// the store it persists to. Every mutation runs validate, apply, save inside
/// one write-locked critical section; if the save fails the applied changes
/// are rolled back before the lock is released, so callers only ever observe
/// states that were also persisted.
#[derive(Debug)]
pub struct Ledger<S: LedgerStore> {
    store: S,
    policy: PasswordPolicy,
    accounts: RwLock<Accounts>,
    load_warning: Option<LoadWarning>,
}

impl<S: LedgerStore> Ledger<S> {
    /// Open a ledger over `store` with the default password policy
    pub fn open(store: S) -> Self {
        Self::open_with_policy(store, PasswordPolicy::default())
    }

    pub fn open_with_policy(store: S, policy: PasswordPolicy) -> Self {
        let loaded = store.load();
        match &loaded.warning {
            None => {}
            Some(LoadWarning::Missing) => log::info!("Ledger: {}", LoadWarning::Missing),
            Some(warning) => log::warn!("Ledger: {warning}"),
        }
        log::debug!("Ledger opened with {} accounts", loaded.accounts.len());

        Self {
            store,
            policy,
            accounts: RwLock::new(loaded.accounts),
            load_warning: loaded.warning,
        }
    }

    /// Returns the warning raised while loading persisted state, if any
    pub fn load_warning(&self) -> Option<&LoadWarning> {
        self.load_warning.as_ref()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn policy(&self) -> PasswordPolicy {
        self.policy
    }

    /// Register a new account with a zero balance.
    pub fn create_account(&self, id: &str, password: &str) -> Result<(), Error> {
        logged("create", self.try_create_account(id, password))
    }

    /// Check credentials and hand out a token for the account.
    pub fn authenticate(&self, id: &str, password: &str) -> Result<Token, Error> {
        logged("authenticate", self.try_authenticate(id, password))
    }

    /// Credit `amount` to `id`. Returns the new balance.
    pub fn deposit(&self, id: &str, amount: Cents) -> Result<Cents, Error> {
        logged("deposit", self.try_deposit(id, amount))
    }

    /// Debit `amount` from `id`. Returns the new balance.
    pub fn withdraw(&self, id: &str, amount: Cents) -> Result<Cents, Error> {
        logged("withdraw", self.try_withdraw(id, amount))
    }

    /// Move `amount` from `from` to `to` as one step. Returns the new balance of `from`.
    pub fn transfer(&self, from: &str, to: &str, amount: Cents) -> Result<Cents, Error> {
        logged("transfer", self.try_transfer(from, to, amount))
    }

    pub fn balance(&self, id: &str) -> Result<Cents, Error> {
        let id = existing_id(id)?;
        let balance = self.read().get(&id).map(Account::balance);
        balance.ok_or_else(|| not_found(&id))
    }

    /// Consistent copy of every account, ordered by id
    pub fn snapshot(&self) -> Vec<AccountSnapshot> {
        self.read().values().map(Account::snapshot).collect()
    }

    pub fn account_count(&self) -> usize {
        self.read().len()
    }

    /// Sum of all balances in cents
    pub fn total_holdings(&self) -> u128 {
        self.read()
            .values()
            .map(|account| u128::from(account.balance().get()))
            .sum()
    }

    /// Write every balance to any sink (Stdout, File, etc.) as CSV.
    pub fn export_balances<W: Write>(&self, writer: W) -> Result<(), Error> {
        let snapshot = self.snapshot();
        log::info!("Exporting {} accounts", snapshot.len());

        let mut csv_writer = csv::Writer::from_writer(writer);
        for account in &snapshot {
            csv_writer.serialize(BalanceRow {
                id: account.id.as_str(),
                balance: account.balance,
            })?;
        }
        csv_writer.flush()?;
        Ok(())
    }
}

// =============================================================================
// Operations
// =============================================================================

impl<S: LedgerStore> Ledger<S> {
    fn try_create_account(&self, id: &str, password: &str) -> Result<(), Error> {
        let id = AccountId::new(id)?;
        if self.read().contains_key(&id) {
            return Err(already_exists(&id));
        }
        self.policy.check(password)?;

        // Hashing is slow, keep it outside the critical section.
        let hash = PasswordHash::new(password)?;

        let mut accounts = self.write();
        if accounts.contains_key(&id) {
            return Err(already_exists(&id));
        }
        self.commit(&mut accounts, vec![Account::new(id.clone(), hash)])?;

        log::debug!("[create] account={id}");
        Ok(())
    }

    fn try_authenticate(&self, id: &str, password: &str) -> Result<Token, Error> {
        let id = existing_id(id)?;
        let hash = self
            .read()
            .get(&id)
            .map(|account| account.password_hash().clone())
            .ok_or_else(|| not_found(&id))?;

        if !hash.verify(password) {
            return Err(Error::BadCredentials);
        }

        log::debug!("[authenticate] account={id}");
        Ok(Token::issue(id))
    }

    fn try_deposit(&self, id: &str, amount: Cents) -> Result<Cents, Error> {
        require_positive(amount)?;
        let id = existing_id(id)?;

        let mut accounts = self.write();
        let mut account = accounts.get(&id).cloned().ok_or_else(|| not_found(&id))?;
        let balance = account.credit(amount)?;
        self.commit(&mut accounts, vec![account])?;

        log::debug!("[deposit] account={id} amount={amount} -> new_balance={balance}");
        Ok(balance)
    }

    fn try_withdraw(&self, id: &str, amount: Cents) -> Result<Cents, Error> {
        require_positive(amount)?;
        let id = existing_id(id)?;

        let mut accounts = self.write();
        let mut account = accounts.get(&id).cloned().ok_or_else(|| not_found(&id))?;
        let balance = account.debit(amount)?;
        self.commit(&mut accounts, vec![account])?;

        log::debug!("[withdraw] account={id} amount={amount} -> new_balance={balance}");
        Ok(balance)
    }

    fn try_transfer(&self, from: &str, to: &str, amount: Cents) -> Result<Cents, Error> {
        require_positive(amount)?;
        let from = existing_id(from)?;
        let to = AccountId::new(to).map_err(|_| Error::RecipientNotFound { id: to.to_string() })?;
        if from == to {
            return Err(Error::SelfTransfer {
                id: from.to_string(),
            });
        }

        let mut accounts = self.write();
        let mut source = accounts.get(&from).cloned().ok_or_else(|| not_found(&from))?;
        let mut recipient = accounts
            .get(&to)
            .cloned()
            .ok_or_else(|| Error::RecipientNotFound { id: to.to_string() })?;

        let before = u128::from(source.balance().get()) + u128::from(recipient.balance().get());
        let balance = source.debit(amount)?;
        recipient.credit(amount)?;
        debug_assert_eq!(
            before,
            u128::from(source.balance().get()) + u128::from(recipient.balance().get()),
            "transfer must preserve the sum of both balances"
        );
        self.commit(&mut accounts, vec![source, recipient])?;

        log::debug!("[transfer] from={from} to={to} amount={amount} -> new_balance={balance}");
        Ok(balance)
    }

    /// Apply `staged` records and persist. On save failure every staged record
    /// is reverted, leaving `accounts` exactly as it was.
    fn commit(&self, accounts: &mut Accounts, staged: Vec<Account>) -> Result<(), Error> {
        let previous: Vec<(AccountId, Option<Account>)> = staged
            .into_iter()
            .map(|account| {
                let id = account.id().clone();
                let old = accounts.insert(id.clone(), account);
                (id, old)
            })
            .collect();

        if let Err(e) = self.store.save(accounts) {
            for (id, old) in previous.into_iter().rev() {
                match old {
                    Some(account) => accounts.insert(id, account),
                    None => accounts.remove(&id),
                };
            }
            log::error!("Failed to persist ledger, changes rolled back: {e}");
            return Err(e);
        }
        Ok(())
    }

    fn read(&self) -> RwLockReadGuard<'_, Accounts> {
        self.accounts.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Accounts> {
        self.accounts.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn logged<T>(operation: &str, result: Result<T, Error>) -> Result<T, Error> {
    if let Err(e) = &result {
        if e.is_storage() {
            log::error!("[{operation}] failed: {e}");
        } else {
            log::debug!("[{operation}] rejected: {e}");
        }
    }
    result
}

fn require_positive(amount: Cents) -> Result<(), Error> {
    if amount.is_zero() {
        return Err(Error::invalid_amount(amount));
    }
    Ok(())
}

/// Normalize a caller supplied id for lookup. Ids that could never have been
/// created cannot exist either.
fn existing_id(input: &str) -> Result<AccountId, Error> {
    AccountId::new(input).map_err(|_| Error::NotFound {
        id: input.to_string(),
    })
}

fn not_found(id: &AccountId) -> Error {
    Error::NotFound { id: id.to_string() }
}

fn already_exists(id: &AccountId) -> Error {
    Error::AlreadyExists { id: id.to_string() }
}
