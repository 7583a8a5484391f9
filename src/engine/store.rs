//! Durable storage of account records.
//!
//! The ledger only sees [`LedgerStore::load`] and [`LedgerStore::save`]; the
//! on-disk layout is private to each store.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use super::account::{Account, AccountId};
use super::error::Error;

/// All accounts, keyed (and ordered) by id.
pub type Accounts = BTreeMap<AccountId, Account>;

/// Current on-disk format version of [`JsonFileStore`].
const FORMAT_VERSION: u32 = 1;

/// Suffix appended to a store file that failed to parse.
const CORRUPT_SUFFIX: &str = ".corrupt";

/// Why a load came back empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadWarning {
    /// Nothing has been persisted yet.
    Missing,
    /// The storage exists but could not be read.
    Unreadable(String),
    /// The storage was read but its content is not a valid ledger.
    Corrupt(String),
}

impl fmt::Display for LoadWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadWarning::Missing => write!(f, "no ledger found, starting empty"),
            LoadWarning::Unreadable(reason) => {
                write!(f, "ledger could not be read ({reason}), starting empty")
            }
            LoadWarning::Corrupt(reason) => {
                write!(f, "ledger is corrupt ({reason}), starting empty")
            }
        }
    }
}

/// Result of [`LedgerStore::load`]. Loading never fails; problems degrade to an
/// empty ledger plus a warning.
#[derive(Debug, Default)]
pub struct Loaded {
    pub accounts: Accounts,
    pub warning: Option<LoadWarning>,
}

impl Loaded {
    fn empty(warning: LoadWarning) -> Self {
        Self {
            accounts: Accounts::new(),
            warning: Some(warning),
        }
    }
}

/// Persistence backend for the ledger.
pub trait LedgerStore: Send + Sync {
    /// Read the persisted state.
    fn load(&self) -> Loaded;

    /// Durably replace the persisted state with `accounts`.
    fn save(&self, accounts: &Accounts) -> Result<(), Error>;
}

// =============================================================================
// JSON file store
// =============================================================================

#[derive(Deserialize)]
struct StoreFile {
    version: u32,
    accounts: Vec<Account>,
}

#[derive(Serialize)]
struct StoreFileRef<'a> {
    version: u32,
    accounts: Vec<&'a Account>,
}

/// Stores the ledger as a single pretty-printed JSON document.
///
/// Saves go through a temporary file in the same directory which is fsynced and
/// then renamed over the target, so a crash leaves either the old or the new
/// document on disk, never a truncated one.
///
/// A file that exists but cannot be used is moved aside on load. If that move
/// fails the store refuses every save, so the file is never overwritten.
pub struct JsonFileStore {
    path: PathBuf,
    protected: AtomicBool,
    sync_dir: fn(&Path) -> io::Result<()>,
}

impl fmt::Debug for JsonFileStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonFileStore")
            .field("path", &self.path)
            .field("protected", &self.protected)
            .finish_non_exhaustive()
    }
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            protected: AtomicBool::new(false),
            sync_dir: sync_directory,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Where a corrupt store file is moved before the ledger starts over.
    pub fn quarantine_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(CORRUPT_SUFFIX);
        PathBuf::from(name)
    }

    fn directory(&self) -> &Path {
        match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        }
    }

    fn parse(content: &[u8]) -> Result<Accounts, String> {
        let file: StoreFile = serde_json::from_slice(content).map_err(|e| e.to_string())?;
        if file.version != FORMAT_VERSION {
            return Err(format!("unsupported format version {}", file.version));
        }

        let mut accounts = Accounts::new();
        for account in file.accounts {
            let id = account.id().clone();
            if accounts.insert(id.clone(), account).is_some() {
                return Err(format!("duplicate account id {id}"));
            }
        }
        Ok(accounts)
    }

    /// Move an unusable store file aside. Saves stay blocked if it cannot be moved.
    fn quarantine(&self) {
        let target = self.quarantine_path();
        match fs::rename(&self.path, &target) {
            Ok(()) => log::warn!("Moved unusable ledger to {}", target.display()),
            Err(e) => {
                self.protected.store(true, Ordering::SeqCst);
                log::error!(
                    "Failed to move unusable ledger {} aside, refusing to overwrite it: {e}",
                    self.path.display()
                );
            }
        }
    }
}

impl LedgerStore for JsonFileStore {
    fn load(&self) -> Loaded {
        let content = match fs::read(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::info!("No ledger at {}, starting empty", self.path.display());
                return Loaded::empty(LoadWarning::Missing);
            }
            Err(e) => {
                log::warn!("Failed to read ledger {}: {e}", self.path.display());
                self.quarantine();
                return Loaded::empty(LoadWarning::Unreadable(e.to_string()));
            }
        };

        match Self::parse(&content) {
            Ok(accounts) => {
                log::debug!(
                    "Loaded {} accounts from {}",
                    accounts.len(),
                    self.path.display()
                );
                Loaded {
                    accounts,
                    warning: None,
                }
            }
            Err(reason) => {
                log::warn!("Ledger {} is corrupt: {reason}", self.path.display());
                self.quarantine();
                Loaded::empty(LoadWarning::Corrupt(reason))
            }
        }
    }

    fn save(&self, accounts: &Accounts) -> Result<(), Error> {
        if self.protected.load(Ordering::SeqCst) {
            return Err(Error::StorageIo(io::Error::other(format!(
                "refusing to overwrite unusable ledger {}",
                self.path.display()
            ))));
        }

        let document = StoreFileRef {
            version: FORMAT_VERSION,
            accounts: accounts.values().collect(),
        };

        let dir = self.directory();
        let mut temp = tempfile::NamedTempFile::new_in(dir)?;
        {
            let mut writer = BufWriter::new(temp.as_file_mut());
            serde_json::to_writer_pretty(&mut writer, &document)
                .map_err(|e| Error::StorageCorrupt(e.to_string()))?;
            writer.flush()?;
        }
        temp.as_file().sync_all()?;
        temp.persist(&self.path).map_err(|e| e.error)?;

        // The new document is in place; a failed directory sync must not
        // report the save as failed.
        if let Err(e) = (self.sync_dir)(dir) {
            log::warn!(
                "Saved {} but could not sync its directory: {e}",
                self.path.display()
            );
        }

        log::trace!(
            "Saved {} accounts to {}",
            accounts.len(),
            self.path.display()
        );
        Ok(())
    }
}

/// Make a rename inside `dir` durable.
#[cfg(unix)]
fn sync_directory(dir: &Path) -> io::Result<()> {
    fs::File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_directory(_dir: &Path) -> io::Result<()> {
    Ok(())
}

// =============================================================================
// In-memory store
// =============================================================================

/// Keeps the "persisted" state in memory. Useful for ephemeral ledgers and tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    accounts: Mutex<Accounts>,
    fail_saves: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_accounts(accounts: Accounts) -> Self {
        Self {
            accounts: Mutex::new(accounts),
            fail_saves: AtomicBool::new(false),
        }
    }

    /// Make every subsequent save fail with an IO error (or succeed again).
    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Returns a copy of what was last saved
    pub fn saved(&self) -> Accounts {
        self.accounts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl LedgerStore for MemoryStore {
    fn load(&self) -> Loaded {
        Loaded {
            accounts: self.saved(),
            warning: None,
        }
    }

    fn save(&self, accounts: &Accounts) -> Result<(), Error> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(Error::StorageIo(io::Error::other("injected save failure")));
        }
        *self.accounts.lock().unwrap_or_else(PoisonError::into_inner) = accounts.clone();
        Ok(())
    }
}
