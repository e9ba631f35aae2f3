//! File-backed credential store.
//!
//! The whole account map lives in one JSON document keyed by email. Every
//! read loads the file fresh, every write replaces it atomically through a
//! temp file in the same directory. Writers go through [`StoreTransaction`],
//! which holds the store's write lock from load until commit or drop.

use std::collections::HashMap;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tokio::sync::{Mutex, MutexGuard};

use crate::auth::{StoreError, StoreResult};

/// Persisted account record. `password` only ever holds a digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub name: String,
    pub email: String,
    pub password: String,
}

pub type AccountMap = HashMap<String, Account>;

#[derive(Debug)]
pub struct CredentialStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load every account. A missing file is an empty store.
    pub async fn load(&self) -> StoreResult<AccountMap> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || read_accounts(&path))
            .await
            .map_err(join_failure)?
    }

    /// Replace the persisted state with `accounts`.
    ///
    /// Readers observe either the old document or the new one, never a
    /// partial write.
    pub async fn save(&self, accounts: AccountMap) -> StoreResult<()> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || write_accounts(&path, &accounts))
            .await
            .map_err(join_failure)?
    }

    /// Acquire the write lock and load the current state.
    ///
    /// Only one transaction exists at a time, so a check-then-insert inside
    /// it cannot race another writer in this process. Other processes writing
    /// the same file are not coordinated; the last rename wins.
    pub async fn begin(&self) -> StoreResult<StoreTransaction<'_>> {
        let guard = self.write_lock.lock().await;
        let accounts = self.load().await?;
        Ok(StoreTransaction {
            store: self,
            accounts,
            _guard: guard,
        })
    }
}

fn read_accounts(path: &Path) -> StoreResult<AccountMap> {
    let data = match std::fs::read(path) {
        Ok(data) => data,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(AccountMap::new()),
        Err(err) => return Err(StoreError::from(err)),
    };

    if data.iter().all(u8::is_ascii_whitespace) {
        return Ok(AccountMap::new());
    }

    let accounts: AccountMap = serde_json::from_slice(&data)?;
    Ok(accounts)
}

fn write_accounts(path: &Path, accounts: &AccountMap) -> StoreResult<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir)?;

    let mut body = serde_json::to_vec_pretty(accounts)?;
    body.push(b'\n');

    let mut tmp = NamedTempFile::new_in(&dir)?;
    tmp.write_all(&body)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|err| StoreError::from(err.error))?;

    log::debug!("credential store saved ({} accounts)", accounts.len());
    Ok(())
}

fn join_failure(err: tokio::task::JoinError) -> StoreError {
    StoreError::IoFailure(std::io::Error::other(err))
}

/// Exclusive view of the store. Dropping it without calling
/// [`StoreTransaction::commit`] discards every change.
pub struct StoreTransaction<'a> {
    store: &'a CredentialStore,
    accounts: AccountMap,
    _guard: MutexGuard<'a, ()>,
}

impl StoreTransaction<'_> {
    pub fn contains(&self, email: &str) -> bool {
        self.accounts.contains_key(email)
    }

    pub fn insert(&mut self, account: Account) {
        self.accounts.insert(account.email.clone(), account);
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub async fn commit(self) -> StoreResult<()> {
        let StoreTransaction {
            store,
            accounts,
            _guard,
        } = self;
        store.save(accounts).await
    }
}
