//! redb-backed entry storage, one database file per account.
//!
//! Databases live at `{accounts_root}/{hex[0..2]}/{hex[2..]}/store.db`,
//! giving a 2-level fan-out by the first two hex characters of the account
//! hash. Inside each file a single `store` table maps the 32-byte entry key
//! to the JSON-serialized entry.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use redb::{Database, DatabaseError, ReadableTable, Table, TableDefinition, TableError};
use skiff_types::{Clock, Entry, Hash, root_hash};
use tracing::{debug, trace};

use crate::error::StoreError;
use crate::traits::EntryStore;

const STORE_TABLE: TableDefinition<&[u8], &[u8]> = TableDefinition::new("store");

/// Database filename inside each account directory.
const DB_FILE: &str = "store.db";

/// How long `open_db` waits for another process to release the file lock.
const OPEN_TIMEOUT: Duration = Duration::from_secs(5);
const OPEN_RETRY_INTERVAL: Duration = Duration::from_millis(50);

/// File-backed entry store with one redb database per account.
///
/// Open handles are cached in a concurrent map keyed by the account's hex
/// form and shared across threads; redb serializes writers internally, so
/// within one account writes are linearizable. [`close_db`] evicts the
/// cached handle; an operation still holding a clone keeps the database
/// open until it finishes.
///
/// [`close_db`]: EntryStore::close_db
pub struct FileStore {
    accounts_root: PathBuf,
    clock: Clock,
    handles: RwLock<HashMap<String, Arc<Database>>>,
}

impl FileStore {
    /// Create a file store rooted at the given directory, using the system
    /// clock. The directory is created if it does not exist.
    pub fn new(accounts_root: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::with_clock(accounts_root, Clock::system())
    }

    /// Create a file store with an explicit [`Clock`]. Tests install fixed
    /// clocks to verify timestamp propagation exactly.
    pub fn with_clock(accounts_root: impl AsRef<Path>, clock: Clock) -> Result<Self, StoreError> {
        let accounts_root = accounts_root.as_ref().to_path_buf();
        std::fs::create_dir_all(&accounts_root)?;
        Ok(Self {
            accounts_root,
            clock,
            handles: RwLock::new(HashMap::new()),
        })
    }

    /// Compute the database path for an account.
    fn db_path(&self, account_hex: &str) -> PathBuf {
        self.accounts_root
            .join(&account_hex[..2])
            .join(&account_hex[2..])
            .join(DB_FILE)
    }

    /// Fetch the cached handle for an account, opening lazily.
    fn handle(&self, account: &Hash) -> Result<Arc<Database>, StoreError> {
        let hex = account.to_string();
        if let Some(db) = self.handles.read().expect("handle cache poisoned").get(&hex) {
            return Ok(db.clone());
        }
        self.open_account(account)
    }

    /// Open the account's database, bootstrap the root entry, and cache the
    /// handle. Runs under the cache write lock so a racing second caller
    /// observes the finished handle instead of fighting over the file lock.
    fn open_account(&self, account: &Hash) -> Result<Arc<Database>, StoreError> {
        let hex = account.to_string();
        let mut handles = self.handles.write().expect("handle cache poisoned");
        if let Some(db) = handles.get(&hex) {
            return Ok(db.clone());
        }

        let path = self.db_path(&hex);
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        debug!(account = %hex, path = %path.display(), "opening account database");
        let db = open_with_timeout(&path)?;
        restrict_mode(&path)?;
        self.ensure_root(account, &db)?;

        let db = Arc::new(db);
        handles.insert(hex, db.clone());
        Ok(db)
    }

    /// Write the synthetic root entry if the database does not have one yet.
    fn ensure_root(&self, account: &Hash, db: &Database) -> Result<(), StoreError> {
        let root = root_hash(account);
        if read_entry(db, &root)?.is_some() {
            return Ok(());
        }

        let entry = Entry::root(root, self.clock.now());
        let tx = db.begin_write()?;
        {
            let mut table = tx.open_table(STORE_TABLE)?;
            write_in(&mut table, &entry)?;
        }
        tx.commit()?;
        debug!(account = %account, timestamp = entry.timestamp, "bootstrapped root entry");
        Ok(())
    }

    /// Close every cached handle. Intended for process teardown.
    pub fn close_all(&self) {
        let mut handles = self.handles.write().expect("handle cache poisoned");
        let count = handles.len();
        handles.clear();
        if count > 0 {
            debug!(count, "closed cached account databases");
        }
    }
}

impl EntryStore for FileStore {
    fn open_db(&self, account: &Hash) -> Result<(), StoreError> {
        self.handle(account).map(|_| ())
    }

    fn close_db(&self, account: &Hash) -> Result<(), StoreError> {
        let hex = account.to_string();
        let mut handles = self.handles.write().expect("handle cache poisoned");
        if handles.remove(&hex).is_some() {
            debug!(account = %hex, "evicted account database handle");
        }
        Ok(())
    }

    fn has_entry(&self, account: &Hash, key: &Hash) -> bool {
        let Ok(db) = self.handle(account) else {
            return false;
        };
        matches!(read_entry(&db, key), Ok(Some(_)))
    }

    fn get_entry(&self, account: &Hash, key: &Hash) -> Result<Entry, StoreError> {
        let db = self.handle(account)?;
        read_entry(&db, key)?.ok_or(StoreError::NotFound)
    }

    fn set_entry(
        &self,
        account: &Hash,
        key: &Hash,
        parent: Option<&Hash>,
        mut entry: Entry,
    ) -> Result<(), StoreError> {
        if entry.key != *key || entry.parent.as_ref() != parent {
            return Err(StoreError::KeyFieldMismatch);
        }
        if parent.is_none() && *key != root_hash(account) {
            // Only the root may be written without a parent.
            return Err(StoreError::ParentNotFound);
        }

        let db = self.handle(account)?;
        let timestamp = self.clock.now();
        entry.timestamp = timestamp;

        // Everything below happens in one write transaction: dropping it on
        // any error path rolls the whole mutation back.
        let tx = db.begin_write()?;
        {
            let mut table = tx.open_table(STORE_TABLE)?;

            if let Some(parent_key) = parent
                && entry_in(&table, parent_key)?.is_none()
            {
                return Err(StoreError::ParentNotFound);
            }

            // On update, the stored child list survives and the parent link
            // must not move: a key's parent is fixed by its path.
            if let Some(existing) = entry_in(&table, key)? {
                if existing.parent != entry.parent {
                    return Err(StoreError::KeyFieldMismatch);
                }
                entry.entries = existing.entries;
            }
            write_in(&mut table, &entry)?;

            // Link into the parent, then walk the ancestor chain to the
            // root stamping every node with this write's timestamp.
            let mut link_child = Some(entry.key);
            let mut next = entry.parent;
            while let Some(ancestor_key) = next {
                let mut ancestor =
                    entry_in(&table, &ancestor_key)?.ok_or(StoreError::ParentNotFound)?;
                if let Some(child) = link_child.take() {
                    ancestor.add_child(child);
                }
                ancestor.timestamp = timestamp;
                write_in(&mut table, &ancestor)?;
                next = ancestor.parent;
            }
        }
        tx.commit()?;

        debug!(account = %account, key = %key, timestamp, "stored entry");
        Ok(())
    }

    fn remove_entry(
        &self,
        account: &Hash,
        key: &Hash,
        _recursive: bool,
    ) -> Result<(), StoreError> {
        let db = self.handle(account)?;
        let timestamp = self.clock.now();

        let tx = db.begin_write()?;
        {
            let mut table = tx.open_table(STORE_TABLE)?;

            let entry = entry_in(&table, key)?.ok_or(StoreError::NotFound)?;
            if entry.is_collection() {
                return Err(StoreError::CannotRemoveCollection);
            }

            table.remove(key.as_bytes().as_slice())?;

            // Unlink from the parent, then stamp the chain.
            let mut unlink = true;
            let mut next = entry.parent;
            while let Some(ancestor_key) = next {
                let mut ancestor =
                    entry_in(&table, &ancestor_key)?.ok_or(StoreError::ParentNotFound)?;
                if unlink {
                    ancestor.remove_child(key);
                    unlink = false;
                }
                ancestor.timestamp = timestamp;
                write_in(&mut table, &ancestor)?;
                next = ancestor.parent;
            }
        }
        tx.commit()?;

        debug!(account = %account, key = %key, timestamp, "removed entry");
        Ok(())
    }
}

/// Open a redb database, polling until the file lock frees or the deadline
/// passes. redb surfaces a held lock as an open error rather than blocking.
fn open_with_timeout(path: &Path) -> Result<Database, StoreError> {
    let deadline = Instant::now() + OPEN_TIMEOUT;
    loop {
        match Database::create(path) {
            Ok(db) => return Ok(db),
            Err(err @ (DatabaseError::DatabaseAlreadyOpen | DatabaseError::Storage(_))) => {
                if Instant::now() >= deadline {
                    trace!(path = %path.display(), %err, "gave up waiting for database lock");
                    return Err(StoreError::OpenTimeout);
                }
                std::thread::sleep(OPEN_RETRY_INTERVAL);
            }
            Err(err) => return Err(err.into()),
        }
    }
}

/// Restrict the database file to owner read/write.
#[cfg(unix)]
fn restrict_mode(path: &Path) -> Result<(), StoreError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict_mode(_path: &Path) -> Result<(), StoreError> {
    Ok(())
}

/// Read one entry in its own read transaction. A missing table (fresh
/// database) reads as absent.
fn read_entry(db: &Database, key: &Hash) -> Result<Option<Entry>, StoreError> {
    let tx = db.begin_read()?;
    let table = match tx.open_table(STORE_TABLE) {
        Ok(table) => table,
        Err(TableError::TableDoesNotExist(_)) => return Ok(None),
        Err(err) => return Err(err.into()),
    };
    entry_in(&table, key)
}

/// Read one entry through any table view (read-only or in-transaction).
fn entry_in(
    table: &impl ReadableTable<&'static [u8], &'static [u8]>,
    key: &Hash,
) -> Result<Option<Entry>, StoreError> {
    match table.get(key.as_bytes().as_slice())? {
        Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
        None => Ok(None),
    }
}

/// Serialize and write one entry under its own key.
fn write_in(
    table: &mut Table<'_, &'static [u8], &'static [u8]>,
    entry: &Entry,
) -> Result<(), StoreError> {
    let blob = serde_json::to_vec(entry)?;
    table.insert(entry.key.as_bytes().as_slice(), blob.as_slice())?;
    Ok(())
}
