//! In-memory entry storage backend.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use skiff_types::{Clock, Entry, Hash, root_hash};
use tracing::debug;

use crate::error::StoreError;
use crate::traits::EntryStore;

/// In-memory entry store backed by a `RwLock<HashMap>` of per-account trees.
///
/// Mirrors the file backend's semantics for tests and memory-only
/// deployments: lazy account bootstrap with a synthetic root, the same
/// parent/child invariants, and whole-mutation atomicity (the map's write
/// lock is held for the full set/remove, and every validation runs before
/// the first mutation). `close_db` keeps the data, matching a closed file
/// database whose bytes stay on disk until reopened.
pub struct MemoryStore {
    accounts: RwLock<HashMap<String, BTreeMap<[u8; 32], Entry>>>,
    clock: Clock,
}

impl MemoryStore {
    /// Create an empty store using the system clock.
    pub fn new() -> Self {
        Self::with_clock(Clock::system())
    }

    /// Create an empty store with an explicit [`Clock`].
    pub fn with_clock(clock: Clock) -> Self {
        Self {
            accounts: RwLock::new(HashMap::new()),
            clock,
        }
    }

    /// Ensure the account's tree exists and holds a root entry.
    fn bootstrap<'a>(
        &self,
        accounts: &'a mut HashMap<String, BTreeMap<[u8; 32], Entry>>,
        account: &Hash,
    ) -> &'a mut BTreeMap<[u8; 32], Entry> {
        let tree = accounts.entry(account.to_string()).or_default();
        let root = root_hash(account);
        if !tree.contains_key(root.as_bytes()) {
            tree.insert(*root.as_bytes(), Entry::root(root, self.clock.now()));
            debug!(account = %account, "bootstrapped root entry");
        }
        tree
    }

    /// Collect the ancestor chain from `parent` up to the root, verifying
    /// every link exists before anything is mutated.
    fn ancestor_chain(
        tree: &BTreeMap<[u8; 32], Entry>,
        parent: Option<Hash>,
    ) -> Result<Vec<Hash>, StoreError> {
        let mut chain = Vec::new();
        let mut next = parent;
        while let Some(key) = next {
            let ancestor = tree.get(key.as_bytes()).ok_or(StoreError::ParentNotFound)?;
            next = ancestor.parent;
            chain.push(key);
        }
        Ok(chain)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl EntryStore for MemoryStore {
    fn open_db(&self, account: &Hash) -> Result<(), StoreError> {
        let mut accounts = self.accounts.write().expect("account map poisoned");
        self.bootstrap(&mut accounts, account);
        Ok(())
    }

    fn close_db(&self, _account: &Hash) -> Result<(), StoreError> {
        Ok(())
    }

    fn has_entry(&self, account: &Hash, key: &Hash) -> bool {
        let mut accounts = self.accounts.write().expect("account map poisoned");
        let tree = self.bootstrap(&mut accounts, account);
        tree.contains_key(key.as_bytes())
    }

    fn get_entry(&self, account: &Hash, key: &Hash) -> Result<Entry, StoreError> {
        let mut accounts = self.accounts.write().expect("account map poisoned");
        let tree = self.bootstrap(&mut accounts, account);
        tree.get(key.as_bytes()).cloned().ok_or(StoreError::NotFound)
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
            return Err(StoreError::ParentNotFound);
        }

        let mut accounts = self.accounts.write().expect("account map poisoned");
        let tree = self.bootstrap(&mut accounts, account);

        // Validate before mutating so a failure leaves the tree untouched.
        let chain = Self::ancestor_chain(tree, entry.parent)?;
        if let Some(existing) = tree.get(key.as_bytes()) {
            if existing.parent != entry.parent {
                return Err(StoreError::KeyFieldMismatch);
            }
            entry.entries = existing.entries.clone();
        }

        let timestamp = self.clock.now();
        entry.timestamp = timestamp;
        tree.insert(*key.as_bytes(), entry);

        let mut link_child = Some(*key);
        for ancestor_key in chain {
            let Some(ancestor) = tree.get_mut(ancestor_key.as_bytes()) else {
                return Err(StoreError::ParentNotFound);
            };
            if let Some(child) = link_child.take() {
                ancestor.add_child(child);
            }
            ancestor.timestamp = timestamp;
        }

        debug!(account = %account, key = %key, timestamp, "stored entry");
        Ok(())
    }

    fn remove_entry(
        &self,
        account: &Hash,
        key: &Hash,
        _recursive: bool,
    ) -> Result<(), StoreError> {
        let mut accounts = self.accounts.write().expect("account map poisoned");
        let tree = self.bootstrap(&mut accounts, account);

        let entry = tree.get(key.as_bytes()).ok_or(StoreError::NotFound)?;
        if entry.is_collection() {
            return Err(StoreError::CannotRemoveCollection);
        }
        let parent = entry.parent;
        let chain = Self::ancestor_chain(tree, parent)?;

        let timestamp = self.clock.now();
        tree.remove(key.as_bytes());

        let mut unlink = true;
        for ancestor_key in chain {
            let Some(ancestor) = tree.get_mut(ancestor_key.as_bytes()) else {
                return Err(StoreError::ParentNotFound);
            };
            if unlink {
                ancestor.remove_child(key);
                unlink = false;
            }
            ancestor.timestamp = timestamp;
        }

        debug!(account = %account, key = %key, timestamp, "removed entry");
        Ok(())
    }
}
