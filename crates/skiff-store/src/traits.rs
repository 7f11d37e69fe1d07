//! The repository contract for per-account entry storage.

use skiff_types::{Entry, Hash};

use crate::error::StoreError;

/// Storage contract for one tree of entries per account.
///
/// All implementations must be `Send + Sync`; operations are synchronous
/// and safe under parallel invocation. No operation on one account may
/// read, write, or lock state belonging to another.
pub trait EntryStore: Send + Sync {
    /// Open (or create) the account's database and ensure the root entry
    /// exists. Idempotent; concurrent calls are safe.
    fn open_db(&self, account: &Hash) -> Result<(), StoreError>;

    /// Release the account's cached handle. Idempotent. A handle still in
    /// use by an in-flight operation is closed when that operation ends.
    fn close_db(&self, account: &Hash) -> Result<(), StoreError>;

    /// Whether `key` is present. `false` when the account database is
    /// absent or cannot be opened.
    fn has_entry(&self, account: &Hash, key: &Hash) -> bool;

    /// Fetch one entry, or [`StoreError::NotFound`].
    fn get_entry(&self, account: &Hash, key: &Hash) -> Result<Entry, StoreError>;

    /// Create or update `entry` under `key` atomically.
    ///
    /// Requires `entry.key == key` and `entry.parent == parent`
    /// ([`StoreError::KeyFieldMismatch`] otherwise) and an existing parent
    /// entry ([`StoreError::ParentNotFound`]). Stamps the entry with the
    /// current time, links it into the parent's child list, and propagates
    /// the timestamp up every ancestor to the root in the same write
    /// transaction. A `None` parent is accepted only for the account's
    /// root key.
    fn set_entry(
        &self,
        account: &Hash,
        key: &Hash,
        parent: Option<&Hash>,
        entry: Entry,
    ) -> Result<(), StoreError>;

    /// Remove a leaf entry, unlink it from its parent, and propagate the
    /// removal timestamp up the ancestor chain.
    ///
    /// Fails with [`StoreError::NotFound`] for absent keys and
    /// [`StoreError::CannotRemoveCollection`] when children are present.
    /// `recursive` is accepted for interface stability but reserved: it
    /// does not enable deletion of non-empty collections.
    fn remove_entry(&self, account: &Hash, key: &Hash, recursive: bool)
    -> Result<(), StoreError>;
}
