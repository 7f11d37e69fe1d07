//! Error types for entry storage operations.

/// Errors surfaced by [`EntryStore`](crate::EntryStore) implementations.
///
/// The first four variants are the contract errors callers branch on; the
/// rest wrap backend failures. The `NotFound` display string is stable —
/// it is the wire-visible error body for missing keys.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested entry (or its account database) does not exist.
    #[error("store: key not found")]
    NotFound,

    /// A write referenced a parent key with no entry.
    #[error("store: parent not found")]
    ParentNotFound,

    /// The entry's `key` or `parent` field disagreed with the call
    /// arguments or with the stored entry.
    #[error("store: entry key or parent does not match arguments")]
    KeyFieldMismatch,

    /// Refused to remove an entry that still has children.
    #[error("store: cannot remove a collection with entries")]
    CannotRemoveCollection,

    /// Gave up waiting for another process to release the database file.
    #[error("store: timed out acquiring the database lock")]
    OpenTimeout,

    /// An I/O error occurred.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to open the database.
    #[error("database error: {0}")]
    Database(#[from] redb::DatabaseError),

    /// Failed to begin a transaction.
    #[error("transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    /// Failed to open the store table.
    #[error("table error: {0}")]
    Table(#[from] redb::TableError),

    /// A low-level storage failure inside a transaction.
    #[error("storage error: {0}")]
    Storage(#[from] redb::StorageError),

    /// Failed to commit a transaction.
    #[error("commit error: {0}")]
    Commit(#[from] redb::CommitError),

    /// Failed to (de)serialize a stored entry.
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}
