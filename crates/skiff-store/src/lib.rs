//! Per-account entry storage for the skiff account store.
//!
//! This crate defines the [`EntryStore`] repository trait along with two
//! concrete backends:
//!
//! - [`FileStore`] — one redb database file per account with a 2-level
//!   fan-out directory layout and a process-wide handle cache.
//! - [`MemoryStore`] — in-memory storage backed by a `RwLock<HashMap>`,
//!   with equivalent semantics, used in tests and memory-only deployments.
//!
//! Both backends maintain the tree invariants: every non-root entry's
//! parent exists and lists the entry exactly once among its children, and
//! every write stamps the touched entry and all of its ancestors with the
//! same timestamp.

mod error;
mod file_store;
mod memory_store;
mod traits;

#[cfg(test)]
mod tests;

pub use error::StoreError;
pub use file_store::FileStore;
pub use memory_store::MemoryStore;
pub use traits::EntryStore;
