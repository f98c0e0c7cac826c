//! Durable key-value persistence for ledger state.
//!
//! The ledger is persisted as plain snapshots through the
//! [`StorageBackend`] trait; storage-engine mechanics stay outside the
//! trust boundary.

pub mod backend;
pub mod state;

pub use backend::{FileStore, InMemoryStore, StorageBackend, StorageKey, StorageValue};
pub use state::LedgerStore;
