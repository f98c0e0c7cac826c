//! Ledger state persistence.
//!
//! [`LedgerStore`] snapshots the complete [`LedgerState`] aggregate into a
//! storage backend and archives drained event logs under sequential keys.
//! Serialization is bincode throughout.

use crate::error::{Error, Result};
use crate::protocol::events::EventLog;
use crate::protocol::state_machine::LedgerState;
use crate::storage::backend::StorageBackend;

// ═══════════════════════════════════════════════════════════════════════════════
// STORAGE KEYS
// ═══════════════════════════════════════════════════════════════════════════════

const STATE_KEY: &[u8] = b"ledger/state";
const EVENT_SEQ_KEY: &[u8] = b"ledger/events/next";
const EVENT_LOG_PREFIX: &str = "ledger/events/log/";

fn event_log_key(seq: u64) -> Vec<u8> {
    format!("{}{:020}", EVENT_LOG_PREFIX, seq).into_bytes()
}

// ═══════════════════════════════════════════════════════════════════════════════
// LEDGER STORE
// ═══════════════════════════════════════════════════════════════════════════════

/// Snapshot persistence for one ledger instance
pub struct LedgerStore<S: StorageBackend> {
    backend: S,
}

impl<S: StorageBackend> LedgerStore<S> {
    /// Create a store over the given backend
    pub fn new(backend: S) -> Self {
        Self { backend }
    }

    /// The underlying backend
    pub fn backend(&self) -> &S {
        &self.backend
    }

    /// Persist the full ledger state snapshot
    pub fn save_state(&self, state: &LedgerState) -> Result<()> {
        let bytes =
            bincode::serialize(state).map_err(|e| Error::Serialization(e.to_string()))?;
        self.backend.set(STATE_KEY, &bytes)?;
        self.backend.flush()
    }

    /// Load the ledger state snapshot, if one was saved
    pub fn load_state(&self) -> Result<Option<LedgerState>> {
        match self.backend.get(STATE_KEY)? {
            Some(bytes) => {
                let state = bincode::deserialize(&bytes)
                    .map_err(|e| Error::Serialization(e.to_string()))?;
                Ok(Some(state))
            }
            None => Ok(None),
        }
    }

    /// Archive a drained event log, returning its sequence number
    pub fn archive_event_log(&self, log: &EventLog) -> Result<u64> {
        let seq = self.next_event_seq()?;

        let bytes = bincode::serialize(log).map_err(|e| Error::Serialization(e.to_string()))?;
        self.backend.set(&event_log_key(seq), &bytes)?;
        self.backend
            .set(EVENT_SEQ_KEY, &(seq + 1).to_le_bytes())?;
        self.backend.flush()?;
        Ok(seq)
    }

    /// Load an archived event log by sequence number
    pub fn load_event_log(&self, seq: u64) -> Result<Option<EventLog>> {
        match self.backend.get(&event_log_key(seq))? {
            Some(bytes) => {
                let log = bincode::deserialize(&bytes)
                    .map_err(|e| Error::Serialization(e.to_string()))?;
                Ok(Some(log))
            }
            None => Ok(None),
        }
    }

    /// Number of archived event logs
    pub fn event_log_count(&self) -> Result<u64> {
        self.next_event_seq()
    }

    fn next_event_seq(&self) -> Result<u64> {
        match self.backend.get(EVENT_SEQ_KEY)? {
            Some(bytes) => {
                if bytes.len() != 8 {
                    return Err(Error::Storage("corrupt event sequence counter".into()));
                }
                let mut arr = [0u8; 8];
                arr.copy_from_slice(&bytes);
                Ok(u64::from_le_bytes(arr))
            }
            None => Ok(0),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
