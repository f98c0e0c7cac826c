//! Ledger events for state change notifications.
//!
//! Events are append-only audit records emitted for every state transition.
//! Each event carries enough fields to reconstruct the transition without
//! re-reading ledger state.

use serde::{Deserialize, Serialize};

use crate::core::access::ActorId;
use crate::core::batch::BatchId;
use crate::error::{Error, Result};
use crate::oracle::client::RequestId;
use crate::utils::crypto::Hash;

// ═══════════════════════════════════════════════════════════════════════════════
// EVENT TYPES
// ═══════════════════════════════════════════════════════════════════════════════

/// All ledger event types
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEvent {
    // Access control events
    /// A provider was authorized
    ProviderAuthorized(ProviderAuthorizedEvent),
    /// A provider was revoked
    ProviderRevoked(ProviderRevokedEvent),
    /// The cooldown interval changed
    CooldownUpdated(CooldownUpdatedEvent),
    /// The ledger was paused
    LedgerPaused(LedgerPausedEvent),
    /// The ledger was unpaused
    LedgerUnpaused(LedgerUnpausedEvent),

    // Batch events
    /// A batch was opened
    BatchOpened(BatchOpenedEvent),
    /// A batch was closed
    BatchClosed(BatchClosedEvent),
    /// An encrypted position was submitted
    PositionSubmitted(PositionSubmittedEvent),

    // Oracle events
    /// A decryption request was issued
    DecryptionRequested(DecryptionRequestedEvent),
    /// A decryption result was verified and consumed
    DecryptionCompleted(DecryptionCompletedEvent),
}

impl LedgerEvent {
    /// Get the event type as a string
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::ProviderAuthorized(_) => "ProviderAuthorized",
            Self::ProviderRevoked(_) => "ProviderRevoked",
            Self::CooldownUpdated(_) => "CooldownUpdated",
            Self::LedgerPaused(_) => "LedgerPaused",
            Self::LedgerUnpaused(_) => "LedgerUnpaused",
            Self::BatchOpened(_) => "BatchOpened",
            Self::BatchClosed(_) => "BatchClosed",
            Self::PositionSubmitted(_) => "PositionSubmitted",
            Self::DecryptionRequested(_) => "DecryptionRequested",
            Self::DecryptionCompleted(_) => "DecryptionCompleted",
        }
    }

    /// Get the timestamp of the event
    pub fn timestamp(&self) -> u64 {
        match self {
            Self::ProviderAuthorized(e) => e.timestamp,
            Self::ProviderRevoked(e) => e.timestamp,
            Self::CooldownUpdated(e) => e.timestamp,
            Self::LedgerPaused(e) => e.timestamp,
            Self::LedgerUnpaused(e) => e.timestamp,
            Self::BatchOpened(e) => e.timestamp,
            Self::BatchClosed(e) => e.timestamp,
            Self::PositionSubmitted(e) => e.timestamp,
            Self::DecryptionRequested(e) => e.timestamp,
            Self::DecryptionCompleted(e) => e.timestamp,
        }
    }

    /// Compute event hash
    pub fn hash(&self) -> Hash {
        let data = bincode::serialize(self).unwrap_or_default();
        Hash::sha256(&data)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ACCESS CONTROL EVENTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Event emitted when a provider is authorized
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderAuthorizedEvent {
    /// The authorized provider
    pub provider: ActorId,
    /// Timestamp
    pub timestamp: u64,
}

/// Event emitted when a provider is revoked
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderRevokedEvent {
    /// The revoked provider
    pub provider: ActorId,
    /// Timestamp
    pub timestamp: u64,
}

/// Event emitted when the cooldown interval changes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CooldownUpdatedEvent {
    /// Previous interval in seconds
    pub previous_secs: u64,
    /// New interval in seconds
    pub new_secs: u64,
    /// Timestamp
    pub timestamp: u64,
}

/// Event emitted when the ledger is paused
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerPausedEvent {
    /// Timestamp
    pub timestamp: u64,
}

/// Event emitted when the ledger is unpaused
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerUnpausedEvent {
    /// Timestamp
    pub timestamp: u64,
}

// ═══════════════════════════════════════════════════════════════════════════════
// BATCH EVENTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Event emitted when a batch is opened
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOpenedEvent {
    /// The newly opened batch
    pub batch_id: BatchId,
    /// Timestamp
    pub timestamp: u64,
}

/// Event emitted when a batch is closed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchClosedEvent {
    /// The closed batch
    pub batch_id: BatchId,
    /// Positions accumulated at closure
    pub position_count: usize,
    /// Timestamp
    pub timestamp: u64,
}

/// Event emitted when an encrypted position is submitted.
///
/// Carries a content commitment over the two ciphertext handles, never the
/// plaintext.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionSubmittedEvent {
    /// Batch that received the position
    pub batch_id: BatchId,
    /// Submitting provider
    pub provider: ActorId,
    /// Index of the position within the batch
    pub index: usize,
    /// Content commitment over the two ciphertext handles
    pub commitment: Hash,
    /// Timestamp
    pub timestamp: u64,
}

// ═══════════════════════════════════════════════════════════════════════════════
// ORACLE EVENTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Event emitted when a decryption request is issued
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecryptionRequestedEvent {
    /// Oracle-issued request id
    pub request_id: RequestId,
    /// Batch the request aggregates
    pub batch_id: BatchId,
    /// Fingerprint binding the request to the aggregate state
    pub fingerprint: Hash,
    /// Positions covered by the aggregate
    pub position_count: usize,
    /// Timestamp
    pub timestamp: u64,
}

/// Event emitted when a decryption result is verified and consumed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecryptionCompletedEvent {
    /// Oracle-issued request id
    pub request_id: RequestId,
    /// Batch the totals belong to
    pub batch_id: BatchId,
    /// Revealed loan total
    pub loan_total: u32,
    /// Revealed collateral total
    pub collateral_total: u32,
    /// Timestamp
    pub timestamp: u64,
}

// ═══════════════════════════════════════════════════════════════════════════════
// EVENT LOG
// ═══════════════════════════════════════════════════════════════════════════════

/// Collection of events accumulated across ledger operations
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventLog {
    events: Vec<LedgerEvent>,
}

impl EventLog {
    /// Create a new empty event log
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Add an event to the log
    pub fn push(&mut self, event: LedgerEvent) {
        self.events.push(event);
    }

    /// Get all events
    pub fn events(&self) -> &[LedgerEvent] {
        &self.events
    }

    /// Get events of a specific type
    pub fn filter_by_type(&self, event_type: &str) -> Vec<&LedgerEvent> {
        self.events
            .iter()
            .filter(|e| e.event_type() == event_type)
            .collect()
    }

    /// Get the number of events
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Clear all events
    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Compute merkle root of all events
    pub fn merkle_root(&self) -> Hash {
        use crate::utils::crypto::merkle_root;
        let hashes: Vec<Hash> = self.events.iter().map(|e| e.hash()).collect();
        merkle_root(&hashes)
    }

    /// Export the log as pretty-printed JSON for external consumers
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.events).map_err(|e| Error::Serialization(e.to_string()))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
