//! Error types for the CipherLedger protocol.
//!
//! Every rejection is terminal and local to the offending call: nothing is
//! retried by the core, and no check fails after a state mutation has begun.

use thiserror::Error;

/// Result type alias for ledger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the CipherLedger protocol
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // ═══════════════════════════════════════════════════════════════════
    // Authorization Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Caller is not the ledger owner
    #[error("Caller {0} is not the ledger owner")]
    NotOwner(String),

    /// Caller is not an authorized provider
    #[error("Actor {0} is not an authorized provider")]
    NotProvider(String),

    // ═══════════════════════════════════════════════════════════════════
    // Lifecycle Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Ledger is paused
    #[error("Ledger is paused")]
    Paused,

    /// No batch is currently open for the requested operation
    #[error("Batch is closed")]
    BatchClosed,

    // ═══════════════════════════════════════════════════════════════════
    // Rate Limiting Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Too soon since the actor's last action of this class
    #[error("Cooldown active: {remaining_secs}s remaining")]
    CooldownActive {
        /// Seconds until the action class is available again
        remaining_secs: u64,
    },

    // ═══════════════════════════════════════════════════════════════════
    // Input Validity Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Invalid input parameter
    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter {
        /// Parameter name
        name: String,
        /// Reason for invalidity
        reason: String,
    },

    /// Ciphertext does not satisfy the initialized predicate
    #[error("Ciphertext for {0} is not initialized")]
    NotInitialized(String),

    // ═══════════════════════════════════════════════════════════════════
    // Oracle Protocol Integrity Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Decryption result already consumed, or request unknown
    #[error("Replay attempt for decryption request {0}")]
    ReplayAttempt(String),

    /// Fingerprint drift between request time and delivery time
    #[error("State mismatch: stored fingerprint {stored}, current {current}")]
    StateMismatch {
        /// Fingerprint recorded when the request was issued
        stored: String,
        /// Fingerprint re-derived from current ledger state
        current: String,
    },

    /// External cryptographic proof failed verification
    #[error("Invalid decryption proof for request {0}")]
    InvalidProof(String),

    // ═══════════════════════════════════════════════════════════════════
    // Internal Errors
    // ═══════════════════════════════════════════════════════════════════

    /// Serialization failed
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Cryptographic operation failed
    #[error("Crypto error in {operation}: {details}")]
    Crypto {
        /// Operation that failed
        operation: String,
        /// Error details
        details: String,
    },

    /// Internal error (should not happen in production)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Returns true if a well-formed retry of the same call could succeed
    /// later without owner intervention.
    ///
    /// ReplayAttempt is deliberately excluded: the result was already
    /// consumed, so retrying is meaningless.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::CooldownActive { .. }
                | Error::Paused
                | Error::BatchClosed
                | Error::StateMismatch { .. }
                | Error::InvalidProof(_)
        )
    }

    /// Returns true if this is a critical error requiring immediate attention
    pub fn is_critical(&self) -> bool {
        matches!(
            self,
            Error::Serialization(_) | Error::Storage(_) | Error::Crypto { .. } | Error::Internal(_)
        )
    }

    /// Returns the error code for external systems
    pub fn code(&self) -> u32 {
        match self {
            // Authorization errors: 1xxx
            Error::NotOwner(_) => 1001,
            Error::NotProvider(_) => 1002,

            // Lifecycle errors: 2xxx
            Error::Paused => 2001,
            Error::BatchClosed => 2002,

            // Rate limiting errors: 3xxx
            Error::CooldownActive { .. } => 3001,

            // Input validity errors: 4xxx
            Error::InvalidParameter { .. } => 4001,
            Error::NotInitialized(_) => 4002,

            // Oracle integrity errors: 5xxx
            Error::ReplayAttempt(_) => 5001,
            Error::StateMismatch { .. } => 5002,
            Error::InvalidProof(_) => 5003,

            // Internal errors: 9xxx
            Error::Serialization(_) => 9001,
            Error::Storage(_) => 9002,
            Error::Crypto { .. } => 9003,
            Error::Internal(_) => 9004,
        }
    }
}
