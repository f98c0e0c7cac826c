//! # CipherLedger Protocol
//!
//! An encrypted-batch aggregation ledger: authorized providers submit opaque
//! encrypted positions, the ledger homomorphically accumulates them per
//! batch without ever seeing plaintext, and an external decryption oracle
//! later returns the plaintext totals — verified against the exact
//! ciphertext state that produced the request.
//!
//! ## Architecture
//!
//! The protocol consists of several core modules:
//!
//! - **Core**: access control, rate limiting, batch lifecycle, aggregation
//! - **Fhe**: the opaque ciphertext type and homomorphic backend boundary
//! - **Oracle**: the decryption request/callback protocol with replay and
//!   tamper protection
//! - **Protocol**: the sequential state machine tying everything together
//!
//! ## Trust boundary
//!
//! Every mutating operation is gated by role, pause state and per-actor
//! cooldowns; a decryption result is accepted only if its request is still
//! pending, the aggregate fingerprint re-derived from current state matches
//! the one stored at request time, and the oracle's cryptographic proof
//! verifies.
//!
//! ## Example
//!
//! ```rust,ignore
//! use cipherledger::prelude::*;
//!
//! let mut ledger = LedgerStateMachine::new(owner, instance_id, backend, oracle)?;
//! ledger.add_provider(&owner, provider)?;
//! ledger.open_batch(&owner)?;
//! ledger.submit_position(&provider, loan_ct, collateral_ct)?;
//! let request_id = ledger.request_aggregation(&provider, batch_id)?;
//! // ... later, the oracle answers:
//! let (batch, totals) = ledger.on_decryption_result(request_id, &payload, &proof)?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    trivial_casts,
    unused_lifetimes,
    unused_qualifications
)]

pub mod core;
pub mod error;
pub mod fhe;
pub mod oracle;
pub mod protocol;
pub mod storage;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::core::{
        access::{AccessControl, ActorId},
        aggregation::{AggregateHandles, BatchAggregate},
        batch::{BatchId, BatchLedger, Position},
        cooldown::{ActionClass, CooldownGuard},
    };
    pub use crate::error::{Error, Result};
    pub use crate::fhe::{Ciphertext, CiphertextHandle, FheBackend, SimulatorBackend};
    pub use crate::oracle::{
        bridge::{DecryptedTotals, DecryptionContext, OracleBridge},
        client::{DecryptionOracle, LocalOracle, RequestId},
    };
    pub use crate::protocol::{
        events::{EventLog, LedgerEvent},
        state_machine::{LedgerState, LedgerStateMachine},
    };
    pub use crate::utils::crypto::{Hash, KeyPair, PublicKey, Signature};
}

/// Protocol version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Protocol name
pub const PROTOCOL_NAME: &str = "CipherLedger";
