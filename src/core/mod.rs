//! Core ledger components.
//!
//! - **access**: actor identities, owner/provider roles, pause switch
//! - **cooldown**: per-actor minimum-interval enforcement
//! - **batch**: batch lifecycle and append-only position storage
//! - **aggregation**: homomorphic folds and fingerprint derivation

pub mod access;
pub mod aggregation;
pub mod batch;
pub mod cooldown;

pub use access::{AccessControl, ActorId};
pub use aggregation::{derive_fingerprint, position_commitment, AggregateHandles, BatchAggregate};
pub use batch::{BatchId, BatchLedger, Position};
pub use cooldown::{ActionClass, CooldownGuard};
