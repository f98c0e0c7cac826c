//! Decryption oracle boundary.
//!
//! This module holds both sides of the asynchronous decryption protocol:
//! the [`DecryptionOracle`] capability the ledger submits requests through,
//! and the [`OracleBridge`] that records outstanding requests and verifies
//! results when they arrive at an arbitrary later time.

pub mod bridge;
pub mod client;

pub use bridge::{DecryptedTotals, DecryptionContext, OracleBridge};
pub use client::{proof_message, DecryptionOracle, LocalOracle, RequestId};
