//! Bridge between the ledger and the asynchronous decryption oracle.
//!
//! The bridge records every outstanding decryption request as a
//! [`DecryptionContext`] keyed by the oracle-issued request id, and applies
//! the full integrity gauntlet when a result is delivered: replay check,
//! fingerprint comparison against the re-derived current state, proof
//! verification, payload decoding. Contexts transition `Pending` →
//! `Completed` exactly once and are never deleted.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::core::batch::BatchId;
use crate::error::{Error, Result};
use crate::oracle::client::{DecryptionOracle, RequestId};
use crate::utils::constants::DECRYPTION_PAYLOAD_LENGTH;
use crate::utils::crypto::Hash;

// ═══════════════════════════════════════════════════════════════════════════════
// DECRYPTED TOTALS
// ═══════════════════════════════════════════════════════════════════════════════

/// The two plaintext totals revealed by a completed decryption
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecryptedTotals {
    /// Sum of all loan amounts in the batch
    pub loan_total: u32,
    /// Sum of all collateral amounts in the batch
    pub collateral_total: u32,
}

impl DecryptedTotals {
    /// Encode as the 8-byte little-endian wire payload
    pub fn encode(&self) -> Vec<u8> {
        let mut payload = Vec::with_capacity(DECRYPTION_PAYLOAD_LENGTH);
        payload.extend_from_slice(&self.loan_total.to_le_bytes());
        payload.extend_from_slice(&self.collateral_total.to_le_bytes());
        payload
    }

    /// Decode from the wire payload (must be exactly 8 bytes)
    pub fn decode(payload: &[u8]) -> Result<Self> {
        if payload.len() != DECRYPTION_PAYLOAD_LENGTH {
            return Err(Error::InvalidParameter {
                name: "payload".into(),
                reason: format!(
                    "expected {} bytes, got {}",
                    DECRYPTION_PAYLOAD_LENGTH,
                    payload.len()
                ),
            });
        }

        let mut loan = [0u8; 4];
        let mut collateral = [0u8; 4];
        loan.copy_from_slice(&payload[..4]);
        collateral.copy_from_slice(&payload[4..]);

        Ok(Self {
            loan_total: u32::from_le_bytes(loan),
            collateral_total: u32::from_le_bytes(collateral),
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// DECRYPTION CONTEXT
// ═══════════════════════════════════════════════════════════════════════════════

/// State recorded for one decryption request at issue time.
///
/// `processed` flips false→true at most once and never reverts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecryptionContext {
    /// Batch the request aggregates
    pub batch_id: BatchId,
    /// Fingerprint of the aggregate state that produced the request
    pub fingerprint: Hash,
    /// Whether the result has been consumed
    pub processed: bool,
    /// Ledger time when the request was issued
    pub requested_at: u64,
}

// ═══════════════════════════════════════════════════════════════════════════════
// ORACLE BRIDGE
// ═══════════════════════════════════════════════════════════════════════════════

/// Outstanding and completed decryption contexts, keyed by request id
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleBridge {
    contexts: HashMap<RequestId, DecryptionContext>,
}

impl OracleBridge {
    /// Create an empty bridge
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the context for a freshly issued request.
    ///
    /// The oracle owns the id space; a duplicate id means the collaborator
    /// broke its contract.
    pub fn register(
        &mut self,
        request_id: RequestId,
        batch_id: BatchId,
        fingerprint: Hash,
        now: u64,
    ) -> Result<()> {
        if self.contexts.contains_key(&request_id) {
            return Err(Error::Internal(format!(
                "oracle issued duplicate request id {}",
                request_id
            )));
        }
        self.contexts.insert(
            request_id,
            DecryptionContext {
                batch_id,
                fingerprint,
                processed: false,
                requested_at: now,
            },
        );
        Ok(())
    }

    /// Look up a context
    pub fn context(&self, request_id: RequestId) -> Option<&DecryptionContext> {
        self.contexts.get(&request_id)
    }

    /// Batch a pending (unprocessed) request refers to
    pub fn pending_batch(&self, request_id: RequestId) -> Option<BatchId> {
        self.contexts
            .get(&request_id)
            .filter(|c| !c.processed)
            .map(|c| c.batch_id)
    }

    /// Number of contexts still pending
    pub fn pending_count(&self) -> usize {
        self.contexts.values().filter(|c| !c.processed).count()
    }

    /// Total number of contexts ever registered
    pub fn context_count(&self) -> usize {
        self.contexts.len()
    }

    /// Apply a delivered decryption result.
    ///
    /// `current_fingerprint` must be re-derived by the caller from the
    /// authoritative current aggregate of the context's batch. Check order
    /// is fixed: replay, fingerprint, proof, payload. Every failure leaves
    /// the context exactly as it was; only a fully verified result marks it
    /// processed.
    pub fn verify_and_consume<O: DecryptionOracle>(
        &mut self,
        oracle: &O,
        request_id: RequestId,
        payload: &[u8],
        proof: &[u8],
        current_fingerprint: &Hash,
    ) -> Result<(BatchId, DecryptedTotals)> {
        let context = match self.contexts.get(&request_id) {
            Some(context) if !context.processed => context,
            _ => return Err(Error::ReplayAttempt(request_id.to_string())),
        };

        if context.fingerprint != *current_fingerprint {
            return Err(Error::StateMismatch {
                stored: context.fingerprint.to_hex(),
                current: current_fingerprint.to_hex(),
            });
        }

        if !oracle.verify_proof(request_id, payload, proof) {
            return Err(Error::InvalidProof(request_id.to_string()));
        }

        let totals = DecryptedTotals::decode(payload)?;
        let batch_id = context.batch_id;

        let context = self
            .contexts
            .get_mut(&request_id)
            .ok_or_else(|| Error::Internal("context vanished during completion".into()))?;
        context.processed = true;

        Ok((batch_id, totals))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
