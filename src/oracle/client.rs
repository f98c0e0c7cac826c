//! Decryption oracle capability and the bundled local oracle.
//!
//! The ledger submits aggregate ciphertext handles for decryption through
//! the [`DecryptionOracle`] trait and later receives a cleartext payload
//! plus a proof. Proof verification is delegated back to the capability as
//! an opaque pass/fail check. [`LocalOracle`] is the reference
//! implementation: it issues sequential request identifiers and signs
//! results with a secp256k1 key.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::error::Result;
use crate::fhe::CiphertextHandle;
use crate::utils::constants::PROOF_MESSAGE_TAG;
use crate::utils::crypto::{Hash, KeyPair, PublicKey, Signature};

// ═══════════════════════════════════════════════════════════════════════════════
// REQUEST ID
// ═══════════════════════════════════════════════════════════════════════════════

/// Identifier of an outstanding decryption request, issued by the oracle
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct RequestId(u64);

impl RequestId {
    /// Create a request id from its raw value
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Raw id value
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ORACLE CAPABILITY
// ═══════════════════════════════════════════════════════════════════════════════

/// Capability interface to the external decryption oracle
pub trait DecryptionOracle {
    /// Submit ciphertext handles for decryption; returns the request id the
    /// oracle will answer under
    fn request_decryption(&mut self, handles: &[CiphertextHandle]) -> Result<RequestId>;

    /// Verify the cryptographic proof accompanying a decryption result
    fn verify_proof(&self, request_id: RequestId, payload: &[u8], proof: &[u8]) -> bool;
}

/// Message hash an oracle proof signs: the request id bound to the payload
pub fn proof_message(request_id: RequestId, payload: &[u8]) -> Hash {
    Hash::sha256_tagged(
        PROOF_MESSAGE_TAG,
        &[&request_id.value().to_le_bytes(), payload],
    )
}

// ═══════════════════════════════════════════════════════════════════════════════
// LOCAL ORACLE
// ═══════════════════════════════════════════════════════════════════════════════

/// In-process oracle signing results with a secp256k1 key.
///
/// Request ids are sequential starting at 1. The oracle remembers which
/// handles each request covers so an operator (or a test) can produce the
/// matching result out of band and sign it with [`LocalOracle::sign_result`].
pub struct LocalOracle {
    keypair: KeyPair,
    next_id: u64,
    pending: HashMap<RequestId, Vec<CiphertextHandle>>,
}

impl LocalOracle {
    /// Create a local oracle with a freshly generated signing key
    pub fn new() -> Self {
        Self::with_keypair(KeyPair::generate())
    }

    /// Create a local oracle with an explicit signing key
    pub fn with_keypair(keypair: KeyPair) -> Self {
        Self {
            keypair,
            next_id: 1,
            pending: HashMap::new(),
        }
    }

    /// The oracle's verification key
    pub fn public_key(&self) -> &PublicKey {
        self.keypair.public_key()
    }

    /// Handles recorded for an outstanding request
    pub fn pending_handles(&self, request_id: RequestId) -> Option<&[CiphertextHandle]> {
        self.pending.get(&request_id).map(Vec::as_slice)
    }

    /// Produce the proof for a result payload: a compact ECDSA signature
    /// over the request id and payload
    pub fn sign_result(&self, request_id: RequestId, payload: &[u8]) -> Vec<u8> {
        let message = proof_message(request_id, payload);
        self.keypair.sign(&message).as_bytes().to_vec()
    }
}

impl Default for LocalOracle {
    fn default() -> Self {
        Self::new()
    }
}

impl DecryptionOracle for LocalOracle {
    fn request_decryption(&mut self, handles: &[CiphertextHandle]) -> Result<RequestId> {
        let request_id = RequestId::new(self.next_id);
        self.next_id += 1;
        self.pending.insert(request_id, handles.to_vec());
        Ok(request_id)
    }

    fn verify_proof(&self, request_id: RequestId, payload: &[u8], proof: &[u8]) -> bool {
        let signature = match Signature::from_slice(proof) {
            Ok(sig) => sig,
            Err(_) => return false,
        };
        let message = proof_message(request_id, payload);
        self.keypair.public_key().verify(&message, &signature)
    }
}

impl fmt::Debug for LocalOracle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalOracle")
            .field("next_id", &self.next_id)
            .field("pending", &self.pending.len())
            .finish()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
