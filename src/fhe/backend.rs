//! Homomorphic backend capability and the bundled simulator.
//!
//! The ledger consumes the encryption primitive exclusively through the
//! [`FheBackend`] trait, so the concrete co-processor is swappable without
//! touching ledger logic. [`SimulatorBackend`] is the reference
//! implementation shipped with the crate: a keyed-keystream simulation that
//! preserves the contract the ledger depends on — opaque payloads, wrapping
//! u32 addition, and fully deterministic `add`/`encode_zero` so that
//! re-running a fold reproduces byte-identical results.

use rand::RngCore;
use std::fmt;

use crate::error::{Error, Result};
use crate::fhe::ciphertext::{Ciphertext, CiphertextHandle};
use crate::utils::constants::{CIPHERTEXT_NONCE_LENGTH, CIPHERTEXT_PAYLOAD_LENGTH};

// ═══════════════════════════════════════════════════════════════════════════════
// BACKEND TRAIT
// ═══════════════════════════════════════════════════════════════════════════════

/// Capability interface to the homomorphic encryption co-processor.
///
/// `add` and `encode_zero` must be deterministic functions of their inputs:
/// the ledger re-derives aggregate fingerprints by re-running folds and
/// compares the results byte-for-byte.
pub trait FheBackend {
    /// The ciphertext encoding of zero
    fn encode_zero(&self) -> Ciphertext;

    /// Homomorphic addition of two ciphertexts (wrapping u32 semantics)
    fn add(&self, a: &Ciphertext, b: &Ciphertext) -> Result<Ciphertext>;

    /// The initialized predicate: true if `ct` is a well-formed encryption
    fn is_initialized(&self, ct: &Ciphertext) -> bool;

    /// Export a ciphertext to its fixed-size opaque transport handle
    fn export_handle(&self, ct: &Ciphertext) -> Result<CiphertextHandle>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// SIMULATOR BACKEND
// ═══════════════════════════════════════════════════════════════════════════════

/// Keyed-keystream simulation of the FHE co-processor.
///
/// Payload layout: 16-byte nonce followed by the 4-byte value masked with a
/// Blake3 keyed keystream. Every instance constructed from the same key (or
/// seed) interoperates; `encrypt_u32` draws a fresh random nonce so equal
/// plaintexts do not produce equal payloads, while `add` derives its nonce
/// from both operand payloads to stay deterministic.
#[derive(Clone)]
pub struct SimulatorBackend {
    key: [u8; 32],
}

impl SimulatorBackend {
    /// Create a backend from an explicit 32-byte key
    pub fn new(key: [u8; 32]) -> Self {
        Self { key }
    }

    /// Derive a backend key from a small seed
    pub fn from_seed(seed: u64) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"cipherledger:simulator-key:v1");
        hasher.update(&seed.to_le_bytes());
        Self {
            key: *hasher.finalize().as_bytes(),
        }
    }

    /// Encrypt a plaintext u32 with a fresh random nonce.
    ///
    /// Provider-side helper: the ledger itself never calls this.
    pub fn encrypt_u32(&self, value: u32) -> Ciphertext {
        let mut nonce = [0u8; CIPHERTEXT_NONCE_LENGTH];
        rand::thread_rng().fill_bytes(&mut nonce);
        self.encrypt_with_nonce(value, &nonce)
    }

    /// Decrypt a ciphertext produced by a backend with the same key.
    ///
    /// Test/oracle-side helper: ledger code has no path to plaintext.
    pub fn decrypt_u32(&self, ct: &Ciphertext) -> Result<u32> {
        let payload = ct.payload();
        if payload.len() != CIPHERTEXT_PAYLOAD_LENGTH {
            return Err(Error::NotInitialized("ciphertext".into()));
        }

        let nonce = &payload[..CIPHERTEXT_NONCE_LENGTH];
        let mask = self.keystream(nonce);
        let mut value_bytes = [0u8; 4];
        for (i, byte) in payload[CIPHERTEXT_NONCE_LENGTH..].iter().enumerate() {
            value_bytes[i] = byte ^ mask[i];
        }
        Ok(u32::from_le_bytes(value_bytes))
    }

    fn encrypt_with_nonce(&self, value: u32, nonce: &[u8; CIPHERTEXT_NONCE_LENGTH]) -> Ciphertext {
        let mask = self.keystream(nonce);
        let value_bytes = value.to_le_bytes();

        let mut payload = Vec::with_capacity(CIPHERTEXT_PAYLOAD_LENGTH);
        payload.extend_from_slice(nonce);
        for i in 0..4 {
            payload.push(value_bytes[i] ^ mask[i]);
        }
        Ciphertext::from_payload(payload)
    }

    fn keystream(&self, nonce: &[u8]) -> [u8; 4] {
        let mut hasher = blake3::Hasher::new_keyed(&self.key);
        hasher.update(b"mask");
        hasher.update(nonce);
        let digest = hasher.finalize();
        let mut mask = [0u8; 4];
        mask.copy_from_slice(&digest.as_bytes()[..4]);
        mask
    }

    /// Nonce for an addition result, derived from both operand payloads so
    /// the same fold always reproduces the same bytes.
    fn derived_nonce(&self, tag: &[u8], parts: &[&[u8]]) -> [u8; CIPHERTEXT_NONCE_LENGTH] {
        let mut hasher = blake3::Hasher::new_keyed(&self.key);
        hasher.update(tag);
        for part in parts {
            hasher.update(&(part.len() as u64).to_le_bytes());
            hasher.update(part);
        }
        let digest = hasher.finalize();
        let mut nonce = [0u8; CIPHERTEXT_NONCE_LENGTH];
        nonce.copy_from_slice(&digest.as_bytes()[..CIPHERTEXT_NONCE_LENGTH]);
        nonce
    }
}

impl FheBackend for SimulatorBackend {
    fn encode_zero(&self) -> Ciphertext {
        let nonce = self.derived_nonce(b"zero", &[]);
        self.encrypt_with_nonce(0, &nonce)
    }

    fn add(&self, a: &Ciphertext, b: &Ciphertext) -> Result<Ciphertext> {
        let lhs = self.decrypt_u32(a)?;
        let rhs = self.decrypt_u32(b)?;
        let sum = lhs.wrapping_add(rhs);

        let nonce = self.derived_nonce(b"add", &[a.payload(), b.payload()]);
        Ok(self.encrypt_with_nonce(sum, &nonce))
    }

    fn is_initialized(&self, ct: &Ciphertext) -> bool {
        ct.payload().len() == CIPHERTEXT_PAYLOAD_LENGTH
    }

    fn export_handle(&self, ct: &Ciphertext) -> Result<CiphertextHandle> {
        if !self.is_initialized(ct) {
            return Err(Error::NotInitialized("ciphertext".into()));
        }
        let digest = blake3::hash(ct.payload());
        Ok(CiphertextHandle::new(*digest.as_bytes()))
    }
}

impl fmt::Debug for SimulatorBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SimulatorBackend {{ key: [REDACTED] }}")
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
