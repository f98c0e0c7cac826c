//! Protocol constants and magic numbers.
//!
//! All protocol-wide constants are defined here for easy auditing and modification.

// ═══════════════════════════════════════════════════════════════════════════════
// LENGTH CONSTANTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Hash length in bytes (SHA256/Blake3)
pub const HASH_LENGTH: usize = 32;

/// Actor identity length in bytes
pub const ACTOR_ID_LENGTH: usize = 32;

/// Ciphertext transport handle length in bytes
pub const HANDLE_LENGTH: usize = 32;

/// Compressed secp256k1 public key length in bytes
pub const PUBKEY_LENGTH: usize = 33;

/// Compact ECDSA signature length in bytes
pub const SIGNATURE_LENGTH: usize = 64;

/// Nonce length inside a simulated ciphertext payload
pub const CIPHERTEXT_NONCE_LENGTH: usize = 16;

/// Total simulated ciphertext payload length (nonce + masked u32)
pub const CIPHERTEXT_PAYLOAD_LENGTH: usize = CIPHERTEXT_NONCE_LENGTH + 4;

/// Cleartext decryption payload length (two little-endian u32 totals)
pub const DECRYPTION_PAYLOAD_LENGTH: usize = 8;

// ═══════════════════════════════════════════════════════════════════════════════
// RATE LIMITING CONSTANTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Default minimum interval between same-class actions by one actor, in seconds
pub const DEFAULT_COOLDOWN_SECS: u64 = 60;

// ═══════════════════════════════════════════════════════════════════════════════
// DOMAIN SEPARATION TAGS
// ═══════════════════════════════════════════════════════════════════════════════

/// Tag for aggregate fingerprints binding a decryption request to ledger state
pub const FINGERPRINT_TAG: &[u8] = b"cipherledger:fingerprint:v1";

/// Tag for per-position content commitments emitted with submission events
pub const POSITION_COMMITMENT_TAG: &[u8] = b"cipherledger:position:v1";

/// Tag for decryption proof message hashes
pub const PROOF_MESSAGE_TAG: &[u8] = b"cipherledger:proof:v1";
