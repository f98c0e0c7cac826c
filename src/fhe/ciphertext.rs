//! Opaque ciphertext value and transport handle types.
//!
//! A [`Ciphertext`] is an encrypted 32-bit unsigned integer. The ledger never
//! inspects its contents: values can only be combined through
//! [`crate::fhe::FheBackend::add`] and exported to a fixed-size
//! [`CiphertextHandle`] for hashing and transport.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::error::{Error, Result};
use crate::utils::constants::HANDLE_LENGTH;

// ═══════════════════════════════════════════════════════════════════════════════
// CIPHERTEXT
// ═══════════════════════════════════════════════════════════════════════════════

/// An opaque encrypted 32-bit unsigned integer.
///
/// The payload bytes carry no meaning outside the backend that produced them.
/// An empty payload is the uninitialized state; the authoritative initialized
/// predicate is [`crate::fhe::FheBackend::is_initialized`], which also checks
/// backend-specific well-formedness.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ciphertext {
    payload: Vec<u8>,
}

impl Ciphertext {
    /// Create a ciphertext from backend-produced payload bytes
    pub fn from_payload(payload: Vec<u8>) -> Self {
        Self { payload }
    }

    /// The uninitialized ciphertext (empty payload)
    pub fn uninitialized() -> Self {
        Self { payload: Vec::new() }
    }

    /// Raw payload bytes. Opaque: only a backend can interpret them.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// True if the payload is entirely absent
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

impl Default for Ciphertext {
    fn default() -> Self {
        Self::uninitialized()
    }
}

impl fmt::Debug for Ciphertext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.payload.is_empty() {
            write!(f, "Ciphertext(uninitialized)")
        } else {
            write!(f, "Ciphertext({} bytes)", self.payload.len())
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CIPHERTEXT HANDLE
// ═══════════════════════════════════════════════════════════════════════════════

/// A fixed-size opaque handle referencing a ciphertext for hashing/transport
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CiphertextHandle([u8; HANDLE_LENGTH]);

impl Serialize for CiphertextHandle {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(self.0))
    }
}

impl<'de> Deserialize<'de> for CiphertextHandle {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(&s).map_err(serde::de::Error::custom)?;
        if bytes.len() != HANDLE_LENGTH {
            return Err(serde::de::Error::custom(format!(
                "expected {} bytes, got {}",
                HANDLE_LENGTH,
                bytes.len()
            )));
        }
        let mut arr = [0u8; HANDLE_LENGTH];
        arr.copy_from_slice(&bytes);
        Ok(CiphertextHandle(arr))
    }
}

impl CiphertextHandle {
    /// Create a handle from bytes
    pub fn new(bytes: [u8; HANDLE_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Create a handle from a slice (must be exactly 32 bytes)
    pub fn from_slice(slice: &[u8]) -> Result<Self> {
        if slice.len() != HANDLE_LENGTH {
            return Err(Error::InvalidParameter {
                name: "handle".into(),
                reason: format!("expected {} bytes, got {}", HANDLE_LENGTH, slice.len()),
            });
        }
        let mut bytes = [0u8; HANDLE_LENGTH];
        bytes.copy_from_slice(slice);
        Ok(Self(bytes))
    }

    /// Get the handle as bytes
    pub fn as_bytes(&self) -> &[u8; HANDLE_LENGTH] {
        &self.0
    }

    /// Convert to hex string
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for CiphertextHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CiphertextHandle({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for CiphertextHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl AsRef<[u8]> for CiphertextHandle {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uninitialized_ciphertext() {
        let ct = Ciphertext::uninitialized();
        assert!(ct.is_empty());
        assert_eq!(ct, Ciphertext::default());
    }

    #[test]
    fn test_ciphertext_debug_hides_payload() {
        let ct = Ciphertext::from_payload(vec![0xAB; 20]);
        let rendered = format!("{:?}", ct);
        assert!(!rendered.contains("ab"));
        assert!(rendered.contains("20 bytes"));
    }

    #[test]
    fn test_handle_from_slice_length_check() {
        assert!(CiphertextHandle::from_slice(&[1u8; 32]).is_ok());
        assert!(CiphertextHandle::from_slice(&[1u8; 31]).is_err());
    }

    #[test]
    fn test_handle_hex() {
        let handle = CiphertextHandle::new([7u8; 32]);
        assert_eq!(handle.to_hex().len(), 64);
    }
}
