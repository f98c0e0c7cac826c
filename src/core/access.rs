//! Actor identities and access control.
//!
//! The ledger recognizes exactly two roles: a single owner who administers
//! the system, and a set of providers authorized to submit encrypted
//! positions and request aggregations. A pause switch gates every mutating
//! operation; unpausing is the only operation allowed while paused.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashSet;
use std::fmt;

use crate::error::{Error, Result};
use crate::utils::constants::ACTOR_ID_LENGTH;
use crate::utils::crypto::{Hash, PublicKey};

// ═══════════════════════════════════════════════════════════════════════════════
// ACTOR ID
// ═══════════════════════════════════════════════════════════════════════════════

/// A 32-byte actor identity.
///
/// The zero identity is reserved as invalid and never enters the provider
/// set.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActorId([u8; ACTOR_ID_LENGTH]);

impl Serialize for ActorId {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(self.0))
    }
}

impl<'de> Deserialize<'de> for ActorId {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(&s).map_err(serde::de::Error::custom)?;
        if bytes.len() != ACTOR_ID_LENGTH {
            return Err(serde::de::Error::custom(format!(
                "expected {} bytes, got {}",
                ACTOR_ID_LENGTH,
                bytes.len()
            )));
        }
        let mut arr = [0u8; ACTOR_ID_LENGTH];
        arr.copy_from_slice(&bytes);
        Ok(ActorId(arr))
    }
}

impl ActorId {
    /// Create an actor id from bytes
    pub fn new(bytes: [u8; ACTOR_ID_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Derive an actor id from a secp256k1 public key
    pub fn from_public_key(pubkey: &PublicKey) -> Self {
        Self(*Hash::sha256(pubkey.as_bytes()).as_bytes())
    }

    /// The zero identity (invalid)
    pub fn zero() -> Self {
        Self([0u8; ACTOR_ID_LENGTH])
    }

    /// Check if this is the zero identity
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; ACTOR_ID_LENGTH]
    }

    /// Get the identity as bytes
    pub fn as_bytes(&self) -> &[u8; ACTOR_ID_LENGTH] {
        &self.0
    }

    /// Convert to hex string
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Short representation for display
    pub fn short(&self) -> String {
        let hex = self.to_hex();
        format!("{}...{}", &hex[..8], &hex[hex.len() - 8..])
    }
}

impl fmt::Debug for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ActorId({})", self.short())
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ACCESS CONTROL
// ═══════════════════════════════════════════════════════════════════════════════

/// Owner identity, provider allow-set and pause switch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessControl {
    owner: ActorId,
    providers: HashSet<ActorId>,
    paused: bool,
}

impl AccessControl {
    /// Create access control with the given owner
    pub fn new(owner: ActorId) -> Result<Self> {
        if owner.is_zero() {
            return Err(Error::InvalidParameter {
                name: "owner".into(),
                reason: "owner identity must not be zero".into(),
            });
        }
        Ok(Self {
            owner,
            providers: HashSet::new(),
            paused: false,
        })
    }

    /// The owner identity
    pub fn owner(&self) -> ActorId {
        self.owner
    }

    /// Whether the ledger is paused
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Whether the actor is an authorized provider
    pub fn is_provider(&self, actor: &ActorId) -> bool {
        self.providers.contains(actor)
    }

    /// Number of authorized providers
    pub fn provider_count(&self) -> usize {
        self.providers.len()
    }

    /// Fail with NotOwner unless the caller is the owner
    pub fn ensure_owner(&self, caller: &ActorId) -> Result<()> {
        if *caller != self.owner {
            return Err(Error::NotOwner(caller.short()));
        }
        Ok(())
    }

    /// Fail with NotProvider unless the caller is an authorized provider
    pub fn ensure_provider(&self, caller: &ActorId) -> Result<()> {
        if !self.providers.contains(caller) {
            return Err(Error::NotProvider(caller.short()));
        }
        Ok(())
    }

    /// Fail with Paused if the ledger is paused
    pub fn ensure_active(&self) -> Result<()> {
        if self.paused {
            return Err(Error::Paused);
        }
        Ok(())
    }

    /// Authorize a provider.
    ///
    /// Returns true if the provider was newly added; re-adding an already
    /// authorized provider is a silent no-op write. The zero identity is
    /// rejected.
    pub fn authorize_provider(&mut self, provider: ActorId) -> Result<bool> {
        if provider.is_zero() {
            return Err(Error::InvalidParameter {
                name: "provider".into(),
                reason: "provider identity must not be zero".into(),
            });
        }
        Ok(self.providers.insert(provider))
    }

    /// Revoke a provider. Unlike re-adding, revoking a non-provider is an
    /// error.
    pub fn revoke_provider(&mut self, provider: &ActorId) -> Result<()> {
        if !self.providers.remove(provider) {
            return Err(Error::NotProvider(provider.short()));
        }
        Ok(())
    }

    /// Engage the pause switch. Fails with Paused if already engaged.
    pub fn pause(&mut self) -> Result<()> {
        if self.paused {
            return Err(Error::Paused);
        }
        self.paused = true;
        Ok(())
    }

    /// Release the pause switch. Returns true if the state changed.
    pub fn unpause(&mut self) -> bool {
        let changed = self.paused;
        self.paused = false;
        changed
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
