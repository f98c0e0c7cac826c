//! Per-actor rate limiting between actions of the same class.
//!
//! The guard is check/record split: callers check before executing a guarded
//! operation and record only after it fully succeeds, so a failed operation
//! never consumes or advances the actor's cooldown window.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::core::access::ActorId;
use crate::error::{Error, Result};
use crate::utils::constants::DEFAULT_COOLDOWN_SECS;

// ═══════════════════════════════════════════════════════════════════════════════
// ACTION CLASS
// ═══════════════════════════════════════════════════════════════════════════════

/// The rate-limited action classes, tracked independently per actor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionClass {
    /// Submitting an encrypted position to the open batch
    Submission,
    /// Requesting aggregation and decryption of a batch
    DecryptionRequest,
}

impl ActionClass {
    /// Get the action class as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Submission => "submission",
            Self::DecryptionRequest => "decryption_request",
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// COOLDOWN GUARD
// ═══════════════════════════════════════════════════════════════════════════════

/// Per-actor, per-action-class minimum-interval enforcement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CooldownGuard {
    interval_secs: u64,
    last_submission: HashMap<ActorId, u64>,
    last_decryption_request: HashMap<ActorId, u64>,
}

impl Default for CooldownGuard {
    fn default() -> Self {
        Self {
            interval_secs: DEFAULT_COOLDOWN_SECS,
            last_submission: HashMap::new(),
            last_decryption_request: HashMap::new(),
        }
    }
}

impl CooldownGuard {
    /// Create a guard with the given interval (must be nonzero)
    pub fn new(interval_secs: u64) -> Result<Self> {
        let mut guard = Self::default();
        guard.set_interval(interval_secs)?;
        Ok(guard)
    }

    /// Current minimum interval in seconds
    pub fn interval_secs(&self) -> u64 {
        self.interval_secs
    }

    /// Update the minimum interval. A zero interval would disable rate
    /// limiting and is rejected.
    pub fn set_interval(&mut self, interval_secs: u64) -> Result<()> {
        if interval_secs == 0 {
            return Err(Error::InvalidParameter {
                name: "cooldown".into(),
                reason: "interval must be greater than zero".into(),
            });
        }
        self.interval_secs = interval_secs;
        Ok(())
    }

    /// Fail with CooldownActive if the actor acted in this class less than
    /// one interval ago.
    pub fn check(&self, class: ActionClass, actor: &ActorId, now: u64) -> Result<()> {
        if let Some(&last) = self.timestamps(class).get(actor) {
            let ready_at = last.saturating_add(self.interval_secs);
            if now < ready_at {
                return Err(Error::CooldownActive {
                    remaining_secs: ready_at - now,
                });
            }
        }
        Ok(())
    }

    /// Record a successful action. Call only after the guarded operation
    /// has fully succeeded.
    pub fn record(&mut self, class: ActionClass, actor: ActorId, now: u64) {
        self.timestamps_mut(class).insert(actor, now);
    }

    /// Last recorded action time for the actor in this class
    pub fn last_action(&self, class: ActionClass, actor: &ActorId) -> Option<u64> {
        self.timestamps(class).get(actor).copied()
    }

    fn timestamps(&self, class: ActionClass) -> &HashMap<ActorId, u64> {
        match class {
            ActionClass::Submission => &self.last_submission,
            ActionClass::DecryptionRequest => &self.last_decryption_request,
        }
    }

    fn timestamps_mut(&mut self, class: ActionClass) -> &mut HashMap<ActorId, u64> {
        match class {
            ActionClass::Submission => &mut self.last_submission,
            ActionClass::DecryptionRequest => &mut self.last_decryption_request,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    fn actor(byte: u8) -> ActorId {
        ActorId::new([byte; 32])
    }

    #[test]
    fn test_first_action_always_passes() {
        let guard = CooldownGuard::new(60).unwrap();
        assert!(guard.check(ActionClass::Submission, &actor(1), 0).is_ok());
        assert!(guard
            .check(ActionClass::DecryptionRequest, &actor(1), 0)
            .is_ok());
    }

    #[test]
    fn test_cooldown_window_boundary() {
        let mut guard = CooldownGuard::new(60).unwrap();
        let a = actor(1);

        guard.record(ActionClass::Submission, a, 100);

        // Strictly inside the window: rejected with the exact remainder
        assert_eq!(
            guard.check(ActionClass::Submission, &a, 159),
            Err(Error::CooldownActive { remaining_secs: 1 })
        );

        // At the boundary: allowed
        assert!(guard.check(ActionClass::Submission, &a, 160).is_ok());
    }

    #[test]
    fn test_classes_tracked_independently() {
        let mut guard = CooldownGuard::new(60).unwrap();
        let a = actor(1);

        guard.record(ActionClass::Submission, a, 100);
        assert!(guard.check(ActionClass::Submission, &a, 110).is_err());
        assert!(guard
            .check(ActionClass::DecryptionRequest, &a, 110)
            .is_ok());
    }

    #[test]
    fn test_actors_tracked_independently() {
        let mut guard = CooldownGuard::new(60).unwrap();

        guard.record(ActionClass::Submission, actor(1), 100);
        assert!(guard.check(ActionClass::Submission, &actor(1), 110).is_err());
        assert!(guard.check(ActionClass::Submission, &actor(2), 110).is_ok());
    }

    #[test]
    fn test_zero_interval_rejected() {
        assert!(CooldownGuard::new(0).is_err());

        let mut guard = CooldownGuard::new(60).unwrap();
        assert!(guard.set_interval(0).is_err());
        assert_eq!(guard.interval_secs(), 60);
    }

    #[test]
    fn test_failed_operation_does_not_consume_window() {
        let mut guard = CooldownGuard::new(60).unwrap();
        let a = actor(1);

        guard.record(ActionClass::Submission, a, 100);

        // A rejected check must not move the window forward
        assert!(guard.check(ActionClass::Submission, &a, 120).is_err());
        assert_eq!(guard.last_action(ActionClass::Submission, &a), Some(100));
        assert!(guard.check(ActionClass::Submission, &a, 160).is_ok());
    }
}
