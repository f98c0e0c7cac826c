//! Ledger State Machine - Core orchestration engine.
//!
//! The state machine is the single owner of all mutable ledger state. Every
//! entry point is applied as one indivisible step: all checks run before any
//! mutation, so a rejected call leaves the ledger untouched. The decryption
//! callback is the only asynchronous boundary and goes through the same
//! exclusive-owner path; its correctness rests on the fingerprint and proof
//! checks, not on caller identity.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::core::access::{AccessControl, ActorId};
use crate::core::aggregation::{position_commitment, BatchAggregate};
use crate::core::batch::{BatchId, BatchLedger, Position};
use crate::core::cooldown::{ActionClass, CooldownGuard};
use crate::error::{Error, Result};
use crate::fhe::{Ciphertext, FheBackend};
use crate::oracle::bridge::{DecryptedTotals, DecryptionContext, OracleBridge};
use crate::oracle::client::{DecryptionOracle, RequestId};
use crate::protocol::events::*;
use crate::utils::crypto::Hash;

// ═══════════════════════════════════════════════════════════════════════════════
// LEDGER STATE
// ═══════════════════════════════════════════════════════════════════════════════

/// The complete durable state of one ledger instance.
///
/// Modeled as a single owned aggregate so that persistence is a plain
/// snapshot and every mutation flows through one exclusive reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerState {
    /// Identity of this ledger instance, bound into every fingerprint
    instance_id: Hash,
    /// Owner, provider allow-set and pause switch
    access: AccessControl,
    /// Per-actor rate limiting
    cooldowns: CooldownGuard,
    /// Batch lifecycle and position storage
    batches: BatchLedger,
    /// Outstanding and completed decryption contexts
    bridge: OracleBridge,
    /// Current ledger time (seconds), advanced monotonically
    clock: u64,
}

impl LedgerState {
    /// Create the initial state for a new ledger instance
    pub fn new(owner: ActorId, instance_id: Hash) -> Result<Self> {
        Ok(Self {
            instance_id,
            access: AccessControl::new(owner)?,
            cooldowns: CooldownGuard::default(),
            batches: BatchLedger::new(),
            bridge: OracleBridge::new(),
            clock: 0,
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// STATE MACHINE
// ═══════════════════════════════════════════════════════════════════════════════

/// Ledger state machine - orchestrates all operations
pub struct LedgerStateMachine<B: FheBackend, O: DecryptionOracle> {
    /// Durable ledger state
    state: LedgerState,
    /// Homomorphic backend capability
    backend: B,
    /// Decryption oracle capability
    oracle: O,
    /// Events accumulated since the last drain
    event_log: EventLog,
}

impl<B: FheBackend, O: DecryptionOracle> LedgerStateMachine<B, O> {
    /// Create a new ledger with the given owner and collaborators
    pub fn new(
        owner: ActorId,
        instance_id: Hash,
        backend: B,
        oracle: O,
    ) -> Result<Self> {
        Ok(Self {
            state: LedgerState::new(owner, instance_id)?,
            backend,
            oracle,
            event_log: EventLog::new(),
        })
    }

    /// Resume a ledger from a persisted state snapshot
    pub fn from_state(state: LedgerState, backend: B, oracle: O) -> Self {
        Self {
            state,
            backend,
            oracle,
            event_log: EventLog::new(),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // CLOCK
    // ═══════════════════════════════════════════════════════════════════════════

    /// Advance the ledger clock. Time only moves forward.
    pub fn advance_clock(&mut self, now: u64) -> Result<()> {
        if now < self.state.clock {
            return Err(Error::InvalidParameter {
                name: "now".into(),
                reason: format!(
                    "clock cannot move backwards: {} < {}",
                    now, self.state.clock
                ),
            });
        }
        self.state.clock = now;
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // ACCESS CONTROL OPERATIONS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Authorize a provider. Owner-only, requires not paused.
    ///
    /// Re-adding an already authorized provider is a silent no-op write.
    pub fn add_provider(&mut self, caller: &ActorId, provider: ActorId) -> Result<()> {
        self.state.access.ensure_owner(caller)?;
        self.state.access.ensure_active()?;

        let newly_added = self.state.access.authorize_provider(provider)?;
        if newly_added {
            info!(provider = %provider.short(), "provider authorized");
            self.event_log
                .push(LedgerEvent::ProviderAuthorized(ProviderAuthorizedEvent {
                    provider,
                    timestamp: self.state.clock,
                }));
        }
        Ok(())
    }

    /// Revoke a provider. Owner-only, requires not paused, fails with
    /// NotProvider if the identity is not currently authorized.
    pub fn remove_provider(&mut self, caller: &ActorId, provider: &ActorId) -> Result<()> {
        self.state.access.ensure_owner(caller)?;
        self.state.access.ensure_active()?;

        self.state.access.revoke_provider(provider)?;
        info!(provider = %provider.short(), "provider revoked");
        self.event_log
            .push(LedgerEvent::ProviderRevoked(ProviderRevokedEvent {
                provider: *provider,
                timestamp: self.state.clock,
            }));
        Ok(())
    }

    /// Update the cooldown interval. Owner-only, requires not paused, the
    /// interval must be nonzero.
    pub fn set_cooldown(&mut self, caller: &ActorId, interval_secs: u64) -> Result<()> {
        self.state.access.ensure_owner(caller)?;
        self.state.access.ensure_active()?;

        let previous_secs = self.state.cooldowns.interval_secs();
        self.state.cooldowns.set_interval(interval_secs)?;
        self.event_log
            .push(LedgerEvent::CooldownUpdated(CooldownUpdatedEvent {
                previous_secs,
                new_secs: interval_secs,
                timestamp: self.state.clock,
            }));
        Ok(())
    }

    /// Engage the pause switch. Owner-only, fails with Paused if already
    /// engaged.
    pub fn pause(&mut self, caller: &ActorId) -> Result<()> {
        self.state.access.ensure_owner(caller)?;
        self.state.access.pause()?;

        info!("ledger paused");
        self.event_log.push(LedgerEvent::LedgerPaused(LedgerPausedEvent {
            timestamp: self.state.clock,
        }));
        Ok(())
    }

    /// Release the pause switch. Owner-only; the sole operation allowed
    /// while paused. Unpausing a running ledger is a silent no-op.
    pub fn unpause(&mut self, caller: &ActorId) -> Result<()> {
        self.state.access.ensure_owner(caller)?;

        if self.state.access.unpause() {
            info!("ledger unpaused");
            self.event_log
                .push(LedgerEvent::LedgerUnpaused(LedgerUnpausedEvent {
                    timestamp: self.state.clock,
                }));
        }
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // BATCH OPERATIONS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Open a new submission window. Owner-only, requires not paused.
    ///
    /// Always allocates a fresh batch id, whether or not a batch is
    /// currently open.
    pub fn open_batch(&mut self, caller: &ActorId) -> Result<BatchId> {
        self.state.access.ensure_owner(caller)?;
        self.state.access.ensure_active()?;

        let batch_id = self.state.batches.open_batch();
        info!(%batch_id, "batch opened");
        self.event_log.push(LedgerEvent::BatchOpened(BatchOpenedEvent {
            batch_id,
            timestamp: self.state.clock,
        }));
        Ok(batch_id)
    }

    /// Close the open submission window. Owner-only, requires not paused,
    /// fails with BatchClosed if no batch is open. Positions are kept.
    pub fn close_batch(&mut self, caller: &ActorId) -> Result<BatchId> {
        self.state.access.ensure_owner(caller)?;
        self.state.access.ensure_active()?;

        let batch_id = self.state.batches.close_batch()?;
        let position_count = self.state.batches.position_count(batch_id);
        info!(%batch_id, position_count, "batch closed");
        self.event_log.push(LedgerEvent::BatchClosed(BatchClosedEvent {
            batch_id,
            position_count,
            timestamp: self.state.clock,
        }));
        Ok(batch_id)
    }

    /// Submit an encrypted position to the open batch.
    ///
    /// Provider-only, requires not paused, the submission cooldown elapsed,
    /// an open batch, and both ciphertexts initialized. Returns the batch id
    /// and the position's index within it.
    pub fn submit_position(
        &mut self,
        caller: &ActorId,
        loan: Ciphertext,
        collateral: Ciphertext,
    ) -> Result<(BatchId, usize)> {
        self.state.access.ensure_provider(caller)?;
        self.state.access.ensure_active()?;
        self.state
            .cooldowns
            .check(ActionClass::Submission, caller, self.state.clock)?;

        if !self.state.batches.is_open() {
            return Err(Error::BatchClosed);
        }

        if !self.backend.is_initialized(&loan) {
            return Err(Error::NotInitialized("loan".into()));
        }
        if !self.backend.is_initialized(&collateral) {
            return Err(Error::NotInitialized("collateral".into()));
        }

        let commitment = position_commitment(
            &self.backend.export_handle(&loan)?,
            &self.backend.export_handle(&collateral)?,
        );

        let (batch_id, index) = self.state.batches.append_position(Position {
            provider: *caller,
            loan,
            collateral,
            submitted_at: self.state.clock,
        })?;

        self.state
            .cooldowns
            .record(ActionClass::Submission, *caller, self.state.clock);

        debug!(%batch_id, index, provider = %caller.short(), "position submitted");
        self.event_log
            .push(LedgerEvent::PositionSubmitted(PositionSubmittedEvent {
                batch_id,
                provider: *caller,
                index,
                commitment,
                timestamp: self.state.clock,
            }));
        Ok((batch_id, index))
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // AGGREGATION OPERATIONS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Fold a batch into its two aggregate sums and request decryption.
    ///
    /// Provider-only, requires not paused and the decryption-request
    /// cooldown elapsed; fails with InvalidParameter on an empty or unknown
    /// batch. Does not mutate the batch: aggregation may be requested any
    /// number of times per batch, each producing an independent context.
    pub fn request_aggregation(
        &mut self,
        caller: &ActorId,
        batch_id: BatchId,
    ) -> Result<RequestId> {
        self.state.access.ensure_provider(caller)?;
        self.state.access.ensure_active()?;
        self.state
            .cooldowns
            .check(ActionClass::DecryptionRequest, caller, self.state.clock)?;

        let positions = self.state.batches.positions(batch_id);
        if positions.is_empty() {
            return Err(Error::InvalidParameter {
                name: "batch_id".into(),
                reason: format!("batch {} has no positions", batch_id),
            });
        }

        let aggregate = BatchAggregate::compute(&self.backend, positions)?;
        let fingerprint = aggregate.fingerprint(&self.state.instance_id);

        let request_id = self
            .oracle
            .request_decryption(&aggregate.handles.as_array())?;
        self.state
            .bridge
            .register(request_id, batch_id, fingerprint, self.state.clock)?;

        self.state
            .cooldowns
            .record(ActionClass::DecryptionRequest, *caller, self.state.clock);

        info!(%request_id, %batch_id, position_count = positions.len(), "decryption requested");
        self.event_log
            .push(LedgerEvent::DecryptionRequested(DecryptionRequestedEvent {
                request_id,
                batch_id,
                fingerprint,
                position_count: positions.len(),
                timestamp: self.state.clock,
            }));
        Ok(request_id)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // ORACLE CALLBACK
    // ═══════════════════════════════════════════════════════════════════════════

    /// Deliver a decryption result. Callable by anyone: authority comes
    /// from the proof, not the caller.
    ///
    /// The fingerprint is re-derived by re-running the fold over the
    /// batch's current position list, so any submission between request and
    /// delivery is detected as StateMismatch. Failures other than
    /// ReplayAttempt leave the context pending for a later, well-formed
    /// delivery.
    pub fn on_decryption_result(
        &mut self,
        request_id: RequestId,
        payload: &[u8],
        proof: &[u8],
    ) -> Result<(BatchId, DecryptedTotals)> {
        let batch_id = self
            .state
            .bridge
            .pending_batch(request_id)
            .ok_or_else(|| {
                warn!(%request_id, "decryption result replayed or unknown");
                Error::ReplayAttempt(request_id.to_string())
            })?;

        let aggregate =
            BatchAggregate::compute(&self.backend, self.state.batches.positions(batch_id))?;
        let current_fingerprint = aggregate.fingerprint(&self.state.instance_id);

        let (batch_id, totals) = self
            .state
            .bridge
            .verify_and_consume(&self.oracle, request_id, payload, proof, &current_fingerprint)
            .map_err(|err| {
                warn!(%request_id, %batch_id, error = %err, "decryption result rejected");
                err
            })?;

        info!(
            %request_id,
            %batch_id,
            loan_total = totals.loan_total,
            collateral_total = totals.collateral_total,
            "decryption completed"
        );
        self.event_log
            .push(LedgerEvent::DecryptionCompleted(DecryptionCompletedEvent {
                request_id,
                batch_id,
                loan_total: totals.loan_total,
                collateral_total: totals.collateral_total,
                timestamp: self.state.clock,
            }));
        Ok((batch_id, totals))
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // QUERY METHODS
    // ═══════════════════════════════════════════════════════════════════════════

    /// The owner identity
    pub fn owner(&self) -> ActorId {
        self.state.access.owner()
    }

    /// Whether the ledger is paused
    pub fn is_paused(&self) -> bool {
        self.state.access.is_paused()
    }

    /// Whether the actor is an authorized provider
    pub fn is_provider(&self, actor: &ActorId) -> bool {
        self.state.access.is_provider(actor)
    }

    /// Current cooldown interval in seconds
    pub fn cooldown_secs(&self) -> u64 {
        self.state.cooldowns.interval_secs()
    }

    /// Current ledger time
    pub fn clock(&self) -> u64 {
        self.state.clock
    }

    /// Identity of this ledger instance
    pub fn instance_id(&self) -> &Hash {
        &self.state.instance_id
    }

    /// The currently open batch, if any
    pub fn open_batch_id(&self) -> Option<BatchId> {
        self.state.batches.open_batch_id()
    }

    /// Positions of a batch in submission order
    pub fn positions(&self, batch_id: BatchId) -> &[Position] {
        self.state.batches.positions(batch_id)
    }

    /// Number of positions submitted to a batch
    pub fn position_count(&self, batch_id: BatchId) -> usize {
        self.state.batches.position_count(batch_id)
    }

    /// Decryption context for a request id
    pub fn decryption_context(&self, request_id: RequestId) -> Option<&DecryptionContext> {
        self.state.bridge.context(request_id)
    }

    /// Number of decryption requests still pending
    pub fn pending_decryptions(&self) -> usize {
        self.state.bridge.pending_count()
    }

    /// The durable state snapshot (for persistence)
    pub fn state(&self) -> &LedgerState {
        &self.state
    }

    /// The homomorphic backend capability
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The decryption oracle capability
    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    /// Mutable access to the oracle capability
    pub fn oracle_mut(&mut self) -> &mut O {
        &mut self.oracle
    }

    /// Events accumulated since the last drain
    pub fn events(&self) -> &EventLog {
        &self.event_log
    }

    /// Take all accumulated events, leaving the log empty
    pub fn drain_events(&mut self) -> EventLog {
        std::mem::take(&mut self.event_log)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
