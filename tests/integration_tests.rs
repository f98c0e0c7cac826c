//! Integration tests for the CipherLedger protocol.
//!
//! These tests exercise the complete lifecycle: provider authorization,
//! batch submission windows, homomorphic aggregation, and the asynchronous
//! decryption callback with its replay and drift protections.

use proptest::prelude::*;

use cipherledger::core::access::ActorId;
use cipherledger::core::aggregation::BatchAggregate;
use cipherledger::core::batch::{BatchId, Position};
use cipherledger::error::Error;
use cipherledger::fhe::{Ciphertext, SimulatorBackend};
use cipherledger::oracle::bridge::DecryptedTotals;
use cipherledger::oracle::client::{LocalOracle, RequestId};
use cipherledger::protocol::state_machine::LedgerStateMachine;
use cipherledger::storage::{InMemoryStore, LedgerStore};
use cipherledger::utils::crypto::{Hash, KeyPair};

// ═══════════════════════════════════════════════════════════════════════════════
// TEST HELPERS
// ═══════════════════════════════════════════════════════════════════════════════

const BACKEND_SEED: u64 = 7;

fn owner() -> ActorId {
    ActorId::new([1; 32])
}

fn provider() -> ActorId {
    ActorId::new([2; 32])
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn test_ledger() -> LedgerStateMachine<SimulatorBackend, LocalOracle> {
    init_tracing();
    let mut ledger = LedgerStateMachine::new(
        owner(),
        Hash::sha256(b"integration-ledger"),
        SimulatorBackend::from_seed(BACKEND_SEED),
        LocalOracle::new(),
    )
    .unwrap();
    ledger.add_provider(&owner(), provider()).unwrap();
    ledger
}

fn encrypt_pair(loan: u32, collateral: u32) -> (Ciphertext, Ciphertext) {
    let backend = SimulatorBackend::from_seed(BACKEND_SEED);
    (backend.encrypt_u32(loan), backend.encrypt_u32(collateral))
}

fn submit(
    ledger: &mut LedgerStateMachine<SimulatorBackend, LocalOracle>,
    loan: u32,
    collateral: u32,
) -> (BatchId, usize) {
    let (loan_ct, collateral_ct) = encrypt_pair(loan, collateral);
    ledger
        .submit_position(&provider(), loan_ct, collateral_ct)
        .unwrap()
}

/// Advance past every cooldown window
fn tick(ledger: &mut LedgerStateMachine<SimulatorBackend, LocalOracle>) {
    let next = ledger.clock() + ledger.cooldown_secs();
    ledger.advance_clock(next).unwrap();
}

fn deliver(
    ledger: &mut LedgerStateMachine<SimulatorBackend, LocalOracle>,
    request_id: RequestId,
    loan_total: u32,
    collateral_total: u32,
) -> Result<(BatchId, DecryptedTotals), Error> {
    let payload = DecryptedTotals {
        loan_total,
        collateral_total,
    }
    .encode();
    let proof = ledger.oracle().sign_result(request_id, &payload);
    ledger.on_decryption_result(request_id, &payload, &proof)
}

// ═══════════════════════════════════════════════════════════════════════════════
// FULL LIFECYCLE
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_full_aggregation_lifecycle() {
    let mut ledger = test_ledger();

    let batch_id = ledger.open_batch(&owner()).unwrap();
    assert_eq!(batch_id, BatchId::new(1));

    submit(&mut ledger, 100, 150);
    tick(&mut ledger);
    submit(&mut ledger, 50, 80);

    let request_id = ledger.request_aggregation(&provider(), batch_id).unwrap();
    let context = ledger.decryption_context(request_id).unwrap();
    assert_eq!(context.batch_id, batch_id);
    assert!(!context.processed);

    // The oracle answers with the plaintext totals and a valid proof
    let (delivered_batch, totals) = deliver(&mut ledger, request_id, 150, 230).unwrap();
    assert_eq!(delivered_batch, batch_id);
    assert_eq!(totals.loan_total, 150);
    assert_eq!(totals.collateral_total, 230);
    assert!(ledger.decryption_context(request_id).unwrap().processed);

    // Replaying the same result is meaningless
    let replay = deliver(&mut ledger, request_id, 150, 230);
    assert!(matches!(replay, Err(Error::ReplayAttempt(_))));

    let events = ledger.drain_events();
    assert_eq!(events.filter_by_type("BatchOpened").len(), 1);
    assert_eq!(events.filter_by_type("PositionSubmitted").len(), 2);
    assert_eq!(events.filter_by_type("DecryptionRequested").len(), 1);
    assert_eq!(events.filter_by_type("DecryptionCompleted").len(), 1);
}

#[test]
fn test_aggregation_on_closed_batch() {
    let mut ledger = test_ledger();

    let batch_id = ledger.open_batch(&owner()).unwrap();
    submit(&mut ledger, 10, 20);
    ledger.close_batch(&owner()).unwrap();

    // Closing ends the submission window but not aggregation access
    let request_id = ledger.request_aggregation(&provider(), batch_id).unwrap();
    let (_, totals) = deliver(&mut ledger, request_id, 10, 20).unwrap();
    assert_eq!(totals.loan_total, 10);
    assert_eq!(totals.collateral_total, 20);
}

#[test]
fn test_batch_ids_advance_across_windows() {
    let mut ledger = test_ledger();

    let first = ledger.open_batch(&owner()).unwrap();
    ledger.close_batch(&owner()).unwrap();
    let second = ledger.open_batch(&owner()).unwrap();
    let third = ledger.open_batch(&owner()).unwrap();

    assert_eq!(first, BatchId::new(1));
    assert_eq!(second, BatchId::new(2));
    assert_eq!(third, BatchId::new(3));
    assert_eq!(ledger.open_batch_id(), Some(third));
}

// ═══════════════════════════════════════════════════════════════════════════════
// STALE DELIVERY PROTECTION
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_stale_aggregation_rejected_with_state_mismatch() {
    let mut ledger = test_ledger();

    let batch_id = ledger.open_batch(&owner()).unwrap();
    submit(&mut ledger, 100, 150);

    // First aggregation request captures the single-position state
    let stale_request = ledger.request_aggregation(&provider(), batch_id).unwrap();

    // The ledger moves: another position lands in the same batch, and a
    // second aggregation request is issued against the new state
    tick(&mut ledger);
    submit(&mut ledger, 50, 80);
    let fresh_request = ledger.request_aggregation(&provider(), batch_id).unwrap();

    // The stale result arrives late, with a perfectly valid proof: the
    // re-derived fingerprint no longer matches
    let stale_result = deliver(&mut ledger, stale_request, 100, 150);
    assert!(matches!(stale_result, Err(Error::StateMismatch { .. })));
    assert!(!ledger.decryption_context(stale_request).unwrap().processed);

    // The fresh request completes against the current state
    let (_, totals) = deliver(&mut ledger, fresh_request, 150, 230).unwrap();
    assert_eq!(totals.loan_total, 150);
    assert_eq!(totals.collateral_total, 230);
}

#[test]
fn test_state_mismatch_even_after_batch_closure_and_new_windows() {
    let mut ledger = test_ledger();

    let batch_one = ledger.open_batch(&owner()).unwrap();
    submit(&mut ledger, 100, 150);
    let stale_request = ledger.request_aggregation(&provider(), batch_one).unwrap();

    // Owner rotates windows; the stale request's batch keeps moving
    ledger.close_batch(&owner()).unwrap();
    ledger.open_batch(&owner()).unwrap();
    tick(&mut ledger);

    // Batch 1 is closed, so its state is unchanged: the stale callback is
    // still valid here
    let (_, totals) = deliver(&mut ledger, stale_request, 100, 150).unwrap();
    assert_eq!(totals.loan_total, 100);
    assert_eq!(totals.collateral_total, 150);
}

#[test]
fn test_invalid_proof_rejected_but_retryable() {
    let mut ledger = test_ledger();

    let batch_id = ledger.open_batch(&owner()).unwrap();
    submit(&mut ledger, 10, 20);
    let request_id = ledger.request_aggregation(&provider(), batch_id).unwrap();

    let payload = DecryptedTotals {
        loan_total: 10,
        collateral_total: 20,
    }
    .encode();

    // Proof signed by a stranger's key
    let intruder = LocalOracle::new();
    let forged = intruder.sign_result(request_id, &payload);
    let result = ledger.on_decryption_result(request_id, &payload, &forged);
    assert!(matches!(result, Err(Error::InvalidProof(_))));
    assert!(result.unwrap_err().is_retryable());

    // The context stayed pending: the genuine oracle can still answer
    let (_, totals) = deliver(&mut ledger, request_id, 10, 20).unwrap();
    assert_eq!(totals.loan_total, 10);
}

#[test]
fn test_tampered_payload_fails_proof_check() {
    let mut ledger = test_ledger();

    let batch_id = ledger.open_batch(&owner()).unwrap();
    submit(&mut ledger, 10, 20);
    let request_id = ledger.request_aggregation(&provider(), batch_id).unwrap();

    let payload = DecryptedTotals {
        loan_total: 10,
        collateral_total: 20,
    }
    .encode();
    let proof = ledger.oracle().sign_result(request_id, &payload);

    // Deliver a different payload under the original proof
    let tampered = DecryptedTotals {
        loan_total: 999,
        collateral_total: 999,
    }
    .encode();
    let result = ledger.on_decryption_result(request_id, &tampered, &proof);
    assert!(matches!(result, Err(Error::InvalidProof(_))));
}

#[test]
fn test_processed_flips_at_most_once() {
    let mut ledger = test_ledger();

    let batch_id = ledger.open_batch(&owner()).unwrap();
    submit(&mut ledger, 1, 2);
    let request_id = ledger.request_aggregation(&provider(), batch_id).unwrap();

    deliver(&mut ledger, request_id, 1, 2).unwrap();

    // Any further attempt, with any payload, is a replay
    for totals in [(1u32, 2u32), (3, 4), (0, 0)] {
        let result = deliver(&mut ledger, request_id, totals.0, totals.1);
        assert!(matches!(result, Err(Error::ReplayAttempt(_))));
    }
    assert!(ledger.decryption_context(request_id).unwrap().processed);
}

// ═══════════════════════════════════════════════════════════════════════════════
// APPEND-ONLY AND ORDERING PROPERTIES
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_positions_are_append_only() {
    let mut ledger = test_ledger();
    let batch_id = ledger.open_batch(&owner()).unwrap();

    submit(&mut ledger, 1, 1);
    tick(&mut ledger);
    submit(&mut ledger, 2, 2);

    let snapshot: Vec<Position> = ledger.positions(batch_id).to_vec();
    ledger.request_aggregation(&provider(), batch_id).unwrap();

    tick(&mut ledger);
    submit(&mut ledger, 3, 3);

    // The earlier snapshot is a strict prefix of the current list
    let current = ledger.positions(batch_id);
    assert_eq!(&current[..snapshot.len()], snapshot.as_slice());
    assert_eq!(current.len(), snapshot.len() + 1);
}

// ═══════════════════════════════════════════════════════════════════════════════
// COOLDOWN BEHAVIOR
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_cooldown_monotonicity() {
    let mut ledger = test_ledger();
    ledger.set_cooldown(&owner(), 60).unwrap();
    ledger.open_batch(&owner()).unwrap();
    ledger.advance_clock(1000).unwrap();

    submit(&mut ledger, 1, 1);

    // now2 - now1 < cooldown: rejected with the exact remainder
    ledger.advance_clock(1059).unwrap();
    let (loan_ct, collateral_ct) = encrypt_pair(2, 2);
    let result = ledger.submit_position(&provider(), loan_ct, collateral_ct);
    assert_eq!(result, Err(Error::CooldownActive { remaining_secs: 1 }));

    // now2 - now1 == cooldown: allowed
    ledger.advance_clock(1060).unwrap();
    let (loan_ct, collateral_ct) = encrypt_pair(2, 2);
    assert!(ledger
        .submit_position(&provider(), loan_ct, collateral_ct)
        .is_ok());
}

#[test]
fn test_submission_and_aggregation_cooldowns_are_independent() {
    let mut ledger = test_ledger();
    let batch_id = ledger.open_batch(&owner()).unwrap();

    submit(&mut ledger, 1, 1);

    // Submission cooldown is hot, the decryption-request class is not
    assert!(ledger.request_aggregation(&provider(), batch_id).is_ok());
}

// ═══════════════════════════════════════════════════════════════════════════════
// AUTHORIZATION EDGES
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_remove_unknown_provider_fails() {
    let mut ledger = test_ledger();
    let never_added = ActorId::new([77; 32]);

    let result = ledger.remove_provider(&owner(), &never_added);
    assert!(matches!(result, Err(Error::NotProvider(_))));
}

#[test]
fn test_add_zero_identity_fails() {
    let mut ledger = test_ledger();

    let result = ledger.add_provider(&owner(), ActorId::zero());
    assert!(matches!(result, Err(Error::InvalidParameter { .. })));
}

#[test]
fn test_revoked_provider_loses_access() {
    let mut ledger = test_ledger();
    ledger.open_batch(&owner()).unwrap();

    ledger.remove_provider(&owner(), &provider()).unwrap();

    let (loan_ct, collateral_ct) = encrypt_pair(1, 1);
    let result = ledger.submit_position(&provider(), loan_ct, collateral_ct);
    assert!(matches!(result, Err(Error::NotProvider(_))));
}

// ═══════════════════════════════════════════════════════════════════════════════
// PERSISTENCE
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_snapshot_resume_preserves_pending_request() {
    let oracle_keys = KeyPair::generate();

    let mut ledger = LedgerStateMachine::new(
        owner(),
        Hash::sha256(b"persistent-ledger"),
        SimulatorBackend::from_seed(BACKEND_SEED),
        LocalOracle::with_keypair(oracle_keys.clone()),
    )
    .unwrap();
    ledger.add_provider(&owner(), provider()).unwrap();

    let batch_id = ledger.open_batch(&owner()).unwrap();
    submit(&mut ledger, 40, 60);
    let request_id = ledger.request_aggregation(&provider(), batch_id).unwrap();

    // Snapshot, then resume into a fresh machine with the same collaborators
    let store = LedgerStore::new(InMemoryStore::new());
    store.save_state(ledger.state()).unwrap();
    store.archive_event_log(&ledger.drain_events()).unwrap();

    let restored = store.load_state().unwrap().unwrap();
    let mut resumed = LedgerStateMachine::from_state(
        restored,
        SimulatorBackend::from_seed(BACKEND_SEED),
        LocalOracle::with_keypair(oracle_keys),
    );

    assert_eq!(resumed.pending_decryptions(), 1);
    assert_eq!(resumed.position_count(batch_id), 1);

    // The outstanding request survives the restart and still verifies
    let (_, totals) = deliver(&mut resumed, request_id, 40, 60).unwrap();
    assert_eq!(totals.loan_total, 40);
    assert_eq!(totals.collateral_total, 60);

    assert_eq!(store.event_log_count().unwrap(), 1);
}

// ═══════════════════════════════════════════════════════════════════════════════
// AGGREGATION COMMUTATIVITY
// ═══════════════════════════════════════════════════════════════════════════════

fn plaintext_totals(
    backend: &SimulatorBackend,
    amounts: &[(u32, u32)],
) -> (u32, u32) {
    let positions: Vec<Position> = amounts
        .iter()
        .map(|&(loan, collateral)| Position {
            provider: provider(),
            loan: backend.encrypt_u32(loan),
            collateral: backend.encrypt_u32(collateral),
            submitted_at: 0,
        })
        .collect();

    let aggregate = BatchAggregate::compute(backend, &positions).unwrap();
    (
        backend.decrypt_u32(&aggregate.loan_sum).unwrap(),
        backend.decrypt_u32(&aggregate.collateral_sum).unwrap(),
    )
}

proptest! {
    #[test]
    fn prop_aggregation_is_order_independent(
        amounts in prop::collection::vec((any::<u32>(), any::<u32>()), 0..16),
        rotation in 0usize..16,
    ) {
        let backend = SimulatorBackend::from_seed(99);

        let mut rotated = amounts.clone();
        if !rotated.is_empty() {
            let len = rotated.len();
            rotated.rotate_left(rotation % len);
        }
        let mut reversed = amounts.clone();
        reversed.reverse();

        let expected = amounts.iter().fold((0u32, 0u32), |acc, &(l, c)| {
            (acc.0.wrapping_add(l), acc.1.wrapping_add(c))
        });

        prop_assert_eq!(plaintext_totals(&backend, &amounts), expected);
        prop_assert_eq!(plaintext_totals(&backend, &rotated), expected);
        prop_assert_eq!(plaintext_totals(&backend, &reversed), expected);
    }
}
