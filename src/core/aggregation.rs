//! Homomorphic aggregation of batch positions and fingerprint derivation.
//!
//! Aggregation folds every position of a batch, in submission order, into
//! two running ciphertext sums (loan, collateral). The result is exported to
//! opaque handles and bound to the issuing ledger through a deterministic
//! fingerprint, which is what the decryption bridge later re-derives to
//! detect state drift.

use serde::{Deserialize, Serialize};

use crate::core::batch::Position;
use crate::error::{Error, Result};
use crate::fhe::{Ciphertext, CiphertextHandle, FheBackend};
use crate::utils::constants::{FINGERPRINT_TAG, POSITION_COMMITMENT_TAG};
use crate::utils::crypto::Hash;

// ═══════════════════════════════════════════════════════════════════════════════
// AGGREGATE HANDLES
// ═══════════════════════════════════════════════════════════════════════════════

/// Transport handles of the two aggregate sums of a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateHandles {
    /// Handle of the aggregate loan sum
    pub loan: CiphertextHandle,
    /// Handle of the aggregate collateral sum
    pub collateral: CiphertextHandle,
}

impl AggregateHandles {
    /// Handles in oracle submission order (loan first)
    pub fn as_array(&self) -> [CiphertextHandle; 2] {
        [self.loan, self.collateral]
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// BATCH AGGREGATE
// ═══════════════════════════════════════════════════════════════════════════════

/// The folded ciphertext sums of a batch together with their handles
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchAggregate {
    /// Running ciphertext sum of all loan amounts
    pub loan_sum: Ciphertext,
    /// Running ciphertext sum of all collateral amounts
    pub collateral_sum: Ciphertext,
    /// Exported transport handles of the two sums
    pub handles: AggregateHandles,
}

impl BatchAggregate {
    /// Fold a position list into its two aggregate sums.
    ///
    /// Both running sums start from the ciphertext encoding of zero and
    /// accumulate in submission order. Every position is re-checked against
    /// the initialized predicate; a violation aborts the whole fold with no
    /// partial result. Addition is commutative, so the plaintext outcome is
    /// order-independent, but the deterministic iteration order makes the
    /// ciphertext result — and therefore the fingerprint — reproducible.
    pub fn compute<B: FheBackend>(backend: &B, positions: &[Position]) -> Result<Self> {
        let mut loan_sum = backend.encode_zero();
        let mut collateral_sum = backend.encode_zero();

        for position in positions {
            if !backend.is_initialized(&position.loan) {
                return Err(Error::NotInitialized("loan".into()));
            }
            if !backend.is_initialized(&position.collateral) {
                return Err(Error::NotInitialized("collateral".into()));
            }

            loan_sum = backend.add(&loan_sum, &position.loan)?;
            collateral_sum = backend.add(&collateral_sum, &position.collateral)?;
        }

        let handles = AggregateHandles {
            loan: backend.export_handle(&loan_sum)?,
            collateral: backend.export_handle(&collateral_sum)?,
        };

        Ok(Self {
            loan_sum,
            collateral_sum,
            handles,
        })
    }

    /// Fingerprint binding this aggregate to the given ledger instance
    pub fn fingerprint(&self, instance_id: &Hash) -> Hash {
        derive_fingerprint(&self.handles, instance_id)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// FINGERPRINTS AND COMMITMENTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Deterministic fingerprint over the aggregate handles and the ledger's own
/// identity.
///
/// Two ledgers folding identical data produce distinct fingerprints, so a
/// decryption result can never be cross-played between instances.
pub fn derive_fingerprint(handles: &AggregateHandles, instance_id: &Hash) -> Hash {
    Hash::sha256_tagged(
        FINGERPRINT_TAG,
        &[
            handles.loan.as_bytes(),
            handles.collateral.as_bytes(),
            instance_id.as_bytes(),
        ],
    )
}

/// Content commitment over one position's two ciphertext handles, emitted
/// with submission events for off-chain correlation. Carries no plaintext.
pub fn position_commitment(loan: &CiphertextHandle, collateral: &CiphertextHandle) -> Hash {
    Hash::sha256_tagged(
        POSITION_COMMITMENT_TAG,
        &[loan.as_bytes(), collateral.as_bytes()],
    )
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::access::ActorId;
    use crate::fhe::SimulatorBackend;

    fn position(backend: &SimulatorBackend, loan: u32, collateral: u32) -> Position {
        Position {
            provider: ActorId::new([9; 32]),
            loan: backend.encrypt_u32(loan),
            collateral: backend.encrypt_u32(collateral),
            submitted_at: 0,
        }
    }

    #[test]
    fn test_empty_fold_is_zero() {
        let backend = SimulatorBackend::from_seed(1);
        let aggregate = BatchAggregate::compute(&backend, &[]).unwrap();

        assert_eq!(backend.decrypt_u32(&aggregate.loan_sum).unwrap(), 0);
        assert_eq!(backend.decrypt_u32(&aggregate.collateral_sum).unwrap(), 0);
    }

    #[test]
    fn test_fold_sums_both_columns() {
        let backend = SimulatorBackend::from_seed(2);
        let positions = vec![
            position(&backend, 100, 150),
            position(&backend, 50, 80),
        ];

        let aggregate = BatchAggregate::compute(&backend, &positions).unwrap();
        assert_eq!(backend.decrypt_u32(&aggregate.loan_sum).unwrap(), 150);
        assert_eq!(backend.decrypt_u32(&aggregate.collateral_sum).unwrap(), 230);
    }

    #[test]
    fn test_fold_is_reproducible() {
        let backend = SimulatorBackend::from_seed(3);
        let positions = vec![
            position(&backend, 1, 2),
            position(&backend, 3, 4),
            position(&backend, 5, 6),
        ];

        let first = BatchAggregate::compute(&backend, &positions).unwrap();
        let second = BatchAggregate::compute(&backend, &positions).unwrap();
        assert_eq!(first.handles, second.handles);
        assert_eq!(
            first.fingerprint(&Hash::sha256(b"ledger")),
            second.fingerprint(&Hash::sha256(b"ledger"))
        );
    }

    #[test]
    fn test_uninitialized_position_aborts_fold() {
        let backend = SimulatorBackend::from_seed(4);
        let mut positions = vec![position(&backend, 1, 2)];
        positions.push(Position {
            provider: ActorId::new([9; 32]),
            loan: Ciphertext::uninitialized(),
            collateral: backend.encrypt_u32(3),
            submitted_at: 0,
        });

        assert_eq!(
            BatchAggregate::compute(&backend, &positions),
            Err(Error::NotInitialized("loan".into()))
        );
    }

    #[test]
    fn test_fingerprint_binds_ledger_identity() {
        let backend = SimulatorBackend::from_seed(5);
        let aggregate =
            BatchAggregate::compute(&backend, &[position(&backend, 10, 20)]).unwrap();

        let a = aggregate.fingerprint(&Hash::sha256(b"ledger-a"));
        let b = aggregate.fingerprint(&Hash::sha256(b"ledger-b"));
        assert_ne!(a, b);
    }

    #[test]
    fn test_fingerprint_changes_with_positions() {
        let backend = SimulatorBackend::from_seed(6);
        let instance = Hash::sha256(b"ledger");

        let mut positions = vec![position(&backend, 10, 20)];
        let before = BatchAggregate::compute(&backend, &positions)
            .unwrap()
            .fingerprint(&instance);

        positions.push(position(&backend, 1, 1));
        let after = BatchAggregate::compute(&backend, &positions)
            .unwrap()
            .fingerprint(&instance);

        assert_ne!(before, after);
    }

    #[test]
    fn test_position_commitment_ordering_matters() {
        let backend = SimulatorBackend::from_seed(7);
        let a = backend.export_handle(&backend.encrypt_u32(1)).unwrap();
        let b = backend.export_handle(&backend.encrypt_u32(2)).unwrap();

        assert_ne!(position_commitment(&a, &b), position_commitment(&b, &a));
    }
}
