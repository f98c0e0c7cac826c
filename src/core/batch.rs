//! Batch lifecycle and encrypted position storage.
//!
//! A batch is a bounded submission window identified by a monotonically
//! increasing id. At most one batch is open at a time; closing a batch keeps
//! its positions, and ids are never reused. Position lists are append-only.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::core::access::ActorId;
use crate::error::{Error, Result};
use crate::fhe::Ciphertext;

// ═══════════════════════════════════════════════════════════════════════════════
// BATCH ID
// ═══════════════════════════════════════════════════════════════════════════════

/// Identifier of a submission batch
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct BatchId(u64);

impl BatchId {
    /// Create a batch id from its raw value
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Raw id value
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// POSITION
// ═══════════════════════════════════════════════════════════════════════════════

/// An immutable encrypted position: a loan amount and a collateral amount.
///
/// Positions belong to exactly one batch, fixed at submission time, and are
/// never mutated or removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    /// Provider that submitted the position
    pub provider: ActorId,
    /// Encrypted loan amount
    pub loan: Ciphertext,
    /// Encrypted collateral amount
    pub collateral: Ciphertext,
    /// Ledger time at submission
    pub submitted_at: u64,
}

// ═══════════════════════════════════════════════════════════════════════════════
// BATCH LEDGER
// ═══════════════════════════════════════════════════════════════════════════════

/// Tracks the current batch identifier, its open/closed status and the
/// ordered position lists of every batch ever opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchLedger {
    current_id: u64,
    open: bool,
    positions: BTreeMap<BatchId, Vec<Position>>,
}

impl Default for BatchLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchLedger {
    /// Create an empty ledger in the initial Closed(0) state
    pub fn new() -> Self {
        Self {
            current_id: 0,
            open: false,
            positions: BTreeMap::new(),
        }
    }

    /// Whether a batch is currently open
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// The currently open batch, if any
    pub fn open_batch_id(&self) -> Option<BatchId> {
        self.open.then(|| BatchId::new(self.current_id))
    }

    /// The most recently opened batch id (0 before the first open)
    pub fn current_id(&self) -> BatchId {
        BatchId::new(self.current_id)
    }

    /// Open a new submission window.
    ///
    /// Every open allocates a fresh id, whether the previous batch was
    /// closed explicitly or is still open (opening over an open batch is
    /// close-then-open). The first opened batch is 1.
    pub fn open_batch(&mut self) -> BatchId {
        self.current_id += 1;
        self.open = true;
        BatchId::new(self.current_id)
    }

    /// Close the open submission window. Positions are kept.
    pub fn close_batch(&mut self) -> Result<BatchId> {
        if !self.open {
            return Err(Error::BatchClosed);
        }
        self.open = false;
        Ok(BatchId::new(self.current_id))
    }

    /// Append a position to the currently open batch.
    ///
    /// Returns the batch id and the position's index within it.
    pub fn append_position(&mut self, position: Position) -> Result<(BatchId, usize)> {
        if !self.open {
            return Err(Error::BatchClosed);
        }
        let batch_id = BatchId::new(self.current_id);
        let list = self.positions.entry(batch_id).or_default();
        list.push(position);
        Ok((batch_id, list.len() - 1))
    }

    /// Positions of a batch in submission order (empty for unknown ids)
    pub fn positions(&self, batch_id: BatchId) -> &[Position] {
        self.positions
            .get(&batch_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Number of positions submitted to a batch
    pub fn position_count(&self, batch_id: BatchId) -> usize {
        self.positions(batch_id).len()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
