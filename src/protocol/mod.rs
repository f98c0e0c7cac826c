//! Protocol orchestration layer.
//!
//! - **state_machine**: the ledger's single sequential entry-point surface
//! - **events**: append-only audit records for every state transition

pub mod events;
pub mod state_machine;

pub use events::{EventLog, LedgerEvent};
pub use state_machine::{LedgerState, LedgerStateMachine};
