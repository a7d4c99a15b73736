use chrono::NaiveDate;
use thiserror::Error;

use crate::model::participant::ParticipantKey;
use crate::session::ScheduleState;

/// Errors surfaced by the allocation engine and the edit-session layer.
///
/// Reconciliation mismatches are non-fatal: the save is aborted but the
/// in-memory edit state is preserved so the operator can correct inputs.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Σ net payouts + deductions drifted from the distributable pool by
    /// more than the rounding tolerance.
    #[error(
        "payout total {expected:.2} does not reconcile with pool total {actual:.2} (tolerance {tolerance:.2})"
    )]
    ReconciliationMismatch {
        expected: f64,
        actual: f64,
        tolerance: f64,
    },

    /// The schedule was approved and is frozen.
    #[error("schedule {schedule_id} for {business_date} is approved and can no longer be edited")]
    ScheduleLocked {
        schedule_id: u64,
        business_date: NaiveDate,
    },

    /// The requested operation is not valid in the session's current state.
    #[error("cannot {action} while the session is {state}")]
    InvalidTransition {
        state: ScheduleState,
        action: &'static str,
    },

    /// No active participant matches the given key.
    #[error("no active participant matches {key:?}")]
    UnknownParticipant { key: ParticipantKey },
}
