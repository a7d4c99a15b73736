use tracing::error;

use crate::error::EngineError;
use crate::model::schedule::PayoutSchedule;
use crate::utils::money::round2;

/// Default tolerance, in dollars, between the summed payouts and the
/// distributable pool before a save is rejected.
pub const DEFAULT_TOLERANCE: f64 = 0.05;

/// Check that net payouts plus deductions add back up to the distributable
/// pool. Run on Save whenever net-dollar edits exist; a mismatch aborts
/// the save with both totals so the operator can correct inputs.
pub fn check_reconciliation(
    schedule: &PayoutSchedule,
    tolerance: f64,
) -> Result<(), EngineError> {
    let mut expected = 0.0;
    for p in schedule.active_participants() {
        expected += p.net_payout.unwrap_or(0.0) + p.prepayout_deduction + p.transfer_fee;
    }
    let expected = round2(expected);
    let actual = round2(schedule.totals.distributable());

    if (expected - actual).abs() > tolerance {
        error!(
            schedule_id = schedule.schedule_id,
            expected, actual, tolerance, "payout totals do not reconcile"
        );
        return Err(EngineError::ReconciliationMismatch {
            expected,
            actual,
            tolerance,
        });
    }
    Ok(())
}
