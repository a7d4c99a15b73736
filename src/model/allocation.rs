use serde::Serialize;

/// Summary of one allocation pass. Per-participant results (payout tips,
/// payout gratuity, net payout, effective percentage) are written back
/// onto the participants themselves; this carries the pass-level numbers
/// the caller needs for display and reconciliation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AllocationReport {
    /// Sum of effective percentages over receivers with a positive payout.
    pub total_receiver_percentage: f64,
    /// Entitled roles with zero eligible receivers; the caller must assign
    /// someone or leave the role unpaid before totals will reconcile.
    pub missing_roles: Vec<String>,
    pub receiver_payout_total: f64,
    pub contributor_debit_total: f64,
    pub net_payout_total: f64,
}

impl AllocationReport {
    pub fn has_missing_roles(&self) -> bool {
        !self.missing_roles.is_empty()
    }
}
