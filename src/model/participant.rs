use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::utils::money::role_key;

/// Whether the employee pays into the pool or draws from it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[strum(ascii_case_insensitive)]
pub enum ParticipantKind {
    Contributor,
    Receiver,
}

/// Soft-delete state, resolved once by the mutation applier before an
/// allocation pass instead of being re-checked ad hoc downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum ParticipantStatus {
    Active,
    PendingRemoval,
    Removed,
}

impl Default for ParticipantStatus {
    fn default() -> Self {
        ParticipantStatus::Active
    }
}

/// Stable identity for a participant inside one schedule: employee id (or
/// a display-name fallback for manually added entries), normalized job
/// title, and kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParticipantKey {
    pub employee_ref: String,
    pub role_key: String,
    pub kind: ParticipantKind,
}

/// A single employee's record within a payout schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    pub employee_id: Option<u64>,
    pub display_name: String,
    pub job_title: String,
    pub kind: ParticipantKind,
    #[serde(default)]
    pub status: ParticipantStatus,
    #[serde(default)]
    pub hours_worked: f64,
    pub clock_in: Option<NaiveTime>,
    pub clock_out: Option<NaiveTime>,
    #[serde(default)]
    pub total_tips: f64,
    #[serde(default)]
    pub total_gratuity: f64,
    /// Operator override; for receivers it replaces the role-derived share.
    pub individual_percentage: Option<f64>,
    #[serde(default)]
    pub prepayout_deduction: f64,
    #[serde(default)]
    pub transfer_fee: f64,
    /// Derived by the allocation engine.
    #[serde(default)]
    pub effective_percentage: f64,
    #[serde(default)]
    pub payout_tips: f64,
    #[serde(default)]
    pub payout_gratuity: f64,
    /// Net carried from a prior save, set by an operator edit, or computed
    /// on the last pass.
    pub net_payout: Option<f64>,
    /// True when `net_payout` came from a prior save or an operator edit
    /// rather than this session's forward pass. Explicit nets are
    /// preserved verbatim until a structural change forces a recompute.
    #[serde(default)]
    pub net_explicit: bool,
}

impl Participant {
    pub fn key(&self) -> ParticipantKey {
        ParticipantKey {
            employee_ref: self
                .employee_id
                .map(|id| id.to_string())
                .unwrap_or_else(|| self.display_name.trim().to_lowercase()),
            role_key: self.role_key(),
            kind: self.kind,
        }
    }

    pub fn role_key(&self) -> String {
        role_key(&self.job_title)
    }

    pub fn tip_total(&self) -> f64 {
        self.total_tips + self.total_gratuity
    }

    pub fn payout_amount(&self) -> f64 {
        self.payout_tips + self.payout_gratuity
    }

    pub fn is_active(&self) -> bool {
        self.status == ParticipantStatus::Active
    }

    /// A receiver is "manual" iff the operator set a positive percentage on
    /// an entry with no tips, no gratuity and no clock times. Manual
    /// receivers use their own percentage verbatim and never split a role
    /// share.
    pub fn is_manual(&self) -> bool {
        self.kind == ParticipantKind::Receiver
            && self.individual_percentage.is_some_and(|p| p > 0.0)
            && self.total_tips == 0.0
            && self.total_gratuity == 0.0
            && self.clock_in.is_none()
            && self.clock_out.is_none()
    }

    /// Receivers are payable when manual or when they clocked hours.
    pub fn has_hours(&self) -> bool {
        self.is_manual() || self.hours_worked > 0.0
    }
}
