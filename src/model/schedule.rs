use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::model::entitlement::RoleEntitlement;
use crate::model::participant::{Participant, ParticipantKey};

/// Schedule-level aggregates. The distributable pool always comes from
/// here, never from re-summing possibly filtered participant lists, so it
/// stays stable across edits.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PoolTotals {
    pub total_tips: f64,
    pub total_gratuity: f64,
    #[serde(default)]
    pub total_sales: f64,
    #[serde(default)]
    pub net_sales: f64,
    #[serde(default)]
    pub order_count: u32,
}

impl PoolTotals {
    pub fn distributable(&self) -> f64 {
        self.total_tips + self.total_gratuity
    }
}

/// One payout run for a business date and payout rule.
///
/// `schedule_id` + `business_date` uniquely identify a schedule instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayoutSchedule {
    pub schedule_id: u64,
    pub business_date: NaiveDate,
    pub rule_label: String,
    pub participants: Vec<Participant>,
    pub entitlements: Vec<RoleEntitlement>,
    pub totals: PoolTotals,
    #[serde(default)]
    pub is_approved: bool,
}

impl PayoutSchedule {
    pub fn active_participants(&self) -> impl Iterator<Item = &Participant> {
        self.participants.iter().filter(|p| p.is_active())
    }

    pub fn find_participant(&self, key: &ParticipantKey) -> Option<&Participant> {
        self.participants
            .iter()
            .find(|p| p.is_active() && p.key() == *key)
    }

    pub fn find_participant_mut(&mut self, key: &ParticipantKey) -> Option<&mut Participant> {
        self.participants
            .iter_mut()
            .find(|p| p.is_active() && p.key() == *key)
    }

    pub fn entitlement_for(&self, job_title: &str) -> Option<&RoleEntitlement> {
        self.entitlements
            .iter()
            .filter(|e| !e.is_contributor_role)
            .find(|e| e.matches(job_title))
    }

    /// Aggregate prepayout debit over active participants.
    pub fn prepayout_total(&self) -> f64 {
        self.active_participants()
            .map(|p| p.prepayout_deduction)
            .sum()
    }

    /// Aggregate transfer fee over active participants.
    pub fn fee_total(&self) -> f64 {
        self.active_participants().map(|p| p.transfer_fee).sum()
    }
}
