use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::model::entitlement::RoleEntitlement;
use crate::model::participant::{Participant, ParticipantKind, ParticipantStatus};
use crate::model::schedule::{PayoutSchedule, PoolTotals};

/// Raw participant row as supplied by the schedule-data collaborator.
/// Kind is implied by which list the row arrives in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantRecord {
    pub employee_id: Option<u64>,
    pub display_name: String,
    pub job_title: String,
    #[serde(default)]
    pub hours_worked: f64,
    pub clock_in: Option<NaiveTime>,
    pub clock_out: Option<NaiveTime>,
    #[serde(default)]
    pub total_tips: f64,
    #[serde(default)]
    pub total_gratuity: f64,
    pub individual_percentage: Option<f64>,
    #[serde(default)]
    pub prepayout_deduction: f64,
    #[serde(default)]
    pub transfer_fee: f64,
    pub net_payout: Option<f64>,
}

impl ParticipantRecord {
    fn into_participant(self, kind: ParticipantKind) -> Participant {
        Participant {
            employee_id: self.employee_id,
            display_name: self.display_name,
            job_title: self.job_title,
            kind,
            status: ParticipantStatus::Active,
            hours_worked: self.hours_worked,
            clock_in: self.clock_in,
            clock_out: self.clock_out,
            total_tips: self.total_tips,
            total_gratuity: self.total_gratuity,
            individual_percentage: self.individual_percentage,
            prepayout_deduction: self.prepayout_deduction,
            transfer_fee: self.transfer_fee,
            effective_percentage: 0.0,
            payout_tips: 0.0,
            payout_gratuity: 0.0,
            net_explicit: self.net_payout.is_some(),
            net_payout: self.net_payout,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntitlementRecord {
    pub role_key: String,
    pub payout_percentage: f64,
    #[serde(default)]
    pub is_contributor_role: bool,
}

/// One schedule as fetched from the schedule-data collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleRecord {
    pub schedule_id: u64,
    pub business_date: NaiveDate,
    #[serde(default)]
    pub rule_label: String,
    #[serde(default)]
    pub contributors: Vec<ParticipantRecord>,
    #[serde(default)]
    pub receivers: Vec<ParticipantRecord>,
    #[serde(default)]
    pub receiver_role_entitlements: Vec<EntitlementRecord>,
    pub total_tips: f64,
    pub total_gratuity: f64,
    #[serde(default)]
    pub total_sales: f64,
    #[serde(default)]
    pub net_sales: f64,
    #[serde(default)]
    pub order_count: u32,
    #[serde(default)]
    pub is_approved: bool,
}

impl ScheduleRecord {
    pub fn into_schedule(self) -> PayoutSchedule {
        let mut participants = Vec::with_capacity(self.contributors.len() + self.receivers.len());
        participants.extend(
            self.contributors
                .into_iter()
                .map(|r| r.into_participant(ParticipantKind::Contributor)),
        );
        participants.extend(
            self.receivers
                .into_iter()
                .map(|r| r.into_participant(ParticipantKind::Receiver)),
        );

        PayoutSchedule {
            schedule_id: self.schedule_id,
            business_date: self.business_date,
            rule_label: self.rule_label,
            participants,
            entitlements: self
                .receiver_role_entitlements
                .into_iter()
                .map(|e| RoleEntitlement {
                    role_key: e.role_key,
                    payout_percentage: e.payout_percentage,
                    is_contributor_role: e.is_contributor_role,
                })
                .collect(),
            totals: PoolTotals {
                total_tips: self.total_tips,
                total_gratuity: self.total_gratuity,
                total_sales: self.total_sales,
                net_sales: self.net_sales,
                order_count: self.order_count,
            },
            is_approved: self.is_approved,
        }
    }
}

/// One participant's final numbers as persisted on Save.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantOverride {
    pub employee_id: Option<u64>,
    pub display_name: String,
    pub job_title: String,
    pub kind: ParticipantKind,
    pub percentage: f64,
    pub payout_tips: f64,
    pub payout_gratuity: f64,
    pub net_payout: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemovedParticipant {
    pub employee_id: Option<u64>,
    pub display_name: String,
    pub job_title: String,
}

/// The override payload sent to the persistence collaborator on Save.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverridePayload {
    pub schedule_id: u64,
    pub business_date: NaiveDate,
    pub participants: Vec<ParticipantOverride>,
    #[serde(default)]
    pub removed: Vec<RemovedParticipant>,
}

impl OverridePayload {
    pub fn from_schedule(schedule: &PayoutSchedule, removed: &[Participant]) -> Self {
        OverridePayload {
            schedule_id: schedule.schedule_id,
            business_date: schedule.business_date,
            participants: schedule
                .active_participants()
                .map(|p| ParticipantOverride {
                    employee_id: p.employee_id,
                    display_name: p.display_name.clone(),
                    job_title: p.job_title.clone(),
                    kind: p.kind,
                    percentage: p.effective_percentage,
                    payout_tips: p.payout_tips,
                    payout_gratuity: p.payout_gratuity,
                    net_payout: p.net_payout.unwrap_or(0.0),
                })
                .collect(),
            removed: removed
                .iter()
                .map(|p| RemovedParticipant {
                    employee_id: p.employee_id,
                    display_name: p.display_name.clone(),
                    job_title: p.job_title.clone(),
                })
                .collect(),
        }
    }
}

/// Request that transitions a schedule into its terminal approved state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApproveRequest {
    pub schedule_id: u64,
    pub business_date: NaiveDate,
}

/// Employee directory entry used by the "assign to role" picker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmployeeRef {
    pub employee_id: u64,
    pub display_name: String,
}
