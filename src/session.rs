use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use strum_macros::Display;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::engine::allocation::{AllocationPass, allocate};
use crate::engine::{inverse, mutation, validate};
use crate::error::EngineError;
use crate::model::allocation::AllocationReport;
use crate::model::participant::{Participant, ParticipantKey};
use crate::model::schedule::PayoutSchedule;
use crate::models::{ApproveRequest, EmployeeRef, OverridePayload};
use crate::store::{EmployeeDirectory, ScheduleStore};
use crate::utils::money::{parse_money, parse_percent, role_key, round2};

/// Approval state machine for one payout schedule.
///
/// Pending → Editing (re-enterable) → Pending on Cancel or a committed
/// Save; Approved is terminal and freezes the schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
pub enum ScheduleState {
    Pending,
    Editing,
    Approved,
}

/// Pre-edit percentage/net values, recorded for audit the moment a
/// session enters Editing.
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotEntry {
    pub key: ParticipantKey,
    pub display_name: String,
    pub percentage: Option<f64>,
    pub net_payout: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditSnapshot {
    pub session_id: String,
    pub schedule_id: u64,
    pub business_date: chrono::NaiveDate,
    pub taken_at: DateTime<Utc>,
    pub entries: Vec<SnapshotEntry>,
}

impl AuditSnapshot {
    fn capture(schedule: &PayoutSchedule) -> Self {
        AuditSnapshot {
            session_id: Uuid::new_v4().to_string(),
            schedule_id: schedule.schedule_id,
            business_date: schedule.business_date,
            taken_at: Utc::now(),
            entries: schedule
                .active_participants()
                .map(|p| SnapshotEntry {
                    key: p.key(),
                    display_name: p.display_name.clone(),
                    percentage: p.individual_percentage,
                    net_payout: p.net_payout,
                })
                .collect(),
        }
    }
}

/// One operator's in-memory edit state for one schedule. Nothing here is
/// persisted until a Save is committed; Cancel throws the working copy
/// away and restores the pristine schedule.
#[derive(Debug, Clone)]
pub struct EditSession {
    state: ScheduleState,
    schedule: PayoutSchedule,
    pristine: PayoutSchedule,
    snapshot: Option<AuditSnapshot>,
    tolerance: f64,
    net_edits: HashMap<ParticipantKey, f64>,
    structural_change: bool,
    original_prepayout_total: f64,
    original_fee_total: f64,
    removed: Vec<Participant>,
}

impl EditSession {
    pub fn new(schedule: PayoutSchedule, tolerance: f64) -> Result<Self, EngineError> {
        if schedule.is_approved {
            return Err(EngineError::ScheduleLocked {
                schedule_id: schedule.schedule_id,
                business_date: schedule.business_date,
            });
        }
        Ok(EditSession {
            state: ScheduleState::Pending,
            pristine: schedule.clone(),
            schedule,
            snapshot: None,
            tolerance,
            net_edits: HashMap::new(),
            structural_change: false,
            original_prepayout_total: 0.0,
            original_fee_total: 0.0,
            removed: Vec::new(),
        })
    }

    pub fn state(&self) -> ScheduleState {
        self.state
    }

    pub fn schedule(&self) -> &PayoutSchedule {
        &self.schedule
    }

    pub fn snapshot(&self) -> Option<&AuditSnapshot> {
        self.snapshot.as_ref()
    }

    fn require_editing(&self, action: &'static str) -> Result<(), EngineError> {
        if self.state != ScheduleState::Editing {
            return Err(EngineError::InvalidTransition {
                state: self.state,
                action,
            });
        }
        Ok(())
    }

    fn locked_error(&self) -> EngineError {
        EngineError::ScheduleLocked {
            schedule_id: self.schedule.schedule_id,
            business_date: self.schedule.business_date,
        }
    }

    /// Enter Editing. Re-entering an already-editing session is a no-op;
    /// the first entry captures the audit snapshot and the deduction pool
    /// totals as they stood before any mutation.
    pub fn begin_edit(&mut self) -> Result<(), EngineError> {
        match self.state {
            ScheduleState::Approved => Err(self.locked_error()),
            ScheduleState::Editing => Ok(()),
            ScheduleState::Pending => {
                let snapshot = AuditSnapshot::capture(&self.schedule);
                info!(
                    schedule_id = self.schedule.schedule_id,
                    session_id = %snapshot.session_id,
                    "edit session opened"
                );
                self.snapshot = Some(snapshot);
                self.original_prepayout_total = self.schedule.prepayout_total();
                self.original_fee_total = self.schedule.fee_total();
                self.state = ScheduleState::Editing;
                Ok(())
            }
        }
    }

    /// Discard all in-memory edits and return to Pending.
    pub fn cancel(&mut self) -> Result<(), EngineError> {
        self.require_editing("cancel")?;
        self.schedule = self.pristine.clone();
        self.net_edits.clear();
        self.removed.clear();
        self.structural_change = false;
        self.state = ScheduleState::Pending;
        Ok(())
    }

    /// Apply an operator net-dollar edit. The literal value becomes the
    /// participant's net payout; the consistent percentage is back-solved
    /// so the next forward pass re-derives the payout fields around it.
    /// Unparseable input is ignored, keeping the computed value.
    pub fn edit_net(&mut self, key: &ParticipantKey, raw: &str) -> Result<(), EngineError> {
        self.require_editing("edit a net payout")?;

        let Some(value) = parse_money(raw) else {
            warn!(input = raw, "unparseable net amount, keeping computed value");
            return Ok(());
        };
        let value = round2(value);

        let totals = self.schedule.totals.clone();
        let participant = self
            .schedule
            .find_participant_mut(key)
            .ok_or_else(|| EngineError::UnknownParticipant { key: key.clone() })?;

        if let Some(pct) = inverse::percentage_for_net(participant, &totals, value) {
            participant.individual_percentage = Some(pct);
        }
        participant.net_payout = Some(value);
        participant.net_explicit = true;
        self.net_edits.insert(key.clone(), value);
        Ok(())
    }

    /// Apply an operator percentage edit (receivers only). The edited
    /// percentage replaces any pending net edit for that participant.
    pub fn edit_percentage(&mut self, key: &ParticipantKey, raw: &str) -> Result<(), EngineError> {
        self.require_editing("edit a percentage")?;

        let participant = self
            .schedule
            .find_participant_mut(key)
            .ok_or_else(|| EngineError::UnknownParticipant { key: key.clone() })?;

        let Some(pct) = inverse::percentage_edit(participant, raw) else {
            return Ok(());
        };
        participant.individual_percentage = Some(pct);
        participant.net_payout = None;
        participant.net_explicit = false;
        self.net_edits.remove(key);
        Ok(())
    }

    /// Assign an employee to an entitled role, optionally with an edited
    /// percentage.
    pub fn add_participant_to_role(
        &mut self,
        role: &str,
        employee: &EmployeeRef,
        percentage: Option<&str>,
    ) -> Result<(), EngineError> {
        self.require_editing("add a participant")?;
        let pct = percentage.and_then(parse_percent);
        if mutation::add_to_role(&mut self.schedule, role, employee, pct).is_some() {
            self.structural_change = true;
        }
        Ok(())
    }

    /// Add an operator-typed receiver (name, job title, percentage).
    pub fn add_custom_receiver(
        &mut self,
        name: &str,
        job_title: &str,
        percentage: &str,
    ) -> Result<(), EngineError> {
        self.require_editing("add a custom receiver")?;
        if mutation::add_custom_receiver(&mut self.schedule, name, job_title, percentage).is_some()
        {
            self.structural_change = true;
        }
        Ok(())
    }

    /// Stage a participant for removal; permanent only once a Save commits.
    pub fn remove_participant(&mut self, key: &ParticipantKey) -> Result<(), EngineError> {
        self.require_editing("remove a participant")?;
        mutation::remove_participant(&mut self.schedule, key)?;
        self.structural_change = true;
        Ok(())
    }

    /// Resolve staged removals and run a forward allocation pass.
    pub fn reallocate(&mut self) -> AllocationReport {
        let newly_removed = mutation::resolve_removals(&mut self.schedule);
        self.removed.extend(newly_removed);

        let pass = if self.structural_change {
            AllocationPass {
                structural_change: true,
                prepayout_pool: Some(self.original_prepayout_total),
                fee_pool: Some(self.original_fee_total),
            }
        } else {
            AllocationPass::default()
        };
        allocate(&mut self.schedule, &pass)
    }

    /// Re-run the engine and validate, producing the override payload for
    /// persistence. The session state is untouched until [`commit_save`]
    /// so a failed persistence (or a reconciliation mismatch) leaves the
    /// operator's edit state intact.
    ///
    /// [`commit_save`]: EditSession::commit_save
    pub fn prepare_save(&mut self) -> Result<OverridePayload, EngineError> {
        self.require_editing("save")?;
        let report = self.reallocate();
        if report.has_missing_roles() {
            warn!(roles = ?report.missing_roles, "saving with unassigned entitled roles");
        }
        if !self.net_edits.is_empty() {
            validate::check_reconciliation(&self.schedule, self.tolerance)?;
        }
        Ok(OverridePayload::from_schedule(&self.schedule, &self.removed))
    }

    /// Mark the prepared save as persisted: edits become the new pristine
    /// state and the session returns to Pending.
    pub fn commit_save(&mut self) {
        for p in &mut self.schedule.participants {
            if p.is_active() && p.net_payout.is_some() {
                p.net_explicit = true;
            }
        }
        self.schedule.participants.retain(|p| p.is_active());
        self.pristine = self.schedule.clone();
        self.net_edits.clear();
        self.removed.clear();
        self.structural_change = false;
        self.state = ScheduleState::Pending;
        info!(schedule_id = self.schedule.schedule_id, "edit session saved");
    }

    /// Re-run the engine and build both persistence artifacts for an
    /// approval. Approving is allowed straight from Pending; the lock is
    /// applied by [`commit_approval`] after persistence succeeds.
    ///
    /// [`commit_approval`]: EditSession::commit_approval
    pub fn prepare_approval(
        &mut self,
    ) -> Result<(OverridePayload, ApproveRequest), EngineError> {
        if self.state == ScheduleState::Approved {
            return Err(self.locked_error());
        }
        let report = self.reallocate();
        if report.has_missing_roles() {
            warn!(roles = ?report.missing_roles, "approving with unassigned entitled roles");
        }
        if !self.net_edits.is_empty() {
            validate::check_reconciliation(&self.schedule, self.tolerance)?;
        }
        let payload = OverridePayload::from_schedule(&self.schedule, &self.removed);
        let request = ApproveRequest {
            schedule_id: self.schedule.schedule_id,
            business_date: self.schedule.business_date,
        };
        Ok((payload, request))
    }

    /// Lock the schedule. No further edit session can be opened on it.
    pub fn commit_approval(&mut self) {
        self.schedule.is_approved = true;
        self.pristine = self.schedule.clone();
        self.net_edits.clear();
        self.removed.clear();
        self.structural_change = false;
        self.state = ScheduleState::Approved;
        info!(
            schedule_id = self.schedule.schedule_id,
            business_date = %self.schedule.business_date,
            "schedule approved and locked"
        );
    }
}

/// Drives the fetch → edit → allocate → validate → persist → approve flow
/// over the collaborator traits, strictly sequentially per schedule.
pub struct SessionCoordinator<S: ScheduleStore> {
    store: S,
    tolerance: f64,
}

impl<S: ScheduleStore> SessionCoordinator<S> {
    pub fn new(store: S, tolerance: f64) -> Self {
        SessionCoordinator { store, tolerance }
    }

    #[instrument(skip(self))]
    pub async fn load_session(
        &self,
        schedule_id: u64,
        business_date: chrono::NaiveDate,
    ) -> anyhow::Result<EditSession> {
        let record = self.store.fetch_schedule(schedule_id, business_date).await?;
        let session = EditSession::new(record.into_schedule(), self.tolerance)?;
        Ok(session)
    }

    #[instrument(skip(self, session), fields(schedule_id = session.schedule().schedule_id))]
    pub async fn save_session(
        &self,
        session: &mut EditSession,
    ) -> anyhow::Result<OverridePayload> {
        let payload = session.prepare_save()?;
        self.store.save_overrides(&payload).await?;
        session.commit_save();
        Ok(payload)
    }

    /// Candidates for the "assign to role" picker: active employees with
    /// the role's job title who are not already on the schedule in it.
    pub async fn role_candidates<D: EmployeeDirectory>(
        &self,
        directory: &D,
        session: &EditSession,
        role: &str,
    ) -> anyhow::Result<Vec<EmployeeRef>> {
        let mut candidates = directory.active_by_title(role).await?;
        let role = role_key(role);
        candidates.retain(|c| {
            !session
                .schedule()
                .active_participants()
                .any(|p| p.employee_id == Some(c.employee_id) && p.role_key() == role)
        });
        Ok(candidates)
    }

    #[instrument(skip(self, session), fields(schedule_id = session.schedule().schedule_id))]
    pub async fn approve_session(
        &self,
        session: &mut EditSession,
    ) -> anyhow::Result<ApproveRequest> {
        let (payload, request) = session.prepare_approval()?;
        self.store.save_overrides(&payload).await?;
        self.store.approve_schedule(&request).await?;
        session.commit_approval();
        Ok(request)
    }
}
