use tracing::warn;

use crate::error::EngineError;
use crate::model::participant::{Participant, ParticipantKey, ParticipantKind, ParticipantStatus};
use crate::model::schedule::PayoutSchedule;
use crate::models::EmployeeRef;
use crate::utils::money::{parse_percent, round2};

fn new_receiver(
    employee_id: Option<u64>,
    display_name: &str,
    job_title: &str,
    percentage: f64,
    schedule: &PayoutSchedule,
) -> Participant {
    Participant {
        employee_id,
        display_name: display_name.to_string(),
        job_title: job_title.to_string(),
        kind: ParticipantKind::Receiver,
        status: ParticipantStatus::Active,
        hours_worked: 0.0,
        clock_in: None,
        clock_out: None,
        total_tips: 0.0,
        total_gratuity: 0.0,
        individual_percentage: Some(percentage),
        prepayout_deduction: 0.0,
        transfer_fee: 0.0,
        effective_percentage: percentage,
        payout_tips: round2(percentage / 100.0 * schedule.totals.total_tips),
        payout_gratuity: round2(percentage / 100.0 * schedule.totals.total_gratuity),
        net_payout: None,
        net_explicit: false,
    }
}

fn key_taken(schedule: &PayoutSchedule, key: &ParticipantKey) -> bool {
    schedule.participants.iter().any(|p| p.key() == *key)
}

/// Assign an employee from the directory picker to an entitled role. The
/// new receiver starts with no worked hours and the edited percentage, or
/// the role's base entitlement when none was edited, which makes it a
/// manual receiver paid its own percentage verbatim.
pub fn add_to_role(
    schedule: &mut PayoutSchedule,
    role: &str,
    employee: &EmployeeRef,
    percentage_override: Option<f64>,
) -> Option<ParticipantKey> {
    let base = schedule
        .entitlement_for(role)
        .map(|e| e.payout_percentage)
        .unwrap_or(0.0);
    let percentage = percentage_override.unwrap_or(base);

    let participant = new_receiver(
        Some(employee.employee_id),
        &employee.display_name,
        role,
        percentage,
        schedule,
    );
    let key = participant.key();
    if key_taken(schedule, &key) {
        warn!(role, employee_id = employee.employee_id, "already on the schedule, skipping");
        return None;
    }

    schedule.participants.push(participant);
    Some(key)
}

/// Add an operator-typed receiver. Silently skipped (with a warn log) when
/// the name or job title is blank, the percentage does not parse, or the
/// identity collides with an existing participant.
pub fn add_custom_receiver(
    schedule: &mut PayoutSchedule,
    name: &str,
    job_title: &str,
    percentage: &str,
) -> Option<ParticipantKey> {
    let name = name.trim();
    let job_title = job_title.trim();
    if name.is_empty() || job_title.is_empty() {
        warn!("custom receiver needs both a name and a job title, skipping");
        return None;
    }
    let Some(pct) = parse_percent(percentage) else {
        warn!(percentage, "unparseable custom receiver percentage, skipping");
        return None;
    };

    let participant = new_receiver(None, name, job_title, pct, schedule);
    let key = participant.key();
    if key_taken(schedule, &key) {
        warn!(name, job_title, "custom receiver collides with an existing participant, skipping");
        return None;
    }

    schedule.participants.push(participant);
    Some(key)
}

/// Stage a participant for removal. Pure set subtraction at this layer;
/// the caller is responsible for any confirmation flow, and the removal
/// becomes permanent only on Save.
pub fn remove_participant(
    schedule: &mut PayoutSchedule,
    key: &ParticipantKey,
) -> Result<(), EngineError> {
    match schedule.find_participant_mut(key) {
        Some(p) => {
            p.status = ParticipantStatus::PendingRemoval;
            Ok(())
        }
        None => Err(EngineError::UnknownParticipant { key: key.clone() }),
    }
}

/// Resolve staged removals before an allocation pass: PendingRemoval
/// becomes Removed, and the removed participants are returned for the
/// override payload.
pub fn resolve_removals(schedule: &mut PayoutSchedule) -> Vec<Participant> {
    let mut removed = Vec::new();
    for p in &mut schedule.participants {
        if p.status == ParticipantStatus::PendingRemoval {
            p.status = ParticipantStatus::Removed;
            removed.push(p.clone());
        }
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::entitlement::RoleEntitlement;
    use crate::model::schedule::PoolTotals;
    use chrono::NaiveDate;

    fn schedule() -> PayoutSchedule {
        PayoutSchedule {
            schedule_id: 9,
            business_date: NaiveDate::from_ymd_opt(2026, 3, 14).unwrap(),
            rule_label: "nightly".to_string(),
            participants: vec![],
            entitlements: vec![RoleEntitlement {
                role_key: "Host".to_string(),
                payout_percentage: 20.0,
                is_contributor_role: false,
            }],
            totals: PoolTotals {
                total_tips: 200.0,
                total_gratuity: 50.0,
                ..PoolTotals::default()
            },
            is_approved: false,
        }
    }

    fn employee(id: u64, name: &str) -> EmployeeRef {
        EmployeeRef {
            employee_id: id,
            display_name: name.to_string(),
        }
    }

    #[test]
    fn test_add_to_role_defaults_to_base_entitlement() {
        let mut sched = schedule();
        let key = add_to_role(&mut sched, "Host", &employee(5, "Ana"), None).unwrap();

        let p = sched.find_participant(&key).unwrap();
        assert_eq!(p.individual_percentage, Some(20.0));
        assert_eq!(p.hours_worked, 0.0);
        assert!(p.is_manual());
        assert_eq!(p.payout_tips, 40.0);
        assert_eq!(p.payout_gratuity, 10.0);
    }

    #[test]
    fn test_add_to_role_honors_edited_percentage_and_rejects_duplicates() {
        let mut sched = schedule();
        let key = add_to_role(&mut sched, "Host", &employee(5, "Ana"), Some(7.5)).unwrap();
        assert_eq!(
            sched.find_participant(&key).unwrap().individual_percentage,
            Some(7.5)
        );

        assert!(add_to_role(&mut sched, "Host", &employee(5, "Ana"), None).is_none());
        assert_eq!(sched.participants.len(), 1);
    }

    #[test]
    fn test_custom_receiver_validation() {
        let mut sched = schedule();

        assert!(add_custom_receiver(&mut sched, "  ", "Expo", "5").is_none());
        assert!(add_custom_receiver(&mut sched, "Rae", " ", "5").is_none());
        assert!(add_custom_receiver(&mut sched, "Rae", "Expo", "five").is_none());
        assert!(sched.participants.is_empty());

        let key = add_custom_receiver(&mut sched, "Rae", "Expo", "5 %").unwrap();
        assert_eq!(key.employee_ref, "rae");
        assert_eq!(key.role_key, "expo");

        // Same name + title again collides.
        assert!(add_custom_receiver(&mut sched, " Rae ", "expo", "6").is_none());
        assert_eq!(sched.participants.len(), 1);
    }

    #[test]
    fn test_removal_is_staged_then_resolved() {
        let mut sched = schedule();
        let key = add_to_role(&mut sched, "Host", &employee(5, "Ana"), None).unwrap();

        remove_participant(&mut sched, &key).unwrap();
        assert_eq!(sched.participants[0].status, ParticipantStatus::PendingRemoval);
        // Staged participants no longer resolve as active.
        assert!(sched.find_participant(&key).is_none());

        let removed = resolve_removals(&mut sched);
        assert_eq!(removed.len(), 1);
        assert_eq!(sched.participants[0].status, ParticipantStatus::Removed);

        let err = remove_participant(&mut sched, &key).unwrap_err();
        assert!(matches!(err, EngineError::UnknownParticipant { .. }));
    }
}
