use tracing::debug;

use crate::engine::role_share;
use crate::model::allocation::AllocationReport;
use crate::model::participant::{Participant, ParticipantKind};
use crate::model::schedule::PayoutSchedule;
use crate::utils::money::round2;

/// Inputs that vary between allocation passes.
///
/// When participants were added or removed, the pre-mutation deduction
/// pools are threaded in so per-person amounts redistribute over the new
/// denominator instead of silently shrinking the aggregate, and saved net
/// payouts are recomputed because role denominators changed.
#[derive(Debug, Default, Clone)]
pub struct AllocationPass {
    pub structural_change: bool,
    pub prepayout_pool: Option<f64>,
    pub fee_pool: Option<f64>,
}

fn has_earnings(p: &Participant) -> bool {
    match p.kind {
        ParticipantKind::Contributor => p.tip_total() > 0.0,
        ParticipantKind::Receiver => p.payout_amount() > 0.0,
    }
}

/// Run one forward allocation pass over the schedule, writing payout tips,
/// payout gratuity, effective percentage, deductions and net payout onto
/// each active participant.
///
/// Receivers are computed first: the sum of their effective percentages
/// (over receivers with a positive payout) is the aggregate claim each
/// contributor is debited at, applied to the contributor's own earnings.
pub fn allocate(schedule: &mut PayoutSchedule, pass: &AllocationPass) -> AllocationReport {
    let shares = role_share::resolve(&schedule.entitlements, &schedule.participants);
    let overall_tips = schedule.totals.total_tips;
    let overall_gratuity = schedule.totals.total_gratuity;

    let mut total_receiver_percentage = 0.0;
    for p in schedule
        .participants
        .iter_mut()
        .filter(|p| p.is_active() && p.kind == ParticipantKind::Receiver)
    {
        let pct = role_share::effective_percentage(p, &shares);
        p.effective_percentage = pct;
        if p.has_hours() {
            p.payout_tips = round2(pct / 100.0 * overall_tips);
            p.payout_gratuity = round2(pct / 100.0 * overall_gratuity);
        } else {
            p.payout_tips = 0.0;
            p.payout_gratuity = 0.0;
        }
        if p.payout_amount() > 0.0 {
            total_receiver_percentage += pct;
        }
    }

    for p in schedule
        .participants
        .iter_mut()
        .filter(|p| p.is_active() && p.kind == ParticipantKind::Contributor)
    {
        if p.tip_total() > 0.0 {
            // An inverse-solved override replaces the aggregate rate.
            let rate = match p.individual_percentage {
                Some(r) if r > 0.0 => r,
                _ => total_receiver_percentage,
            };
            p.effective_percentage = rate;
            p.payout_tips = round2(-(rate / 100.0) * p.total_tips);
            p.payout_gratuity = round2(-(rate / 100.0) * p.total_gratuity);
        } else {
            p.effective_percentage = 0.0;
            p.payout_tips = 0.0;
            p.payout_gratuity = 0.0;
        }
    }

    let prepayout_pool = pass
        .prepayout_pool
        .unwrap_or_else(|| schedule.prepayout_total());
    let fee_pool = pass.fee_pool.unwrap_or_else(|| schedule.fee_total());
    let earner_count = schedule.active_participants().filter(|p| has_earnings(p)).count();
    let (prepayout_per_person, fee_per_person) = if earner_count > 0 {
        (
            round2(prepayout_pool / earner_count as f64),
            round2(fee_pool / earner_count as f64),
        )
    } else {
        (0.0, 0.0)
    };

    for p in schedule.participants.iter_mut().filter(|p| p.is_active()) {
        if has_earnings(p) {
            p.prepayout_deduction = prepayout_per_person;
            p.transfer_fee = fee_per_person;
        } else {
            p.prepayout_deduction = 0.0;
            p.transfer_fee = 0.0;
        }

        let gross_payout = round2(p.tip_total() + p.payout_amount());
        let net = round2(gross_payout - p.prepayout_deduction - p.transfer_fee).max(0.0);

        // An explicit net (prior save or operator edit) stays verbatim
        // unless the participant set changed under it.
        if !p.net_explicit || pass.structural_change {
            p.net_payout = Some(net);
            p.net_explicit = false;
        }
    }

    let mut receiver_payout_total = 0.0;
    let mut contributor_debit_total = 0.0;
    let mut net_payout_total = 0.0;
    for p in schedule.active_participants() {
        match p.kind {
            ParticipantKind::Receiver => receiver_payout_total += p.payout_amount(),
            ParticipantKind::Contributor => contributor_debit_total += p.payout_amount(),
        }
        net_payout_total += p.net_payout.unwrap_or(0.0);
    }

    let report = AllocationReport {
        total_receiver_percentage,
        missing_roles: shares.missing_roles().to_vec(),
        receiver_payout_total: round2(receiver_payout_total),
        contributor_debit_total: round2(contributor_debit_total),
        net_payout_total: round2(net_payout_total),
    };

    debug!(
        schedule_id = schedule.schedule_id,
        total_receiver_percentage,
        earner_count,
        missing_roles = report.missing_roles.len(),
        "allocation pass complete"
    );

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::entitlement::RoleEntitlement;
    use crate::model::participant::ParticipantStatus;
    use crate::model::schedule::PoolTotals;
    use chrono::NaiveDate;

    fn participant(name: &str, kind: ParticipantKind, role: &str) -> Participant {
        Participant {
            employee_id: None,
            display_name: name.to_string(),
            job_title: role.to_string(),
            kind,
            status: ParticipantStatus::Active,
            hours_worked: 0.0,
            clock_in: None,
            clock_out: None,
            total_tips: 0.0,
            total_gratuity: 0.0,
            individual_percentage: None,
            prepayout_deduction: 0.0,
            transfer_fee: 0.0,
            effective_percentage: 0.0,
            payout_tips: 0.0,
            payout_gratuity: 0.0,
            net_payout: None,
            net_explicit: false,
        }
    }

    fn contributor(name: &str, tips: f64, gratuity: f64) -> Participant {
        let mut p = participant(name, ParticipantKind::Contributor, "Server");
        p.hours_worked = 8.0;
        p.total_tips = tips;
        p.total_gratuity = gratuity;
        p
    }

    fn receiver(name: &str, role: &str, hours: f64) -> Participant {
        let mut p = participant(name, ParticipantKind::Receiver, role);
        p.hours_worked = hours;
        p
    }

    fn schedule(participants: Vec<Participant>, entitlements: Vec<(&str, f64)>, tips: f64, gratuity: f64) -> PayoutSchedule {
        PayoutSchedule {
            schedule_id: 42,
            business_date: NaiveDate::from_ymd_opt(2026, 3, 14).unwrap(),
            rule_label: "nightly".to_string(),
            participants,
            entitlements: entitlements
                .into_iter()
                .map(|(role, pct)| RoleEntitlement {
                    role_key: role.to_string(),
                    payout_percentage: pct,
                    is_contributor_role: false,
                })
                .collect(),
            totals: PoolTotals {
                total_tips: tips,
                total_gratuity: gratuity,
                ..PoolTotals::default()
            },
            is_approved: false,
        }
    }

    #[test]
    fn test_host_scenario_from_the_floor() {
        // Pool $200/$50, two servers at $100/$25 each, one host entitled
        // to 20% of the pool.
        let mut sched = schedule(
            vec![
                contributor("S1", 100.0, 25.0),
                contributor("S2", 100.0, 25.0),
                receiver("H", "Host", 6.0),
            ],
            vec![("Host", 20.0)],
            200.0,
            50.0,
        );

        let report = allocate(&mut sched, &AllocationPass::default());

        assert_eq!(report.total_receiver_percentage, 20.0);
        let host = &sched.participants[2];
        assert_eq!(host.payout_tips, 40.0);
        assert_eq!(host.payout_gratuity, 10.0);
        assert_eq!(host.net_payout, Some(50.0));

        for s in &sched.participants[..2] {
            assert_eq!(s.payout_tips, -20.0);
            assert_eq!(s.payout_gratuity, -5.0);
            assert_eq!(s.net_payout, Some(100.0));
        }
    }

    #[test]
    fn test_redistribution_is_pool_neutral_without_manual_receivers() {
        let mut sched = schedule(
            vec![
                contributor("S1", 100.0, 25.0),
                contributor("S2", 100.0, 25.0),
                receiver("H", "Host", 6.0),
                receiver("B", "Busser", 4.0),
            ],
            vec![("Host", 20.0), ("Busser", 5.0)],
            200.0,
            50.0,
        );

        let report = allocate(&mut sched, &AllocationPass::default());
        assert!(
            (report.receiver_payout_total + report.contributor_debit_total).abs() <= 0.01,
            "receivers {} vs contributors {}",
            report.receiver_payout_total,
            report.contributor_debit_total
        );
    }

    #[test]
    fn test_manual_receiver_paid_from_pool_regardless_of_hours() {
        let mut manual = receiver("M", "Expo", 0.0);
        manual.individual_percentage = Some(10.0);

        let mut sched = schedule(
            vec![contributor("S1", 200.0, 50.0), manual, receiver("H", "Host", 6.0)],
            vec![("Host", 20.0)],
            200.0,
            50.0,
        );
        allocate(&mut sched, &AllocationPass::default());
        assert_eq!(sched.participants[1].payout_amount(), 25.0);

        // Other participants' hours do not move a manual receiver's draw.
        sched.participants[2].hours_worked = 0.5;
        sched.participants[1].net_payout = None;
        allocate(&mut sched, &AllocationPass::default());
        assert_eq!(sched.participants[1].payout_amount(), 25.0);
    }

    #[test]
    fn test_receiver_without_hours_gets_nothing_and_does_not_claim() {
        let mut sched = schedule(
            vec![
                contributor("S1", 100.0, 0.0),
                receiver("H1", "Host", 6.0),
                receiver("H2", "Host", 0.0),
            ],
            vec![("Host", 20.0)],
            100.0,
            0.0,
        );
        let report = allocate(&mut sched, &AllocationPass::default());

        // The zero-hour host is neither paid nor counted in the claim.
        assert_eq!(sched.participants[2].payout_amount(), 0.0);
        assert_eq!(report.total_receiver_percentage, 20.0);
        assert_eq!(sched.participants[1].payout_tips, 20.0);
    }

    #[test]
    fn test_zero_tip_contributor_is_left_alone() {
        let mut sched = schedule(
            vec![contributor("S1", 0.0, 0.0), receiver("H", "Host", 6.0)],
            vec![("Host", 20.0)],
            200.0,
            50.0,
        );
        sched.participants[0].prepayout_deduction = 15.0; // stale upstream value

        allocate(&mut sched, &AllocationPass::default());
        let s1 = &sched.participants[0];
        assert_eq!(s1.payout_amount(), 0.0);
        assert_eq!(s1.prepayout_deduction, 0.0);
        assert_eq!(s1.net_payout, Some(0.0));
    }

    #[test]
    fn test_deductions_split_across_earners_only() {
        let mut c1 = contributor("S1", 100.0, 0.0);
        c1.prepayout_deduction = 20.0;
        c1.transfer_fee = 2.0;
        let mut c2 = contributor("S2", 50.0, 0.0);
        c2.prepayout_deduction = 10.0;
        c2.transfer_fee = 2.0;

        let mut sched = schedule(
            vec![c1, c2, receiver("H", "Host", 6.0), receiver("B", "Busser", 0.0)],
            vec![("Host", 20.0)],
            150.0,
            0.0,
        );
        allocate(&mut sched, &AllocationPass::default());

        // Three earners (two servers, the host); the idle busser is spared.
        for p in &sched.participants[..3] {
            assert_eq!(p.prepayout_deduction, 10.0);
            assert_eq!(p.transfer_fee, round2(4.0 / 3.0));
        }
        assert_eq!(sched.participants[3].prepayout_deduction, 0.0);
    }

    #[test]
    fn test_saved_net_survives_until_a_structural_change() {
        let mut sched = schedule(
            vec![contributor("S1", 100.0, 25.0), receiver("H", "Host", 6.0)],
            vec![("Host", 20.0)],
            100.0,
            25.0,
        );
        sched.participants[0].net_payout = Some(93.21);
        sched.participants[0].net_explicit = true;

        allocate(&mut sched, &AllocationPass::default());
        assert_eq!(sched.participants[0].net_payout, Some(93.21));

        let pass = AllocationPass {
            structural_change: true,
            ..AllocationPass::default()
        };
        allocate(&mut sched, &pass);
        assert_eq!(sched.participants[0].net_payout, Some(100.0));
    }

    #[test]
    fn test_threaded_deduction_pool_overrides_current_sum() {
        let mut c = contributor("S1", 100.0, 0.0);
        c.prepayout_deduction = 5.0;
        let mut sched = schedule(vec![c], vec![], 100.0, 0.0);

        let pass = AllocationPass {
            structural_change: true,
            prepayout_pool: Some(30.0),
            fee_pool: Some(0.0),
        };
        allocate(&mut sched, &pass);
        // The pre-removal pool lands on the remaining earner.
        assert_eq!(sched.participants[0].prepayout_deduction, 30.0);
        assert_eq!(sched.participants[0].net_payout, Some(70.0));
    }
}
