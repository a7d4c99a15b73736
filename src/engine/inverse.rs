use tracing::debug;

use crate::model::participant::{Participant, ParticipantKind};
use crate::model::schedule::PoolTotals;
use crate::utils::money::{parse_percent, round2};

/// Back-compute the percentage consistent with an operator-edited net
/// dollar amount, so a forward pass re-derives payout fields without
/// losing the edit.
///
/// Returns `None` when the denominator guard fails (a contributor with no
/// earnings, or an empty pool); the edit is then skipped.
pub fn percentage_for_net(
    participant: &Participant,
    totals: &PoolTotals,
    net_value: f64,
) -> Option<f64> {
    match participant.kind {
        ParticipantKind::Contributor => {
            let gross_total = participant.tip_total();
            if gross_total <= 0.0 {
                return None;
            }
            // The debit that leaves exactly net_value after deductions.
            let debit = gross_total
                - net_value
                - participant.prepayout_deduction
                - participant.transfer_fee;
            Some(round2(debit / gross_total * 100.0))
        }
        ParticipantKind::Receiver => {
            let pool = totals.distributable();
            if pool <= 0.0 {
                return None;
            }
            let gross_payout =
                net_value + participant.prepayout_deduction + participant.transfer_fee;
            Some(round2(gross_payout / pool * 100.0))
        }
    }
}

/// Parse a direct percentage edit. Only receivers take one; a contributor's
/// rate is always derived from the aggregate receiver claim.
pub fn percentage_edit(participant: &Participant, raw: &str) -> Option<f64> {
    if participant.kind != ParticipantKind::Receiver {
        debug!(
            name = %participant.display_name,
            "percentage edits only apply to receivers, ignoring"
        );
        return None;
    }
    parse_percent(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::allocation::{AllocationPass, allocate};
    use crate::model::entitlement::RoleEntitlement;
    use crate::model::participant::ParticipantStatus;
    use crate::model::schedule::PayoutSchedule;
    use chrono::NaiveDate;
    use proptest::prelude::*;

    fn totals(tips: f64, gratuity: f64) -> PoolTotals {
        PoolTotals {
            total_tips: tips,
            total_gratuity: gratuity,
            ..PoolTotals::default()
        }
    }

    fn participant(kind: ParticipantKind) -> Participant {
        Participant {
            employee_id: Some(1),
            display_name: "P".to_string(),
            job_title: "Host".to_string(),
            kind,
            status: ParticipantStatus::Active,
            hours_worked: 5.0,
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

    #[test]
    fn test_receiver_net_edit_back_solves_against_the_pool() {
        let mut r = participant(ParticipantKind::Receiver);
        r.prepayout_deduction = 5.0;
        r.transfer_fee = 1.0;

        // gross draw of 56 out of a 250 pool
        let pct = percentage_for_net(&r, &totals(200.0, 50.0), 50.0).unwrap();
        assert_eq!(pct, round2(56.0 / 250.0 * 100.0));
    }

    #[test]
    fn test_contributor_net_edit_back_solves_against_own_earnings() {
        let mut c = participant(ParticipantKind::Contributor);
        c.total_tips = 100.0;
        c.total_gratuity = 25.0;
        c.prepayout_deduction = 5.0;

        // keep $90 of $125 after a $5 advance: debit is $30
        let pct = percentage_for_net(&c, &totals(200.0, 50.0), 90.0).unwrap();
        assert_eq!(pct, 24.0);
    }

    #[test]
    fn test_guards_skip_empty_denominators() {
        let c = participant(ParticipantKind::Contributor);
        assert_eq!(percentage_for_net(&c, &totals(200.0, 50.0), 10.0), None);

        let r = participant(ParticipantKind::Receiver);
        assert_eq!(percentage_for_net(&r, &totals(0.0, 0.0), 10.0), None);
    }

    #[test]
    fn test_percentage_edit_is_receiver_only() {
        let r = participant(ParticipantKind::Receiver);
        assert_eq!(percentage_edit(&r, "12.5 %"), Some(12.5));
        assert_eq!(percentage_edit(&r, "garbage"), None);

        let c = participant(ParticipantKind::Contributor);
        assert_eq!(percentage_edit(&c, "12.5"), None);
    }

    #[test]
    fn test_net_edit_round_trip_lands_on_the_cent() {
        let mut r = participant(ParticipantKind::Receiver);
        r.prepayout_deduction = 5.0;
        r.transfer_fee = 1.0;
        let pool = totals(200.0, 50.0);

        let pct = percentage_for_net(&r, &pool, 50.0).unwrap();
        assert_eq!(pct, 22.4);

        let mut sched = PayoutSchedule {
            schedule_id: 1,
            business_date: NaiveDate::from_ymd_opt(2026, 3, 14).unwrap(),
            rule_label: "nightly".to_string(),
            participants: vec![{
                let mut edited = r;
                edited.individual_percentage = Some(pct);
                edited
            }],
            entitlements: vec![],
            totals: pool,
            is_approved: false,
        };
        let pass = AllocationPass {
            structural_change: true,
            prepayout_pool: Some(5.0),
            fee_pool: Some(1.0),
        };
        allocate(&mut sched, &pass);
        let recomputed = sched.participants[0].net_payout.unwrap();
        assert!((recomputed - 50.0).abs() <= 0.01, "got {recomputed}");
    }

    proptest! {
        // Setting net = N on a receiver, back-solving the percentage and
        // re-running the forward pass reproduces N up to quantization:
        // half a cent on each of the two rounded payout components plus
        // half a basis point of the pool from rounding the percentage.
        #[test]
        fn receiver_net_edit_round_trips(
            net in 1.0f64..400.0,
            prepayout in 0.0f64..40.0,
            fee in 0.0f64..10.0,
            tips in 100.0f64..2_000.0,
            gratuity in 0.0f64..500.0,
        ) {
            let net = round2(net);
            let prepayout = round2(prepayout);
            let fee = round2(fee);

            let mut r = participant(ParticipantKind::Receiver);
            r.prepayout_deduction = prepayout;
            r.transfer_fee = fee;

            let pool = totals(tips, gratuity);
            let pct = percentage_for_net(&r, &pool, net).unwrap();

            let mut sched = PayoutSchedule {
                schedule_id: 1,
                business_date: NaiveDate::from_ymd_opt(2026, 3, 14).unwrap(),
                rule_label: "nightly".to_string(),
                participants: vec![{
                    let mut edited = r.clone();
                    edited.individual_percentage = Some(pct);
                    edited
                }],
                entitlements: vec![RoleEntitlement {
                    role_key: "Host".to_string(),
                    payout_percentage: 0.0,
                    is_contributor_role: false,
                }],
                totals: pool,
                is_approved: false,
            };

            // Keep the same per-person deductions the solve assumed.
            let pass = AllocationPass {
                structural_change: true,
                prepayout_pool: Some(prepayout),
                fee_pool: Some(fee),
            };
            allocate(&mut sched, &pass);

            let recomputed = sched.participants[0].net_payout.unwrap();
            let tolerance = 0.01 + (tips + gratuity) * 0.00005 + 0.005;
            prop_assert!(
                (recomputed - net).abs() <= tolerance,
                "expected {} got {}", net, recomputed
            );
        }
    }
}
