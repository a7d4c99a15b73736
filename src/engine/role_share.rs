use std::collections::HashMap;

use tracing::debug;

use crate::model::entitlement::RoleEntitlement;
use crate::model::participant::{Participant, ParticipantKind};
use crate::utils::money::role_key;

/// Per-role per-employee shares resolved from the entitlement table.
#[derive(Debug, Default, Clone)]
pub struct RoleShares {
    shares: HashMap<String, f64>,
    missing: Vec<String>,
}

impl RoleShares {
    /// Per-employee share for a job title; 0 for unknown or missing roles.
    pub fn share_for(&self, job_title: &str) -> f64 {
        self.shares.get(&role_key(job_title)).copied().unwrap_or(0.0)
    }

    /// Entitled roles with no eligible receiver assigned. Not an error:
    /// the caller offers to assign someone or leaves the role unpaid.
    pub fn missing_roles(&self) -> &[String] {
        &self.missing
    }
}

/// Split each entitlement's percentage across the receivers eligible for
/// that role. Eligible means active, not manual, and with worked hours;
/// manual receivers keep their own percentage and never dilute the split.
pub fn resolve(entitlements: &[RoleEntitlement], participants: &[Participant]) -> RoleShares {
    let mut eligible: HashMap<String, usize> = HashMap::new();
    for p in participants {
        if p.is_active()
            && p.kind == ParticipantKind::Receiver
            && !p.is_manual()
            && p.hours_worked > 0.0
        {
            *eligible.entry(p.role_key()).or_insert(0) += 1;
        }
    }

    let mut resolved = RoleShares::default();
    for ent in entitlements.iter().filter(|e| !e.is_contributor_role) {
        let key = ent.normalized_key();
        let count = eligible.get(&key).copied().unwrap_or(0);
        if count == 0 {
            debug!(role = %key, "no eligible receiver for entitled role");
            resolved.missing.push(key.clone());
            resolved.shares.insert(key, 0.0);
        } else {
            resolved
                .shares
                .insert(key, ent.payout_percentage / count as f64);
        }
    }
    resolved
}

/// A receiver's effective percentage: its operator override when positive,
/// else the role-derived share.
pub fn effective_percentage(participant: &Participant, shares: &RoleShares) -> f64 {
    match participant.individual_percentage {
        Some(pct) if pct > 0.0 => pct,
        _ => shares.share_for(&participant.job_title),
    }
}
