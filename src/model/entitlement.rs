use serde::{Deserialize, Serialize};

use crate::utils::money::role_key;

/// The negotiated percentage a receiver role is owed from the pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleEntitlement {
    /// Case-insensitive job title / receiver id.
    pub role_key: String,
    pub payout_percentage: f64,
    /// Always false in the receiver entitlement table; kept because the
    /// source rows carry it.
    #[serde(default)]
    pub is_contributor_role: bool,
}

impl RoleEntitlement {
    pub fn normalized_key(&self) -> String {
        role_key(&self.role_key)
    }

    pub fn matches(&self, job_title: &str) -> bool {
        self.normalized_key() == role_key(job_title)
    }
}
