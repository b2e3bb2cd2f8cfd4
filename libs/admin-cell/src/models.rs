use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Aggregate counters for the admin dashboard, read at call time with no
/// caching.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminStats {
    pub total_users: i64,
    pub total_doctors: i64,
    pub total_appointments: i64,
    pub pending_doctors: i64,
    pub appointments_by_status: HashMap<String, i64>,
}
