use std::collections::HashMap;

use anyhow::Result;
use serde_json::Value;
use tracing::debug;

use shared_config::AppConfig;
use shared_database::StoreClient;

use crate::models::AdminStats;

pub struct StatsService {
    store: StoreClient,
}

impl StatsService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            store: StoreClient::new(config),
        }
    }

    pub async fn get_admin_stats(&self) -> Result<AdminStats> {
        debug!("Computing admin statistics");

        let (total_users, total_doctors, total_appointments, pending_doctors, by_status) = tokio::join!(
            self.store.count("users", ""),
            self.store.count("doctors", ""),
            self.store.count("appointments", ""),
            self.store.count("doctors", "status=eq.pending"),
            self.status_histogram(),
        );

        Ok(AdminStats {
            total_users: total_users?,
            total_doctors: total_doctors?,
            total_appointments: total_appointments?,
            pending_doctors: pending_doctors?,
            appointments_by_status: by_status?,
        })
    }

    /// Group-by-status over a status projection of the whole collection.
    async fn status_histogram(&self) -> Result<HashMap<String, i64>> {
        let rows: Vec<Value> = self.store.find("appointments", "select=status").await?;

        let mut histogram = HashMap::new();
        for row in rows {
            if let Some(status) = row.get("status").and_then(Value::as_str) {
                *histogram.entry(status.to_string()).or_insert(0) += 1;
            }
        }

        Ok(histogram)
    }
}
