use chrono::NaiveDate;
use tracing::debug;
use uuid::Uuid;

use doctor_cell::services::availability::day_bounds;
use shared_config::AppConfig;
use shared_database::StoreClient;

use crate::models::AppointmentError;

/// Authoritative no-double-booking check used by the write paths. The same
/// day-window query also backs the advisory availability endpoint in the
/// doctor cell; both must agree on what counts as an occupied slot.
pub struct SlotConflictService {
    store: StoreClient,
}

impl SlotConflictService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            store: StoreClient::new(config),
        }
    }

    /// True when the doctor already has a pending or scheduled appointment
    /// at the same calendar day and time. `exclude_appointment_id` lets a
    /// reschedule skip the appointment being moved.
    pub async fn slot_is_taken(
        &self,
        doctor_id: Uuid,
        day: NaiveDate,
        time: &str,
        exclude_appointment_id: Option<Uuid>,
    ) -> Result<bool, AppointmentError> {
        let (start, end) = day_bounds(day);

        let mut query_parts = vec![
            format!("doctor_id=eq.{}", doctor_id),
            format!("date=gte.{}", urlencoding::encode(&start.to_rfc3339())),
            format!("date=lt.{}", urlencoding::encode(&end.to_rfc3339())),
            format!("time=eq.{}", time),
            "status=in.(pending,scheduled)".to_string(),
        ];

        if let Some(exclude_id) = exclude_appointment_id {
            query_parts.push(format!("id=neq.{}", exclude_id));
        }

        let query = query_parts.join("&");
        debug!("Checking slot conflicts: {}", query);

        let existing = self
            .store
            .find("appointments", &query)
            .await
            .map_err(|e| AppointmentError::Database(e.to_string()))?;

        Ok(!existing.is_empty())
    }
}
