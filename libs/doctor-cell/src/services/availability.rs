use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use std::sync::OnceLock;
use tracing::{debug, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::StoreClient;

use crate::models::{Doctor, DoctorError, DoctorStatus, WorkingHours};

fn time_pattern() -> &'static Regex {
    static TIME_RE: OnceLock<Regex> = OnceLock::new();
    TIME_RE.get_or_init(|| Regex::new(r"^\d{2}:\d{2}$").expect("valid time pattern"))
}

/// Parse a zero-padded "HH:MM" string into minutes since midnight.
pub fn parse_minutes(time: &str) -> Option<u32> {
    if !time_pattern().is_match(time) {
        return None;
    }
    let (hours, minutes) = time.split_once(':')?;
    let hours: u32 = hours.parse().ok()?;
    let minutes: u32 = minutes.parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }
    Some(hours * 60 + minutes)
}

/// Window check for a requested slot: inclusive of the start of the working
/// day, exclusive of its end.
pub fn within_working_hours(timings: &WorkingHours, requested: u32) -> bool {
    match (parse_minutes(&timings.start_time), parse_minutes(&timings.end_time)) {
        (Some(start), Some(end)) => requested >= start && requested < end,
        // Unparsable working hours leave the doctor un-windowed.
        _ => true,
    }
}

/// UTC midnight-to-midnight bounds for a calendar day.
pub fn day_bounds(day: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = day.and_hms_opt(0, 0, 0).unwrap().and_utc();
    let end = start + chrono::Duration::days(1);
    (start, end)
}

/// Advisory slot checker. The booking and reschedule paths re-run the same
/// day-window query themselves; this service exists for the pre-submit
/// availability endpoint.
pub struct AvailabilityService {
    store: StoreClient,
}

impl AvailabilityService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            store: StoreClient::new(config),
        }
    }

    pub async fn check_slot_availability(
        &self,
        doctor_id: Uuid,
        day: NaiveDate,
        time: &str,
    ) -> Result<Doctor, DoctorError> {
        debug!("Checking slot availability for doctor {} on {} at {}", doctor_id, day, time);

        let doctor = self.get_doctor(doctor_id).await?;

        if doctor.status != DoctorStatus::Approved {
            return Err(DoctorError::NotApproved);
        }

        let requested = parse_minutes(time).ok_or(DoctorError::InvalidTime)?;

        if !within_working_hours(&doctor.timings, requested) {
            return Err(DoctorError::OutsideWorkingHours {
                time: time.to_string(),
                start: doctor.timings.start_time.clone(),
                end: doctor.timings.end_time.clone(),
            });
        }

        if self.slot_is_taken(doctor_id, day, time).await? {
            warn!("Slot {} {} already booked for doctor {}", day, time, doctor_id);
            return Err(DoctorError::SlotTaken);
        }

        Ok(doctor)
    }

    async fn get_doctor(&self, doctor_id: Uuid) -> Result<Doctor, DoctorError> {
        let query = format!("id=eq.{}", doctor_id);
        let result = self
            .store
            .find_one("doctors", &query)
            .await
            .map_err(|e| DoctorError::Database(e.to_string()))?;

        match result {
            Some(value) => serde_json::from_value(value)
                .map_err(|e| DoctorError::Database(format!("Failed to parse doctor: {}", e))),
            None => Err(DoctorError::NotFound),
        }
    }

    /// An active (pending or scheduled) appointment at the same calendar day
    /// and time blocks the slot.
    async fn slot_is_taken(
        &self,
        doctor_id: Uuid,
        day: NaiveDate,
        time: &str,
    ) -> Result<bool, DoctorError> {
        let (start, end) = day_bounds(day);

        let query = format!(
            "doctor_id=eq.{}&date=gte.{}&date=lt.{}&time=eq.{}&status=in.(pending,scheduled)",
            doctor_id,
            urlencoding::encode(&start.to_rfc3339()),
            urlencoding::encode(&end.to_rfc3339()),
            time,
        );

        let existing = self
            .store
            .find("appointments", &query)
            .await
            .map_err(|e| DoctorError::Database(e.to_string()))?;

        Ok(!existing.is_empty())
    }
}
