use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Queued email delivery job. `attempts` counts deliveries already tried.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailJob {
    pub job_id: Uuid,
    pub to: String,
    pub subject: String,
    pub body: String,
    pub attempts: u32,
    pub max_attempts: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EmailJob {
    pub fn new(to: &str, subject: &str, body: &str, max_attempts: u32) -> Self {
        let now = Utc::now();
        Self {
            job_id: Uuid::new_v4(),
            to: to.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
            attempts: 0,
            max_attempts,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn can_retry(&self) -> bool {
        self.attempts < self.max_attempts
    }

    pub fn message(&self) -> EmailMessage {
        EmailMessage {
            to: self.to.clone(),
            subject: self.subject.clone(),
            body: self.body.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppointmentEvent {
    Created,
    Updated,
}

impl AppointmentEvent {
    pub fn event_name(&self) -> &'static str {
        match self {
            AppointmentEvent::Created => "appointmentCreated",
            AppointmentEvent::Updated => "appointmentUpdated",
        }
    }
}

/// Everything the fan-out needs about an appointment event, decoupled from
/// the appointment cell's own types. `payload` is the full appointment
/// representation pushed over the socket channels.
#[derive(Debug, Clone)]
pub struct AppointmentNotice {
    pub appointment_id: Uuid,
    pub patient_user_id: Uuid,
    pub patient_name: String,
    pub patient_email: Option<String>,
    pub doctor_user_id: Uuid,
    pub doctor_name: String,
    pub doctor_email: Option<String>,
    pub date: DateTime<Utc>,
    pub time: String,
    pub status: String,
    pub payload: Value,
}
