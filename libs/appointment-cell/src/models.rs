use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub user_id: Uuid,
    pub date: DateTime<Utc>,
    /// Authoritative slot time, "HH:MM"; `date` supplies the calendar day.
    pub time: String,
    #[serde(default)]
    pub document: Option<String>,
    pub status: AppointmentStatus,
    #[serde(default)]
    pub notes: String,
    pub reason: String,
    #[serde(default)]
    pub consultation_type: ConsultationType,
    #[serde(default)]
    pub prescription: Option<String>,
    #[serde(default)]
    pub follow_up_required: bool,
    #[serde(default)]
    pub follow_up_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    Scheduled,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    pub const VALID_VALUES: &'static str = "pending, scheduled, completed, cancelled";

    pub fn is_terminal(&self) -> bool {
        matches!(self, AppointmentStatus::Completed | AppointmentStatus::Cancelled)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Pending => write!(f, "pending"),
            AppointmentStatus::Scheduled => write!(f, "scheduled"),
            AppointmentStatus::Completed => write!(f, "completed"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl FromStr for AppointmentStatus {
    type Err = AppointmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(AppointmentStatus::Pending),
            "scheduled" => Ok(AppointmentStatus::Scheduled),
            "completed" => Ok(AppointmentStatus::Completed),
            "cancelled" => Ok(AppointmentStatus::Cancelled),
            other => Err(AppointmentError::InvalidStatus(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum ConsultationType {
    #[serde(rename = "online")]
    Online,
    #[default]
    #[serde(rename = "in-person")]
    InPerson,
}

impl fmt::Display for ConsultationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsultationType::Online => write!(f, "online"),
            ConsultationType::InPerson => write!(f, "in-person"),
        }
    }
}

// ==============================================================================
// REFERENCE-EXPANDED VIEWS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorSummary {
    pub id: Uuid,
    pub fullname: String,
    pub specialization: String,
    pub fees: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
}

/// Appointment with its doctor/patient references expanded, the shape every
/// endpoint returns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentDetails {
    #[serde(flatten)]
    pub appointment: Appointment,
    pub doctor: Option<DoctorSummary>,
    pub patient: Option<PatientSummary>,
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct BookAppointmentRequest {
    pub doctor_id: Uuid,
    pub date: DateTime<Utc>,
    pub time: String,
    pub reason: String,
    pub consultation_type: Option<ConsultationType>,
    /// Reference to an already-stored document; upload handling lives
    /// outside this service.
    pub document: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RescheduleRequest {
    pub new_date: DateTime<Utc>,
    pub new_time: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdminListParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub status: Option<String>,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum AppointmentError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Doctor not found")]
    DoctorNotFound,

    #[error("This doctor is not available for booking")]
    DoctorNotApproved,

    #[error("Doctor profile not found. Please complete your registration.")]
    DoctorProfileMissing,

    #[error("This time slot is already booked")]
    SlotTaken,

    #[error("New slot is already booked")]
    NewSlotTaken,

    #[error("Invalid status. Valid statuses: {}", AppointmentStatus::VALID_VALUES)]
    InvalidStatus(String),

    #[error("Cannot transition appointment from {from} to {to}")]
    InvalidTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("Cannot reschedule {0} appointment")]
    TerminalReschedule(AppointmentStatus),

    #[error("Database error: {0}")]
    Database(String),
}
