use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ==============================================================================
// CORE DOCTOR MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Doctor {
    pub id: Uuid,
    pub user_id: Uuid,
    pub fullname: String,
    pub email: String,
    pub phone: String,
    pub specialization: String,
    pub experience: u32,
    pub fees: f64,
    pub address: String,
    #[serde(default)]
    pub timings: WorkingHours,
    pub status: DoctorStatus,
    #[serde(default)]
    pub about: String,
    #[serde(default)]
    pub profile_image: Option<String>,
    #[serde(default)]
    pub certificates: Vec<Certificate>,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub total_reviews: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Daily availability window, applied uniformly across all days.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkingHours {
    pub start_time: String,
    pub end_time: String,
}

impl Default for WorkingHours {
    fn default() -> Self {
        Self {
            start_time: "09:00".to_string(),
            end_time: "17:00".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Certificate {
    pub title: String,
    pub url: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DoctorStatus {
    Pending,
    Approved,
    Rejected,
}

impl fmt::Display for DoctorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DoctorStatus::Pending => write!(f, "pending"),
            DoctorStatus::Approved => write!(f, "approved"),
            DoctorStatus::Rejected => write!(f, "rejected"),
        }
    }
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct DoctorApplicationRequest {
    pub fullname: String,
    pub email: String,
    pub phone: String,
    pub specialization: String,
    pub experience: u32,
    pub fees: f64,
    pub address: String,
    pub about: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DoctorListParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub specialization: Option<String>,
    pub min_fees: Option<i64>,
    pub max_fees: Option<i64>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AvailabilityParams {
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    pub time: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AvailabilityCheck {
    pub available: bool,
    pub doctor: Doctor,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum DoctorError {
    #[error("Doctor not found")]
    NotFound,

    #[error("This doctor is not available for booking")]
    NotApproved,

    #[error("You have already applied as a doctor")]
    AlreadyApplied,

    #[error("Invalid time format")]
    InvalidTime,

    #[error("Doctor is not available at {time}. Working hours: {start} - {end}")]
    OutsideWorkingHours {
        time: String,
        start: String,
        end: String,
    },

    #[error("This slot is already booked. Please choose another time")]
    SlotTaken,

    #[error("Database error: {0}")]
    Database(String),
}
