use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{AvailabilityCheck, AvailabilityParams, DoctorApplicationRequest, DoctorError, DoctorListParams};
use crate::services::availability::AvailabilityService;
use crate::services::doctor::DoctorService;

pub(crate) fn map_doctor_error(err: DoctorError) -> AppError {
    match err {
        DoctorError::NotFound => AppError::NotFound("Doctor not found".to_string()),
        DoctorError::NotApproved => AppError::InvalidOperation(err.to_string()),
        DoctorError::AlreadyApplied => AppError::BadRequest(err.to_string()),
        DoctorError::InvalidTime => AppError::ValidationError(err.to_string()),
        DoctorError::OutsideWorkingHours { .. } => AppError::InvalidOperation(err.to_string()),
        DoctorError::SlotTaken => AppError::Conflict(err.to_string()),
        DoctorError::Database(msg) => AppError::Database(msg),
    }
}

#[axum::debug_handler]
pub async fn get_doctors(
    State(state): State<Arc<AppConfig>>,
    Query(params): Query<DoctorListParams>,
) -> Result<Json<Value>, AppError> {
    let service = DoctorService::new(&state);

    let result = service
        .list_approved(&params)
        .await
        .map_err(map_doctor_error)?;

    Ok(Json(json!(result)))
}

#[axum::debug_handler]
pub async fn get_doctor_by_id(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = DoctorService::new(&state);

    let doctor = service.get_doctor(doctor_id).await.map_err(map_doctor_error)?;

    Ok(Json(json!(doctor)))
}

/// Advisory pre-submit check; the booking path re-validates on write.
#[axum::debug_handler]
pub async fn check_availability(
    State(state): State<Arc<AppConfig>>,
    Query(params): Query<AvailabilityParams>,
) -> Result<Json<AvailabilityCheck>, AppError> {
    let service = AvailabilityService::new(&state);

    let doctor = service
        .check_slot_availability(params.doctor_id, params.date, &params.time)
        .await
        .map_err(map_doctor_error)?;

    Ok(Json(AvailabilityCheck {
        available: true,
        doctor,
    }))
}

#[axum::debug_handler]
pub async fn apply_as_doctor(
    State(state): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Json(request): Json<DoctorApplicationRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let user_id = Uuid::parse_str(&user.id)
        .map_err(|_| AppError::Auth("Invalid user identifier in token".to_string()))?;

    let service = DoctorService::new(&state);
    let doctor = service.apply(user_id, request).await.map_err(map_doctor_error)?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Doctor application submitted",
            "doctor": doctor
        })),
    ))
}

#[axum::debug_handler]
pub async fn get_current_doctor_profile(
    State(state): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let user_id = Uuid::parse_str(&user.id)
        .map_err(|_| AppError::Auth("Invalid user identifier in token".to_string()))?;

    let service = DoctorService::new(&state);
    let doctor = service
        .get_by_user(user_id)
        .await
        .map_err(map_doctor_error)?
        .ok_or_else(|| {
            AppError::NotFound(
                "Doctor profile not found. Please complete your registration.".to_string(),
            )
        })?;

    Ok(Json(json!({ "doctor": doctor })))
}
