use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use notification_cell::NotificationService;
use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_models::pagination::PageParams;

use crate::models::{
    AdminListParams, AppointmentError, AppointmentStatus, BookAppointmentRequest,
    RescheduleRequest, UpdateStatusRequest,
};
use crate::services::booking::AppointmentBookingService;
use crate::services::locks::SlotLocks;

fn map_appointment_error(err: AppointmentError) -> AppError {
    match err {
        AppointmentError::NotFound => AppError::NotFound(err.to_string()),
        AppointmentError::DoctorNotFound => AppError::NotFound(err.to_string()),
        AppointmentError::DoctorProfileMissing => AppError::NotFound(err.to_string()),
        AppointmentError::DoctorNotApproved => AppError::InvalidOperation(err.to_string()),
        AppointmentError::SlotTaken | AppointmentError::NewSlotTaken => {
            AppError::Conflict(err.to_string())
        }
        AppointmentError::InvalidStatus(_) => AppError::ValidationError(err.to_string()),
        AppointmentError::InvalidTransition { .. } => AppError::InvalidOperation(err.to_string()),
        AppointmentError::TerminalReschedule(_) => AppError::InvalidOperation(err.to_string()),
        AppointmentError::Database(msg) => AppError::Database(msg),
    }
}

fn caller_id(user: &User) -> Result<Uuid, AppError> {
    Uuid::parse_str(&user.id)
        .map_err(|_| AppError::Auth("Invalid user identifier in token".to_string()))
}

fn service(
    state: &AppConfig,
    notifier: Arc<NotificationService>,
    locks: Arc<SlotLocks>,
) -> AppointmentBookingService {
    AppointmentBookingService::new(state, notifier, locks)
}

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Extension(notifier): Extension<Arc<NotificationService>>,
    Extension(locks): Extension<Arc<SlotLocks>>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let user_id = caller_id(&user)?;

    let appointment = service(&state, notifier, locks)
        .book(user_id, request)
        .await
        .map_err(map_appointment_error)?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Appointment requested",
            "appointment": appointment
        })),
    ))
}

#[axum::debug_handler]
pub async fn list_my_appointments(
    State(state): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Extension(notifier): Extension<Arc<NotificationService>>,
    Extension(locks): Extension<Arc<SlotLocks>>,
    Query(params): Query<PageParams>,
) -> Result<Json<Value>, AppError> {
    let user_id = caller_id(&user)?;

    let result = service(&state, notifier, locks)
        .list_for_user(user_id, params.page(), params.limit())
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(json!(result)))
}

#[axum::debug_handler]
pub async fn list_doctor_appointments(
    State(state): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Extension(notifier): Extension<Arc<NotificationService>>,
    Extension(locks): Extension<Arc<SlotLocks>>,
    Query(params): Query<PageParams>,
) -> Result<Json<Value>, AppError> {
    let user_id = caller_id(&user)?;

    let result = service(&state, notifier, locks)
        .list_for_doctor_user(user_id, params.page(), params.limit())
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(json!(result)))
}

#[axum::debug_handler]
pub async fn admin_list_all(
    State(state): State<Arc<AppConfig>>,
    Extension(notifier): Extension<Arc<NotificationService>>,
    Extension(locks): Extension<Arc<SlotLocks>>,
    Query(params): Query<AdminListParams>,
) -> Result<Json<Value>, AppError> {
    let status = match &params.status {
        Some(raw) => Some(
            raw.parse::<AppointmentStatus>()
                .map_err(map_appointment_error)?,
        ),
        None => None,
    };

    let page = params.page.filter(|p| *p > 0).unwrap_or(1);
    let limit = params.limit.filter(|l| *l > 0).unwrap_or(10);

    let result = service(&state, notifier, locks)
        .list_all(page, limit, status)
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(json!(result)))
}

#[axum::debug_handler]
pub async fn update_status(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    Extension(notifier): Extension<Arc<NotificationService>>,
    Extension(locks): Extension<Arc<SlotLocks>>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<Value>, AppError> {
    let appointment = service(&state, notifier, locks)
        .update_status(appointment_id, &request.status)
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(json!({
        "message": "Appointment status updated",
        "appointment": appointment
    })))
}

#[axum::debug_handler]
pub async fn reschedule_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    Extension(notifier): Extension<Arc<NotificationService>>,
    Extension(locks): Extension<Arc<SlotLocks>>,
    Json(request): Json<RescheduleRequest>,
) -> Result<Json<Value>, AppError> {
    let appointment = service(&state, notifier, locks)
        .reschedule(appointment_id, request.new_date, &request.new_time)
        .await
        .map_err(map_appointment_error)?;

    Ok(Json(json!({
        "message": "Appointment rescheduled",
        "appointment": appointment
    })))
}
