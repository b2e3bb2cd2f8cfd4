use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use doctor_cell::models::DoctorError;
use doctor_cell::services::doctor::DoctorService;
use shared_config::AppConfig;
use shared_models::error::AppError;
use shared_models::pagination::PageParams;

use crate::services::stats::StatsService;

fn map_doctor_error(err: DoctorError) -> AppError {
    match err {
        DoctorError::NotFound => AppError::NotFound("Doctor not found".to_string()),
        DoctorError::Database(msg) => AppError::Database(msg),
        other => AppError::Internal(other.to_string()),
    }
}

#[axum::debug_handler]
pub async fn get_stats(State(state): State<Arc<AppConfig>>) -> Result<Json<Value>, AppError> {
    let service = StatsService::new(&state);

    let stats = service
        .get_admin_stats()
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    Ok(Json(json!(stats)))
}

#[axum::debug_handler]
pub async fn list_pending_doctors(
    State(state): State<Arc<AppConfig>>,
    Query(params): Query<PageParams>,
) -> Result<Json<Value>, AppError> {
    let service = DoctorService::new(&state);

    let result = service
        .get_pending(params.page(), params.limit())
        .await
        .map_err(map_doctor_error)?;

    Ok(Json(json!(result)))
}

#[axum::debug_handler]
pub async fn approve_doctor(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = DoctorService::new(&state);

    let doctor = service.approve(doctor_id).await.map_err(map_doctor_error)?;

    Ok(Json(json!({
        "message": "Doctor approved",
        "doctor": doctor
    })))
}

#[axum::debug_handler]
pub async fn reject_doctor(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = DoctorService::new(&state);

    let doctor = service.reject(doctor_id).await.map_err(map_doctor_error)?;

    Ok(Json(json!({
        "message": "Doctor rejected",
        "doctor": doctor
    })))
}
