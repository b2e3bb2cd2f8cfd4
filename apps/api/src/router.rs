use std::sync::Arc;

use axum::{routing::get, Json, Router};
use chrono::Utc;
use serde_json::{json, Value};

use admin_cell::router::admin_routes;
use appointment_cell::router::appointment_routes;
use appointment_cell::SlotLocks;
use auth_cell::router::auth_routes;
use doctor_cell::router::doctor_routes;
use notification_cell::{notification_routes, NotificationService, SocketRegistry};
use shared_config::AppConfig;

pub fn create_router(
    state: Arc<AppConfig>,
    notifier: Arc<NotificationService>,
    locks: Arc<SlotLocks>,
    registry: Arc<SocketRegistry>,
) -> Router {
    Router::new()
        .route("/", get(|| async { "MediConnect Appointment Booking API is running!" }))
        .route("/api/health", get(health))
        .nest("/api/users", auth_routes(state.clone()))
        .nest("/api/doctors", doctor_routes(state.clone()))
        .nest("/api/admin", admin_routes(state.clone()))
        .nest(
            "/api/appointments",
            appointment_routes(state.clone(), notifier, locks),
        )
        .merge(notification_routes(state, registry))
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "timestamp": Utc::now().to_rfc3339()
    }))
}
