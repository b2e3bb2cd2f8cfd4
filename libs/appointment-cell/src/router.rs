use std::sync::Arc;

use axum::{
    extract::Extension,
    middleware,
    routing::{get, post, put},
    Router,
};

use notification_cell::NotificationService;
use shared_config::AppConfig;
use shared_utils::extractor::{auth_middleware, require_admin, require_admin_or_doctor, require_doctor};

use crate::handlers;
use crate::services::locks::SlotLocks;

pub fn appointment_routes(
    state: Arc<AppConfig>,
    notifier: Arc<NotificationService>,
    locks: Arc<SlotLocks>,
) -> Router {
    let doctor_routes = Router::new()
        .route("/doctor", get(handlers::list_doctor_appointments))
        .layer(middleware::from_fn(require_doctor));

    let admin_routes = Router::new()
        .route("/all", get(handlers::admin_list_all))
        .layer(middleware::from_fn(require_admin));

    let status_routes = Router::new()
        .route("/status/{appointment_id}", put(handlers::update_status))
        .layer(middleware::from_fn(require_admin_or_doctor));

    let protected_routes = Router::new()
        .route("/book", post(handlers::book_appointment))
        .route("/me", get(handlers::list_my_appointments))
        .route("/reschedule/{appointment_id}", put(handlers::reschedule_appointment))
        .merge(doctor_routes)
        .merge(admin_routes)
        .merge(status_routes)
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .layer(Extension(notifier))
        .layer(Extension(locks))
        .with_state(state)
}
