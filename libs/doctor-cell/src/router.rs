use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::{auth_middleware, require_doctor};

use crate::handlers;

pub fn doctor_routes(state: Arc<AppConfig>) -> Router {
    let protected_routes = Router::new()
        .route("/apply", post(handlers::apply_as_doctor))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let doctor_routes = Router::new()
        .route("/profile", get(handlers::get_current_doctor_profile))
        .layer(middleware::from_fn(require_doctor))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .route("/", get(handlers::get_doctors))
        .route("/availability/check", get(handlers::check_availability))
        .route("/{doctor_id}", get(handlers::get_doctor_by_id))
        .merge(protected_routes)
        .merge(doctor_routes)
        .with_state(state)
}
