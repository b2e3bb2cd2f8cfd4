use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::{auth_middleware, require_admin};

use crate::handlers;

pub fn admin_routes(state: Arc<AppConfig>) -> Router {
    let protected_routes = Router::new()
        .route("/stats", get(handlers::get_stats))
        .route("/pending-doctors", get(handlers::list_pending_doctors))
        .route("/approve-doctor/{doctor_id}", post(handlers::approve_doctor))
        .route("/reject-doctor/{doctor_id}", post(handlers::reject_doctor))
        .layer(middleware::from_fn(require_admin))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
