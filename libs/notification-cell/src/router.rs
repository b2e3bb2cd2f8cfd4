use std::sync::Arc;

use axum::{extract::Extension, routing::get, Router};

use shared_config::AppConfig;

use crate::handlers;
use crate::services::registry::SocketRegistry;

/// The socket route does not sit behind the auth middleware: a connection
/// without a valid credential stays un-joined instead of being rejected.
pub fn notification_routes(state: Arc<AppConfig>, registry: Arc<SocketRegistry>) -> Router {
    Router::new()
        .route("/ws", get(handlers::ws_handler))
        .layer(Extension(registry))
        .with_state(state)
}
