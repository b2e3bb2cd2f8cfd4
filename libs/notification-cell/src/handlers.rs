use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Extension, Query, State, WebSocketUpgrade,
    },
    http::HeaderMap,
    response::Response,
};
use serde::Deserialize;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_utils::jwt::validate_token;

use crate::services::registry::SocketRegistry;

#[derive(Debug, Deserialize)]
pub struct WsParams {
    pub token: Option<String>,
}

/// WebSocket upgrade for the real-time channel. The bearer credential may
/// arrive as a `token` query parameter or an Authorization header; a
/// connection without a valid credential is accepted but never joined to a
/// user channel, so it simply receives nothing.
#[axum::debug_handler]
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsParams>,
    State(config): State<Arc<AppConfig>>,
    Extension(registry): Extension<Arc<SocketRegistry>>,
    headers: HeaderMap,
) -> Response {
    let token = params.token.or_else(|| bearer_from_headers(&headers));

    let user_id = token
        .and_then(|t| validate_token(&t, &config.jwt_secret).ok())
        .and_then(|user| Uuid::parse_str(&user.id).ok());

    ws.on_upgrade(move |socket| handle_socket(socket, user_id, registry))
}

fn bearer_from_headers(headers: &HeaderMap) -> Option<String> {
    let value = headers.get("Authorization")?.to_str().ok()?;
    value.strip_prefix("Bearer ").map(str::to_string)
}

async fn handle_socket(mut socket: WebSocket, user_id: Option<Uuid>, registry: Arc<SocketRegistry>) {
    let Some(user_id) = user_id else {
        debug!("Unauthenticated socket connection, staying un-joined");
        while let Some(message) = socket.recv().await {
            match message {
                Ok(Message::Close(_)) | Err(_) => break,
                _ => {}
            }
        }
        return;
    };

    let mut events = registry.subscribe(user_id).await;
    debug!("Socket connected for user {}", user_id);

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(text) => {
                    if socket.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Socket for user {} lagged, {} events dropped", user_id, skipped);
                }
                Err(RecvError::Closed) => break,
            },
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(_)) => break,
            },
        }
    }

    debug!("Socket disconnected for user {}", user_id);
}
