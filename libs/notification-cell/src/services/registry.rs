use std::collections::HashMap;

use serde_json::{json, Value};
use tokio::sync::{broadcast, RwLock};
use tracing::debug;
use uuid::Uuid;

pub type SocketSender = broadcast::Sender<String>;
pub type SocketReceiver = broadcast::Receiver<String>;

const CHANNEL_CAPACITY: usize = 100;

/// Per-user event channels for the real-time layer. Constructed once in the
/// binary and handed to routers and the fan-out service explicitly.
pub struct SocketRegistry {
    channels: RwLock<HashMap<Uuid, SocketSender>>,
}

impl SocketRegistry {
    pub fn new() -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
        }
    }

    /// Join a user's channel, creating it on first subscription.
    pub async fn subscribe(&self, user_id: Uuid) -> SocketReceiver {
        let mut channels = self.channels.write().await;
        let sender = channels.entry(user_id).or_insert_with(|| {
            let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
            sender
        });

        debug!("User {} joined socket channel", user_id);
        sender.subscribe()
    }

    /// Push an event to a user's channel, if the user is currently connected.
    pub async fn emit_to_user(&self, user_id: Uuid, event: &str, payload: &Value) {
        let message = json!({
            "event": event,
            "data": payload
        })
        .to_string();

        let channels = self.channels.read().await;
        match channels.get(&user_id) {
            Some(sender) => {
                if let Err(e) = sender.send(message) {
                    // All receivers dropped; the user disconnected.
                    debug!("No active sockets for user {}: {}", user_id, e);
                }
            }
            None => {
                debug!("User {} has no socket channel, event {} dropped", user_id, event);
            }
        }
    }

    pub async fn connected_users(&self) -> Vec<Uuid> {
        let channels = self.channels.read().await;
        channels
            .iter()
            .filter(|(_, sender)| sender.receiver_count() > 0)
            .map(|(id, _)| *id)
            .collect()
    }
}

impl Default for SocketRegistry {
    fn default() -> Self {
        Self::new()
    }
}
