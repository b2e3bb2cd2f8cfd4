use reqwest::Client;
use serde_json::json;
use tracing::{debug, info};

use shared_config::AppConfig;

use crate::error::NotificationError;
use crate::models::EmailMessage;

/// Email transport. Delivers through the configured mail-relay HTTP API;
/// when no relay is configured, messages are logged instead of sent so the
/// rest of the system keeps working in development.
pub struct Mailer {
    client: Client,
    api_url: Option<String>,
    api_token: Option<String>,
    from: String,
}

impl Mailer {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            api_url: config.mail_api_url.clone(),
            api_token: config.mail_api_token.clone(),
            from: config.mail_from.clone(),
        }
    }

    pub async fn send(&self, message: &EmailMessage) -> Result<(), NotificationError> {
        let Some(api_url) = &self.api_url else {
            info!(
                "Mail transport not configured, logging email to {}: {}",
                message.to, message.subject
            );
            return Ok(());
        };

        let body = json!({
            "from": self.from,
            "to": message.to,
            "subject": message.subject,
            "text": message.body
        });

        let mut request = self.client.post(api_url).json(&body);
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| NotificationError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(NotificationError::Transport(format!(
                "Mail relay error ({}): {}",
                status, error_text
            )));
        }

        debug!("Email delivered to {}", message.to);
        Ok(())
    }
}
