use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::config::AppConfig;

/// Outgoing email
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl EmailMessage {
    pub fn password_reset(to: &str, username: &str, reset_url: &str) -> Self {
        Self {
            to: to.to_string(),
            subject: "Password reset".to_string(),
            body: format!(
                "Hello {},\n\nUse the link below to choose a new password:\n{}\n\nIf you did not request this you can ignore this email.",
                username, reset_url
            ),
        }
    }
}

/// Mail delivery errors
#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("Mail transport error: {0}")]
    Transport(String),
    #[error("Mail provider rejected message: {0}")]
    Rejected(String),
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: EmailMessage) -> Result<(), NotificationError>;
}

/// Sends mail through a SendGrid-compatible HTTP API
#[derive(Clone)]
pub struct HttpMailer {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
    from: String,
}

impl HttpMailer {
    pub fn new(client: reqwest::Client, api_base: String, api_key: String, from: String) -> Self {
        Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key,
            from,
        }
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    #[instrument(skip(self, message), fields(to = %message.to))]
    async fn send(&self, message: EmailMessage) -> Result<(), NotificationError> {
        let payload = json!({
            "personalizations": [{"to": [{"email": message.to}]}],
            "from": {"email": self.from},
            "subject": message.subject,
            "content": [{"type": "text/plain", "value": message.body}],
        });

        let response = self
            .client
            .post(format!("{}/v3/mail/send", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| NotificationError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, "Mail provider rejected message");
            return Err(NotificationError::Rejected(format!("{}: {}", status, body)));
        }

        info!("Email dispatched");
        Ok(())
    }
}

/// Writes mail to the log instead of sending it
#[derive(Clone, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: EmailMessage) -> Result<(), NotificationError> {
        info!(to = %message.to, subject = %message.subject, body = %message.body, "Email (not sent, no mail API key configured)");
        Ok(())
    }
}

/// Keeps every message in memory
#[derive(Clone, Default)]
pub struct RecordingMailer {
    sent: Arc<Mutex<Vec<EmailMessage>>>,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: EmailMessage) -> Result<(), NotificationError> {
        self.sent
            .lock()
            .map_err(|_| NotificationError::Transport("mailbox poisoned".into()))?
            .push(message);
        Ok(())
    }
}

/// Picks the HTTP mailer when an API key is configured
pub fn mailer_from_config(cfg: &AppConfig, client: reqwest::Client) -> Arc<dyn Mailer> {
    match &cfg.email_api_key {
        Some(key) if !key.is_empty() => Arc::new(HttpMailer::new(
            client,
            cfg.email_api_base.clone(),
            key.clone(),
            cfg.email_from.clone(),
        )),
        _ => {
            warn!("No email API key configured; emails will only be logged");
            Arc::new(LogMailer)
        }
    }
}
