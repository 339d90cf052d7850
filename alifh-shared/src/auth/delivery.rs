/// Magic-link delivery
///
/// The API hands each link to a [`MagicLinkSender`]. Two implementations
/// ship here: [`LogSender`] writes the link to the log (local development)
/// and [`WebhookSender`] POSTs it as JSON to an email relay.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;
use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("Delivery request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Delivery endpoint returned status {0}")]
    Status(u16),
}

/// Payload handed to a sender
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MagicLinkMessage {
    pub email: String,
    pub url: String,
    pub expires_at: DateTime<Utc>,
}

#[async_trait]
pub trait MagicLinkSender: Send + Sync {
    async fn send(&self, message: &MagicLinkMessage) -> Result<(), DeliveryError>;
}

/// Logs the link instead of sending it
#[derive(Debug, Clone, Default)]
pub struct LogSender;

#[async_trait]
impl MagicLinkSender for LogSender {
    async fn send(&self, message: &MagicLinkMessage) -> Result<(), DeliveryError> {
        info!(
            email = %message.email,
            url = %message.url,
            expires_at = %message.expires_at,
            "Magic link issued"
        );
        Ok(())
    }
}

/// POSTs `{ email, url, expires_at }` to an email relay
#[derive(Debug, Clone)]
pub struct WebhookSender {
    client: reqwest::Client,
    endpoint: String,
}

impl WebhookSender {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, DeliveryError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl MagicLinkSender for WebhookSender {
    async fn send(&self, message: &MagicLinkMessage) -> Result<(), DeliveryError> {
        let response = self.client.post(&self.endpoint).json(message).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DeliveryError::Status(status.as_u16()));
        }

        info!(email = %message.email, "Magic link delivered to relay");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_log_sender_succeeds() {
        let message = MagicLinkMessage {
            email: "buyer@example.com".to_string(),
            url: "http://localhost:8080/api/auth/magic-link/verify?token=t".to_string(),
            expires_at: Utc::now(),
        };
        assert!(LogSender.send(&message).await.is_ok());
    }

    #[test]
    fn test_message_serialization() {
        let message = MagicLinkMessage {
            email: "buyer@example.com".to_string(),
            url: "https://alifh.com/x".to_string(),
            expires_at: Utc::now(),
        };
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["email"], "buyer@example.com");
        assert!(json["expires_at"].is_string());
    }

    #[test]
    fn test_webhook_sender_builds() {
        assert!(WebhookSender::new("https://mail.internal/send").is_ok());
    }
}
