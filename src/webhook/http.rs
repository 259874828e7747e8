//! HTTP webhook client

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use super::{extract_reply, OutgoingMessage, Webhook, WebhookError};

/// Header identifying the widget to the automation backend
pub const CLIENT_HEADER: &str = "X-Client";

pub struct HttpWebhook {
    client: Client,
    url: String,
    client_tag: String,
}

impl HttpWebhook {
    pub fn new(url: impl Into<String>, client_tag: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
            client_tag: client_tag.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Webhook for HttpWebhook {
    async fn send_message(&self, text: &str, session_id: &str) -> Result<Value, WebhookError> {
        let request = OutgoingMessage {
            message: text.to_string(),
            session_id: session_id.to_string(),
        };

        tracing::debug!(url = %self.url, session_id, "posting message to webhook");

        let response = self
            .client
            .post(&self.url)
            .header(CLIENT_HEADER, &self.client_tag)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(%status, "webhook answered with an error status");
            return Err(WebhookError::Network(format!("{}: {}", status, body)));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| WebhookError::Network(format!("Failed to parse response: {}", e)))?;

        Ok(extract_reply(body))
    }
}
