//! Automation webhook integration

mod http;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

pub use http::HttpWebhook;

/// Any failure talking to the webhook. Callers only ever see one category.
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("Network error: {0}")]
    Network(String),
}

impl From<reqwest::Error> for WebhookError {
    fn from(err: reqwest::Error) -> Self {
        WebhookError::Network(err.to_string())
    }
}

/// Body posted to the webhook
#[derive(Debug, Clone, Serialize)]
pub struct OutgoingMessage {
    pub message: String,
    #[serde(rename = "sessionId")]
    pub session_id: String,
}

/// Something that turns a visitor message into a raw reply
#[async_trait]
pub trait Webhook: Send + Sync {
    async fn send_message(&self, text: &str, session_id: &str) -> Result<Value, WebhookError>;
}

/// Pick the raw reply out of a response body: `reply`, then `message`, then the body itself
pub fn extract_reply(body: Value) -> Value {
    match body {
        Value::Object(mut map) => {
            for key in ["reply", "message"] {
                match map.remove(key) {
                    Some(Value::Null) | None => continue,
                    Some(value) => return value,
                }
            }
            Value::Object(map)
        }
        other => other,
    }
}
