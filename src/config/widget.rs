//! Widget configuration loaded from TOML files
//!
//! Every deployment of the chat widget can override:
//! - Panel title, greeting and the client tag sent to the webhook
//! - How object-shaped replies map to a booking button
//! - The scheduling page and the assets of the scheduling widget
//! - The quick-send suggestions
//!
//! Everything is optional; a missing file means the compiled-in defaults.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::reply::BookingPolicy;

use super::texts::builtin;

/// Root widget configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WidgetConfig {
    /// Panel settings
    #[serde(default)]
    pub widget: PanelConfig,

    /// Reply normalisation settings
    #[serde(default)]
    pub replies: RepliesConfig,

    /// Scheduling widget settings
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Quick-send suggestions
    #[serde(default)]
    pub suggestions: SuggestionsConfig,
}

impl WidgetConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load configuration from a TOML string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: WidgetConfig = toml::from_str(content)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.widget.client_tag.trim().is_empty() {
            return Err(ConfigError::Validation("widget.client_tag must not be empty".into()));
        }

        for (field, value) in [
            ("scheduler.url", &self.scheduler.url),
            ("scheduler.script_url", &self.scheduler.script_url),
            ("scheduler.stylesheet_url", &self.scheduler.stylesheet_url),
        ] {
            if !is_http_url(value) {
                return Err(ConfigError::Validation(format!(
                    "{} must be an http(s) URL, got '{}'",
                    field, value
                )));
            }
        }

        Ok(())
    }
}

/// Only http(s) URLs are ever handed to a browser
pub fn is_http_url(value: &str) -> bool {
    let lower = value.trim_start().to_ascii_lowercase();
    lower.starts_with("https://") || lower.starts_with("http://")
}

/// Panel configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PanelConfig {
    #[serde(default = "default_title")]
    pub title: String,

    /// First assistant message, empty disables it
    #[serde(default = "default_greeting")]
    pub greeting: String,

    /// Sent as the `X-Client` header
    #[serde(default = "default_client_tag")]
    pub client_tag: String,
}

fn default_title() -> String {
    builtin::TITLE.to_string()
}

fn default_greeting() -> String {
    builtin::GREETING.to_string()
}

fn default_client_tag() -> String {
    builtin::CLIENT_TAG.to_string()
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            greeting: default_greeting(),
            client_tag: default_client_tag(),
        }
    }
}

/// Reply configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepliesConfig {
    #[serde(default)]
    pub booking_policy: BookingPolicy,
}

/// Scheduling widget configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Booking page opened in the popup
    #[serde(default = "default_scheduler_url")]
    pub url: String,

    #[serde(default = "default_script_url")]
    pub script_url: String,

    #[serde(default = "default_stylesheet_url")]
    pub stylesheet_url: String,
}

fn default_scheduler_url() -> String {
    builtin::SCHEDULER_URL.to_string()
}

fn default_script_url() -> String {
    builtin::SCHEDULER_SCRIPT_URL.to_string()
}

fn default_stylesheet_url() -> String {
    builtin::SCHEDULER_STYLESHEET_URL.to_string()
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            url: default_scheduler_url(),
            script_url: default_script_url(),
            stylesheet_url: default_stylesheet_url(),
        }
    }
}

/// Suggestion configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestionsConfig {
    #[serde(default = "default_suggestions")]
    pub items: Vec<String>,
}

fn default_suggestions() -> Vec<String> {
    builtin::SUGGESTIONS.iter().map(|s| s.to_string()).collect()
}

impl Default for SuggestionsConfig {
    fn default() -> Self {
        Self {
            items: default_suggestions(),
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}
