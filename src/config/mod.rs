//! Application configuration

pub mod texts;
pub mod widget;

use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub use texts::{builtin, Texts};
pub use widget::{is_http_url, ConfigError, WidgetConfig};

/// Environment variable overriding the webhook endpoint
pub const WEBHOOK_URL_ENV: &str = "CHAT_WEBHOOK_URL";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub webhook_url: String,
    pub data_dir: PathBuf,
    pub widget_config: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            webhook_url: resolve_webhook_url(env::var(WEBHOOK_URL_ENV).ok()),
            data_dir: env::var("INFRASENSE_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./data")),
            widget_config: env::var("INFRASENSE_WIDGET_CONFIG").ok().map(PathBuf::from),
        })
    }

    /// Load the widget TOML if one is configured, otherwise the compiled-in defaults
    pub fn load_widget_config(&self) -> Result<WidgetConfig, ConfigError> {
        let config = match &self.widget_config {
            Some(path) => WidgetConfig::from_file(path)?,
            None => WidgetConfig::default(),
        };
        config.validate()?;
        Ok(config)
    }
}

/// Blank or missing overrides fall back to the built-in endpoint
pub fn resolve_webhook_url(value: Option<String>) -> String {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| builtin::WEBHOOK_URL.to_string())
}
