//! Hosts for the third-party scheduling widget
//!
//! A [`ScriptHost`] is whatever can pull the vendor's script and stylesheet
//! in and, once that worked, expose the vendor's popup entry point. The
//! terminal build uses [`HttpScriptHost`], which fetches the assets to make
//! sure the vendor is reachable and hands the booking page to the OS browser.

use async_trait::async_trait;
use reqwest::Client;
use std::sync::{Arc, Mutex, OnceLock};

use super::SchedulerError;

/// Loads the vendor assets and exposes the popup entry point
#[async_trait]
pub trait ScriptHost: Send + Sync {
    async fn inject_script(&self, src: &str) -> Result<(), SchedulerError>;

    async fn inject_stylesheet(&self, href: &str) -> Result<(), SchedulerError>;

    /// The vendor's popup widget, present once the script has loaded
    fn popup_widget(&self) -> Option<Arc<dyn PopupWidget>>;
}

/// The vendor's popup entry point
pub trait PopupWidget: Send + Sync {
    fn init_popup_widget(&self, url: &str) -> Result<(), SchedulerError>;
}

/// Opens a URL in a new browsing context
pub trait UrlOpener: Send + Sync {
    fn open_new_context(&self, url: &str) -> Result<(), SchedulerError>;
}

/// Hands URLs to the operating system's default browser
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemBrowser;

impl UrlOpener for SystemBrowser {
    fn open_new_context(&self, url: &str) -> Result<(), SchedulerError> {
        open::that(url)
            .map_err(|e| SchedulerError::IntegrationUnavailable(format!("{}: {}", url, e)))
    }
}

impl PopupWidget for SystemBrowser {
    fn init_popup_widget(&self, url: &str) -> Result<(), SchedulerError> {
        self.open_new_context(url)
    }
}

/// Script host for the terminal shell
pub struct HttpScriptHost {
    client: Client,
    loaded: Mutex<Vec<String>>,
    widget: OnceLock<Arc<dyn PopupWidget>>,
}

impl HttpScriptHost {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            loaded: Mutex::new(Vec::new()),
            widget: OnceLock::new(),
        }
    }

    /// URLs of the assets fetched so far
    pub fn loaded_assets(&self) -> Vec<String> {
        self.loaded.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    async fn fetch(&self, url: &str) -> Result<(), SchedulerError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| SchedulerError::IntegrationUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SchedulerError::IntegrationUnavailable(format!(
                "{} answered {}",
                url,
                response.status()
            )));
        }

        self.loaded
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(url.to_string());
        Ok(())
    }
}

impl Default for HttpScriptHost {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ScriptHost for HttpScriptHost {
    async fn inject_script(&self, src: &str) -> Result<(), SchedulerError> {
        self.fetch(src).await?;
        let _ = self.widget.set(Arc::new(SystemBrowser));
        Ok(())
    }

    async fn inject_stylesheet(&self, href: &str) -> Result<(), SchedulerError> {
        self.fetch(href).await
    }

    fn popup_widget(&self) -> Option<Arc<dyn PopupWidget>> {
        self.widget.get().cloned()
    }
}
