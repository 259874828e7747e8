//! Third-party scheduling popup
//!
//! The scheduling vendor ships a script that installs a popup widget. Loading
//! it is owned by a [`SchedulerLoader`]: the first caller starts the load,
//! concurrent callers wait on that same load, and later callers return at
//! once. Share one loader (`Arc`) between all widget instances, or use
//! [`SchedulerLoader::process_wide`].
//!
//! [`Scheduler::open`] never fails. When the popup cannot be shown it opens
//! the page in a new browsing context, and when even that fails the caller
//! gets [`SchedulerOutcome::LinkOnly`]. Popup blocking is invisible to us, so
//! the shell keeps a fallback link next to the trigger in every case.

mod host;

use std::sync::{Arc, OnceLock};

use thiserror::Error;
use tokio::sync::OnceCell;

pub use host::{HttpScriptHost, PopupWidget, ScriptHost, SystemBrowser, UrlOpener};

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("Scheduling widget unavailable: {0}")]
    IntegrationUnavailable(String),
}

static PROCESS_LOADER: OnceLock<Arc<SchedulerLoader>> = OnceLock::new();

/// Lazily loads the vendor script, at most once per successful load
pub struct SchedulerLoader {
    host: Arc<dyn ScriptHost>,
    script_url: String,
    stylesheet_url: Option<String>,
    loaded: OnceCell<()>,
}

impl SchedulerLoader {
    pub fn new(host: Arc<dyn ScriptHost>, script_url: impl Into<String>) -> Self {
        Self {
            host,
            script_url: script_url.into(),
            stylesheet_url: None,
            loaded: OnceCell::new(),
        }
    }

    pub fn with_stylesheet(mut self, href: impl Into<String>) -> Self {
        self.stylesheet_url = Some(href.into());
        self
    }

    /// The loader shared by the whole process; `init` only runs for the first caller
    pub fn process_wide(init: impl FnOnce() -> SchedulerLoader) -> Arc<SchedulerLoader> {
        PROCESS_LOADER.get_or_init(|| Arc::new(init())).clone()
    }

    /// Load the vendor script if needed and return its popup widget
    pub async fn ensure_loaded(&self) -> Result<Arc<dyn PopupWidget>, SchedulerError> {
        if let Some(widget) = self.host.popup_widget() {
            return Ok(widget);
        }

        // A failed load leaves the cell empty so the next call retries
        self.loaded
            .get_or_try_init(|| async {
                tracing::debug!("Injecting scheduler script {}", self.script_url);
                self.host.inject_script(&self.script_url).await?;

                if let Some(ref href) = self.stylesheet_url {
                    if let Err(e) = self.host.inject_stylesheet(href).await {
                        tracing::warn!("Scheduler stylesheet failed to load: {}", e);
                    }
                }
                Ok::<(), SchedulerError>(())
            })
            .await?;

        self.host.popup_widget().ok_or_else(|| {
            SchedulerError::IntegrationUnavailable(format!(
                "{} loaded without installing the widget",
                self.script_url
            ))
        })
    }
}

/// How a scheduling request was served
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerOutcome {
    Popup,
    NewContext,
    /// Nothing could be opened; only the fallback link is left
    LinkOnly,
}

pub struct Scheduler {
    loader: Arc<SchedulerLoader>,
    opener: Arc<dyn UrlOpener>,
}

impl Scheduler {
    pub fn new(loader: Arc<SchedulerLoader>, opener: Arc<dyn UrlOpener>) -> Self {
        Self { loader, opener }
    }

    pub fn loader(&self) -> &Arc<SchedulerLoader> {
        &self.loader
    }

    /// Load the vendor script ahead of time; failures only matter once the visitor books
    pub async fn warm_up(&self) {
        if let Err(e) = self.loader.ensure_loaded().await {
            tracing::debug!("Scheduler warm-up failed: {}", e);
        }
    }

    /// Show the booking page in the vendor popup, or the best available fallback
    pub async fn open(&self, url: &str) -> SchedulerOutcome {
        let popup = match self.loader.ensure_loaded().await {
            Ok(widget) => widget.init_popup_widget(url),
            Err(e) => Err(e),
        };

        match popup {
            Ok(()) => SchedulerOutcome::Popup,
            Err(e) => {
                tracing::warn!("Scheduler popup unavailable, opening new context: {}", e);
                self.open_url(url)
            }
        }
    }

    /// Open a plain link in a new browsing context
    pub fn open_url(&self, url: &str) -> SchedulerOutcome {
        match self.opener.open_new_context(url) {
            Ok(()) => SchedulerOutcome::NewContext,
            Err(e) => {
                tracing::warn!("Could not open {}: {}", url, e);
                SchedulerOutcome::LinkOnly
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Records every URL it was asked to show
    #[derive(Default)]
    pub struct RecordingWidget {
        pub opened: Mutex<Vec<String>>,
        pub fail: bool,
    }

    impl PopupWidget for RecordingWidget {
        fn init_popup_widget(&self, url: &str) -> Result<(), SchedulerError> {
            if self.fail {
                return Err(SchedulerError::IntegrationUnavailable("popup blocked".into()));
            }
            self.opened.lock().unwrap().push(url.to_string());
            Ok(())
        }
    }

    impl UrlOpener for RecordingWidget {
        fn open_new_context(&self, url: &str) -> Result<(), SchedulerError> {
            self.init_popup_widget(url)
        }
    }

    /// Host whose script load takes a while and can be told to fail
    pub struct FakeHost {
        pub scripts: AtomicUsize,
        pub stylesheets: AtomicUsize,
        pub failures_left: AtomicUsize,
        pub widget: Arc<RecordingWidget>,
        installed: OnceLock<Arc<dyn PopupWidget>>,
    }

    impl FakeHost {
        pub fn new() -> Self {
            Self::failing(0)
        }

        pub fn failing(times: usize) -> Self {
            Self {
                scripts: AtomicUsize::new(0),
                stylesheets: AtomicUsize::new(0),
                failures_left: AtomicUsize::new(times),
                widget: Arc::new(RecordingWidget::default()),
                installed: OnceLock::new(),
            }
        }
    }

    #[async_trait]
    impl ScriptHost for FakeHost {
        async fn inject_script(&self, _src: &str) -> Result<(), SchedulerError> {
            self.scripts.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(30)).await;

            let remaining = self.failures_left.load(Ordering::SeqCst);
            if remaining > 0 {
                self.failures_left.store(remaining - 1, Ordering::SeqCst);
                return Err(SchedulerError::IntegrationUnavailable("script error".into()));
            }

            let _ = self.installed.set(self.widget.clone());
            Ok(())
        }

        async fn inject_stylesheet(&self, _href: &str) -> Result<(), SchedulerError> {
            self.stylesheets.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn popup_widget(&self) -> Option<Arc<dyn PopupWidget>> {
            self.installed.get().cloned()
        }
    }
}
