//! Chat widget controller
//!
//! The ChatWidget ties the conversation state machine to the outside world:
//! 1. Applies the `submit` transition synchronously
//! 2. Sends the message to the webhook on a background task
//! 3. Normalises the raw reply and applies `reply_received` / `reply_failed`
//! 4. Broadcasts a [`WidgetEvent`] after every mutation so views can re-render
//!
//! The background task only holds a weak handle. If the widget is dropped
//! while a request is in flight, the reply is discarded.

use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::Value;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::config::Texts;
use crate::conversation::ConversationState;
use crate::reply::{ActionKind, ReplyAction, ReplyNormalizer};
use crate::scheduler::{Scheduler, SchedulerOutcome};
use crate::webhook::{Webhook, WebhookError};

const EVENT_CAPACITY: usize = 64;

/// Emitted after every state change; views scroll to the newest message on each
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetEvent {
    OpenChanged(bool),
    MessagesChanged,
    LoadingChanged(bool),
}

/// Everything a widget needs besides its webhook and normaliser
pub struct WidgetSettings {
    pub greeting: String,
    pub suggestions: Vec<String>,
    pub texts: Texts,
    pub scheduler: Option<Arc<Scheduler>>,
}

impl Default for WidgetSettings {
    fn default() -> Self {
        let texts = Texts::default();
        Self {
            greeting: texts.greeting.clone(),
            suggestions: crate::config::builtin::SUGGESTIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            texts,
            scheduler: None,
        }
    }
}

struct WidgetInner {
    state: Mutex<ConversationState>,
    webhook: Arc<dyn Webhook>,
    normalizer: ReplyNormalizer,
    session_id: String,
    suggestions: Vec<String>,
    texts: Texts,
    scheduler: Option<Arc<Scheduler>>,
    events: broadcast::Sender<WidgetEvent>,
}

impl WidgetInner {
    fn state(&self) -> MutexGuard<'_, ConversationState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn emit(&self, event: WidgetEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    fn apply_reply(&self, result: Result<Value, WebhookError>) {
        let applied = match result {
            Ok(raw) => {
                let content = self.normalizer.normalize(&raw);
                self.state().reply_received(content)
            }
            Err(e) => {
                tracing::warn!("Webhook call failed: {}", e);
                self.state()
                    .reply_failed(&self.texts.error_caption, &self.texts.apology)
            }
        };

        if applied {
            self.emit(WidgetEvent::MessagesChanged);
            self.emit(WidgetEvent::LoadingChanged(false));
        }
    }
}

/// One mounted chat widget
pub struct ChatWidget {
    inner: Arc<WidgetInner>,
}

impl ChatWidget {
    pub fn new(
        webhook: Arc<dyn Webhook>,
        normalizer: ReplyNormalizer,
        session_id: impl Into<String>,
        settings: WidgetSettings,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            inner: Arc::new(WidgetInner {
                state: Mutex::new(ConversationState::new().with_greeting(&settings.greeting)),
                webhook,
                normalizer,
                session_id: session_id.into(),
                suggestions: settings.suggestions,
                texts: settings.texts,
                scheduler: settings.scheduler,
                events,
            }),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.inner.session_id
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WidgetEvent> {
        self.inner.events.subscribe()
    }

    /// Copy of the current state for rendering
    pub fn snapshot(&self) -> ConversationState {
        self.inner.state().clone()
    }

    pub fn can_send(&self) -> bool {
        self.inner.state().can_send()
    }

    pub fn set_input(&self, text: impl Into<String>) {
        self.inner.state().set_input(text);
    }

    /// Suggestions not yet asked by the visitor
    pub fn suggestions(&self) -> Vec<String> {
        let state = self.inner.state();
        state
            .visible_suggestions(&self.inner.suggestions)
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    /// Open or close the panel. Opening warms up the scheduler in the background.
    pub fn toggle_open(&self) -> bool {
        let open = self.inner.state().toggle_open();
        self.inner.emit(WidgetEvent::OpenChanged(open));

        if open {
            self.warm_up_scheduler();
        }
        open
    }

    fn warm_up_scheduler(&self) {
        let Some(scheduler) = self.inner.scheduler.clone() else {
            return;
        };
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move { scheduler.warm_up().await });
        }
    }

    /// Send the input buffer
    pub fn submit_input(&self) -> Option<JoinHandle<()>> {
        let text = self.inner.state().input().to_string();
        self.submit(&text)
    }

    /// Send `text` (free text or a suggestion). Returns `None` when the
    /// submission was rejected: blank text, a reply still pending, or no
    /// tokio runtime to run the request on.
    pub fn submit(&self, text: &str) -> Option<JoinHandle<()>> {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("No tokio runtime available; message not sent");
            return None;
        };

        let text = self.inner.state().submit(text)?;
        self.inner.emit(WidgetEvent::MessagesChanged);
        self.inner.emit(WidgetEvent::LoadingChanged(true));

        let webhook = self.inner.webhook.clone();
        let session_id = self.inner.session_id.clone();
        let widget = Arc::downgrade(&self.inner);

        Some(runtime.spawn(async move {
            let result = webhook.send_message(&text, &session_id).await;

            let Some(inner) = widget.upgrade() else {
                tracing::debug!("Widget dropped before the reply arrived; discarding it");
                return;
            };
            inner.apply_reply(result);
        }))
    }

    /// Run a reply's call-to-action
    pub async fn open_action(&self, action: &ReplyAction) -> SchedulerOutcome {
        let Some(scheduler) = self.inner.scheduler.as_ref() else {
            return SchedulerOutcome::LinkOnly;
        };

        match action.kind {
            ActionKind::OpenScheduler => scheduler.open(&action.url).await,
            ActionKind::OpenUrl => scheduler.open_url(&action.url),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::builtin;
    use crate::conversation::Role;
    use crate::reply::{BookingPolicy, MessageContent};
    use crate::scheduler::testing::{FakeHost, RecordingWidget};
    use crate::scheduler::SchedulerLoader;
    use crate::webhook::extract_reply;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::broadcast::error::TryRecvError;
    use tokio::sync::Notify;

    /// Webhook answering every call with the same body, optionally after a gate opens
    struct FakeWebhook {
        body: Option<Value>,
        calls: AtomicUsize,
        sent: Mutex<Vec<(String, String)>>,
        gate: Option<Arc<Notify>>,
    }

    impl FakeWebhook {
        fn replying(body: Value) -> Self {
            Self {
                body: Some(body),
                calls: AtomicUsize::new(0),
                sent: Mutex::new(Vec::new()),
                gate: None,
            }
        }

        fn failing() -> Self {
            Self {
                body: None,
                ..Self::replying(Value::Null)
            }
        }

        fn gated(mut self, gate: Arc<Notify>) -> Self {
            self.gate = Some(gate);
            self
        }
    }

    #[async_trait]
    impl Webhook for FakeWebhook {
        async fn send_message(&self, text: &str, session_id: &str) -> Result<Value, WebhookError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.sent
                .lock()
                .unwrap()
                .push((text.to_string(), session_id.to_string()));

            if let Some(ref gate) = self.gate {
                gate.notified().await;
            }

            match self.body {
                Some(ref body) => Ok(extract_reply(body.clone())),
                None => Err(WebhookError::Network("connection refused".into())),
            }
        }
    }

    fn normalizer() -> ReplyNormalizer {
        ReplyNormalizer::new(
            BookingPolicy::ExplicitFlag,
            builtin::SCHEDULER_URL,
            Texts::default(),
        )
    }

    fn settings() -> WidgetSettings {
        WidgetSettings {
            greeting: String::new(),
            ..Default::default()
        }
    }

    fn widget(webhook: Arc<FakeWebhook>) -> ChatWidget {
        ChatWidget::new(webhook, normalizer(), "web-test", settings())
    }

    #[tokio::test]
    async fn test_reply_field_scenario() {
        let webhook = Arc::new(FakeWebhook::replying(
            json!({ "reply": "Wir bieten Automatisierung." }),
        ));
        let widget = widget(webhook.clone());

        widget.submit("Welche Leistungen bietet ihr?").unwrap().await.unwrap();

        let state = widget.snapshot();
        assert_eq!(state.messages().len(), 2);
        assert_eq!(state.messages()[0].role, Role::User);
        assert_eq!(
            state.messages()[0].content.text(),
            Some("Welche Leistungen bietet ihr?")
        );
        assert_eq!(
            state.messages()[1].content,
            MessageContent::Text("Wir bieten Automatisierung.".into())
        );
        assert_eq!(
            *webhook.sent.lock().unwrap(),
            vec![("Welche Leistungen bietet ihr?".to_string(), "web-test".to_string())]
        );
    }

    #[tokio::test]
    async fn test_booking_intent_in_request_does_not_trigger_scheduler() {
        let widget = widget(Arc::new(FakeWebhook::replying(json!("Gerne!"))));

        widget.submit("Ich möchte einen Termin buchen").unwrap().await.unwrap();

        let state = widget.snapshot();
        assert_eq!(state.messages()[1].content, MessageContent::Text("Gerne!".into()));
        assert!(state.messages()[1].content.action().is_none());
    }

    #[tokio::test]
    async fn test_booking_intent_in_reply_triggers_scheduler() {
        let widget = widget(Arc::new(FakeWebhook::replying(json!({
            "reply": "Du kannst hier direkt einen Termin buchen."
        }))));

        widget.submit("Wie geht es weiter?").unwrap().await.unwrap();

        let state = widget.snapshot();
        let action = state.messages()[1].content.action().unwrap();
        assert_eq!(action.kind, ActionKind::OpenScheduler);
    }

    #[tokio::test]
    async fn test_network_failure_appends_apology() {
        let widget = widget(Arc::new(FakeWebhook::failing()));

        widget.submit("Hallo").unwrap().await.unwrap();

        let state = widget.snapshot();
        assert_eq!(state.messages().len(), 2);
        assert_eq!(state.messages()[1].content.text(), Some(builtin::APOLOGY));
        assert_eq!(state.last_error(), Some(builtin::ERROR_CAPTION));
        assert!(!state.is_loading());
    }

    #[tokio::test]
    async fn test_cannot_send_while_reply_pending() {
        let gate = Arc::new(Notify::new());
        let webhook = Arc::new(FakeWebhook::replying(json!("ok")).gated(gate.clone()));
        let widget = widget(webhook.clone());

        let pending = widget.submit("Erste Frage").unwrap();
        widget.set_input("Zweite Frage");

        assert!(widget.snapshot().is_loading());
        assert!(!widget.can_send());
        assert!(widget.submit_input().is_none());
        assert!(widget.submit("Dritte Frage").is_none());
        assert_eq!(widget.snapshot().messages().len(), 1);

        gate.notify_one();
        pending.await.unwrap();

        assert!(widget.can_send());
        assert_eq!(webhook.calls.load(Ordering::SeqCst), 1);
        assert_eq!(widget.snapshot().messages().len(), 2);
    }

    #[tokio::test]
    async fn test_blank_submit_sends_nothing() {
        let webhook = Arc::new(FakeWebhook::replying(json!("ok")));
        let widget = widget(webhook.clone());

        assert!(widget.submit("   ").is_none());
        widget.set_input("");
        assert!(widget.submit_input().is_none());

        assert!(widget.snapshot().messages().is_empty());
        assert_eq!(webhook.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_reply_after_drop_is_discarded() {
        let gate = Arc::new(Notify::new());
        let webhook = Arc::new(FakeWebhook::replying(json!("late")).gated(gate.clone()));
        let widget = widget(webhook.clone());

        let mut events = widget.subscribe();

        let pending = widget.submit("Hallo").unwrap();
        drop(widget);
        gate.notify_one();

        tokio_test::assert_ok!(pending.await);
        assert_eq!(webhook.calls.load(Ordering::SeqCst), 1);

        // Only the submit events; the sender went away with the widget
        assert_eq!(events.try_recv(), Ok(WidgetEvent::MessagesChanged));
        assert_eq!(events.try_recv(), Ok(WidgetEvent::LoadingChanged(true)));
        assert_eq!(events.try_recv(), Err(TryRecvError::Closed));
    }

    #[test]
    fn test_submit_without_runtime_leaves_state_idle() {
        let webhook = Arc::new(FakeWebhook::replying(json!("ok")));
        let widget = widget(webhook.clone());

        assert!(widget.submit("Hallo").is_none());

        let state = widget.snapshot();
        assert!(state.messages().is_empty());
        assert!(!state.is_loading());
        assert_eq!(webhook.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_events_follow_transitions() {
        let widget = widget(Arc::new(FakeWebhook::replying(json!("ok"))));
        let mut events = widget.subscribe();

        widget.toggle_open();
        widget.submit("Hallo").unwrap().await.unwrap();

        let mut seen = Vec::new();
        while let Ok(event) = events.try_recv() {
            seen.push(event);
        }
        assert_eq!(
            seen,
            vec![
                WidgetEvent::OpenChanged(true),
                WidgetEvent::MessagesChanged,
                WidgetEvent::LoadingChanged(true),
                WidgetEvent::MessagesChanged,
                WidgetEvent::LoadingChanged(false),
            ]
        );
    }

    #[tokio::test]
    async fn test_quick_send_suggestion() {
        let widget = widget(Arc::new(FakeWebhook::replying(json!("Ja."))));
        let suggestion = widget.suggestions()[2].clone();
        assert_eq!(suggestion, "Ist das DSGVO-konform?");

        widget.submit(&suggestion).unwrap().await.unwrap();

        let remaining = widget.suggestions();
        assert!(!remaining.contains(&suggestion));
        assert_eq!(remaining.len(), builtin::SUGGESTIONS.len() - 1);
    }

    #[tokio::test]
    async fn test_greeting_is_rendered_first() {
        let widget = ChatWidget::new(
            Arc::new(FakeWebhook::replying(json!("ok"))),
            normalizer(),
            "web-test",
            WidgetSettings::default(),
        );

        let state = widget.snapshot();
        assert_eq!(state.messages().len(), 1);
        assert_eq!(state.messages()[0].content.text(), Some(builtin::GREETING));
    }

    #[tokio::test]
    async fn test_open_action_and_warm_up() {
        let host = Arc::new(FakeHost::new());
        let opener = Arc::new(RecordingWidget::default());
        let scheduler = Arc::new(Scheduler::new(
            Arc::new(SchedulerLoader::new(host.clone(), builtin::SCHEDULER_SCRIPT_URL)),
            opener.clone(),
        ));
        let widget = ChatWidget::new(
            Arc::new(FakeWebhook::replying(json!("ok"))),
            normalizer(),
            "web-test",
            WidgetSettings {
                scheduler: Some(scheduler),
                ..settings()
            },
        );

        widget.toggle_open();
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(host.scripts.load(Ordering::SeqCst), 1);

        let booking = ReplyAction {
            kind: ActionKind::OpenScheduler,
            url: builtin::SCHEDULER_URL.into(),
            label: None,
        };
        assert_eq!(widget.open_action(&booking).await, SchedulerOutcome::Popup);
        assert_eq!(host.scripts.load(Ordering::SeqCst), 1);

        let link = ReplyAction {
            kind: ActionKind::OpenUrl,
            url: "https://infrasenseai.de/cases".into(),
            label: None,
        };
        assert_eq!(widget.open_action(&link).await, SchedulerOutcome::NewContext);
        assert_eq!(
            *opener.opened.lock().unwrap(),
            vec!["https://infrasenseai.de/cases".to_string()]
        );
    }

    #[tokio::test]
    async fn test_open_action_without_scheduler_is_link_only() {
        let widget = widget(Arc::new(FakeWebhook::replying(json!("ok"))));
        let booking = ReplyAction {
            kind: ActionKind::OpenScheduler,
            url: builtin::SCHEDULER_URL.into(),
            label: None,
        };
        assert_eq!(widget.open_action(&booking).await, SchedulerOutcome::LinkOnly);
    }
}
