//! Reply normalisation
//!
//! The automation behind the webhook answers in several shapes: a bare string,
//! an object with `text`/`action`/`fallback`, or something unusable. The
//! [`ReplyNormalizer`] maps all of them onto [`MessageContent`] once, so the
//! rest of the widget never inspects raw JSON.
//!
//! # Booking policy
//!
//! Object replies only carry a scheduling button when they say so
//! (`action.type = "open_calendly"`). Deployments whose automation relies on
//! "every object reply means booking" can opt into
//! [`BookingPolicy::AnyStructured`].

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::{is_http_url, Texts};

/// Matches reply texts that talk about booking an appointment. Whole words
/// only, so "Buchhaltung" or "Facebook" stay plain replies.
const BOOKING_PATTERN: &str = r"\b(termine?n?|terminbuchung|terminvereinbarung|buchen|buchung|gebucht|book|booking|appointments?)\b";

/// Content of a chat bubble
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Structured(StructuredReply),
}

impl MessageContent {
    /// Display text of the bubble, if any
    pub fn text(&self) -> Option<&str> {
        match self {
            MessageContent::Text(text) => Some(text),
            MessageContent::Structured(reply) => reply.text.as_deref(),
        }
    }

    pub fn action(&self) -> Option<&ReplyAction> {
        match self {
            MessageContent::Text(_) => None,
            MessageContent::Structured(reply) => reply.action.as_ref(),
        }
    }
}

impl From<&str> for MessageContent {
    fn from(text: &str) -> Self {
        MessageContent::Text(text.to_string())
    }
}

/// A reply carrying optional text, call-to-action and fallback link
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredReply {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<ReplyAction>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<FallbackLink>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionKind {
    #[serde(rename = "open_calendly", alias = "open_scheduler")]
    OpenScheduler,
    #[serde(rename = "open_url")]
    OpenUrl,
}

/// Call-to-action button attached to a reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyAction {
    #[serde(rename = "type")]
    pub kind: ActionKind,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// Plain link shown next to an action in case the popup never appears
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackLink {
    pub href: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// When an object-shaped reply gets a scheduling button
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingPolicy {
    /// Only replies with an explicit scheduler action
    #[default]
    ExplicitFlag,
    /// Any object reply without an action gets the default scheduler action
    AnyStructured,
}

/// Maps raw webhook output onto [`MessageContent`]. Pure.
#[derive(Debug, Clone)]
pub struct ReplyNormalizer {
    policy: BookingPolicy,
    scheduler_url: String,
    booking: Regex,
    texts: Texts,
}

impl ReplyNormalizer {
    pub fn new(policy: BookingPolicy, scheduler_url: impl Into<String>, texts: Texts) -> Self {
        let booking = RegexBuilder::new(BOOKING_PATTERN)
            .case_insensitive(true)
            .build()
            .expect("booking pattern is a valid regex");

        Self {
            policy,
            scheduler_url: scheduler_url.into(),
            booking,
            texts,
        }
    }

    pub fn policy(&self) -> BookingPolicy {
        self.policy
    }

    /// Whether a reply text expresses booking intent
    pub fn mentions_booking(&self, text: &str) -> bool {
        self.booking.is_match(text)
    }

    pub fn normalize(&self, raw: &Value) -> MessageContent {
        match raw {
            Value::String(text) => self.normalize_text(text),
            Value::Object(map) => self
                .normalize_object(map)
                .map(MessageContent::Structured)
                .unwrap_or_else(|| self.acknowledgement()),
            _ => self.acknowledgement(),
        }
    }

    fn normalize_text(&self, text: &str) -> MessageContent {
        if text.trim().is_empty() {
            return self.acknowledgement();
        }

        if self.mentions_booking(text) {
            let action = self.default_action();
            return MessageContent::Structured(StructuredReply {
                text: Some(self.texts.booking_text.clone()),
                fallback: Some(self.fallback_for(&action)),
                action: Some(action),
            });
        }

        MessageContent::Text(text.to_string())
    }

    fn normalize_object(&self, map: &Map<String, Value>) -> Option<StructuredReply> {
        if !["text", "action", "fallback"].iter().any(|k| map.contains_key(*k)) {
            return None;
        }

        let text = map
            .get("text")
            .and_then(Value::as_str)
            .filter(|t| !t.trim().is_empty())
            .map(str::to_string);
        let mut action = map.get("action").and_then(|a| self.parse_action(a));
        let mut fallback = map.get("fallback").and_then(parse_fallback);

        if action.is_none() && self.policy == BookingPolicy::AnyStructured {
            action = Some(self.default_action());
        }

        if let Some(ref action) = action {
            if action.kind == ActionKind::OpenScheduler && fallback.is_none() {
                fallback = Some(self.fallback_for(action));
            }
        }

        if text.is_none() && action.is_none() && fallback.is_none() {
            return None;
        }

        Some(StructuredReply {
            text,
            action,
            fallback,
        })
    }

    fn parse_action(&self, value: &Value) -> Option<ReplyAction> {
        let kind = value.get("type").cloned()?;
        let kind: ActionKind = serde_json::from_value(kind).ok()?;
        let url = non_empty_str(value.get("url")).filter(|u| is_http_url(u));
        let label = non_empty_str(value.get("label"));

        let url = match (kind, url) {
            (_, Some(url)) => url,
            (ActionKind::OpenScheduler, None) => self.scheduler_url.clone(),
            (ActionKind::OpenUrl, None) => return None,
        };

        Some(ReplyAction { kind, url, label })
    }

    fn default_action(&self) -> ReplyAction {
        ReplyAction {
            kind: ActionKind::OpenScheduler,
            url: self.scheduler_url.clone(),
            label: Some(self.texts.booking_label.clone()),
        }
    }

    fn fallback_for(&self, action: &ReplyAction) -> FallbackLink {
        FallbackLink {
            href: action.url.clone(),
            label: Some(self.texts.fallback_label.clone()),
        }
    }

    fn acknowledgement(&self) -> MessageContent {
        MessageContent::Text(self.texts.acknowledgement.clone())
    }
}

fn parse_fallback(value: &Value) -> Option<FallbackLink> {
    Some(FallbackLink {
        href: non_empty_str(value.get("href")).filter(|h| is_http_url(h))?,
        label: non_empty_str(value.get("label")),
    })
}

fn non_empty_str(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
