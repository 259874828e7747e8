//! Conversation types and state management
//!
//! [`ConversationState`] is the widget's state machine. It has two phases,
//! `Idle` and `AwaitingReply`, and only its transition methods mutate it:
//!
//! - `submit` (Idle → AwaitingReply) appends the user message
//! - `reply_received` (AwaitingReply → Idle) appends the assistant reply
//! - `reply_failed` (AwaitingReply → Idle) records the error and apologises
//!
//! Submitting while a reply is pending is not a transition; `can_send`
//! is false for the whole `AwaitingReply` phase.

use serde::{Deserialize, Serialize};

use crate::reply::MessageContent;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: MessageContent,
}

impl ChatMessage {
    pub fn user(text: &str) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Text(text.to_string()),
        }
    }

    pub fn assistant(content: MessageContent) -> Self {
        Self {
            role: Role::Assistant,
            content,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    AwaitingReply,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationState {
    messages: Vec<ChatMessage>,
    input: String,
    is_loading: bool,
    last_error: Option<String>,
    is_open: bool,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start the conversation with an assistant greeting; blank greetings are skipped
    pub fn with_greeting(mut self, greeting: &str) -> Self {
        if !greeting.trim().is_empty() {
            self.messages
                .push(ChatMessage::assistant(MessageContent::from(greeting)));
        }
        self
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    pub fn phase(&self) -> Phase {
        if self.is_loading {
            Phase::AwaitingReply
        } else {
            Phase::Idle
        }
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    pub fn set_open(&mut self, open: bool) -> bool {
        let changed = self.is_open != open;
        self.is_open = open;
        changed
    }

    pub fn toggle_open(&mut self) -> bool {
        self.is_open = !self.is_open;
        self.is_open
    }

    /// Non-empty input and no reply pending
    pub fn can_send(&self) -> bool {
        !self.is_loading && !self.input.trim().is_empty()
    }

    /// Submit the input buffer
    pub fn submit_input(&mut self) -> Option<String> {
        let text = self.input.clone();
        self.submit(&text)
    }

    /// Idle → AwaitingReply. Returns the text to send, or `None` if nothing changed.
    pub fn submit(&mut self, text: &str) -> Option<String> {
        let text = text.trim();
        if text.is_empty() || self.is_loading {
            return None;
        }

        self.messages.push(ChatMessage::user(text));
        self.input.clear();
        self.last_error = None;
        self.is_loading = true;

        Some(text.to_string())
    }

    /// AwaitingReply → Idle with the assistant's reply
    pub fn reply_received(&mut self, content: MessageContent) -> bool {
        if !self.is_loading {
            tracing::debug!("Ignoring reply outside of AwaitingReply");
            return false;
        }

        self.messages.push(ChatMessage::assistant(content));
        self.is_loading = false;
        true
    }

    /// AwaitingReply → Idle after a failed call
    pub fn reply_failed(&mut self, caption: &str, apology: &str) -> bool {
        if !self.is_loading {
            tracing::debug!("Ignoring failure outside of AwaitingReply");
            return false;
        }

        self.last_error = Some(caption.to_string());
        self.messages
            .push(ChatMessage::assistant(MessageContent::from(apology)));
        self.is_loading = false;
        true
    }

    /// Candidates the visitor has not asked yet, in their original order
    pub fn visible_suggestions<'a>(&self, candidates: &'a [String]) -> Vec<&'a str> {
        let asked: Vec<&str> = self
            .messages
            .iter()
            .filter(|m| m.role == Role::User)
            .filter_map(|m| m.content.text())
            .map(str::trim)
            .collect();

        candidates
            .iter()
            .map(String::as_str)
            .filter(|c| !asked.contains(&c.trim()))
            .collect()
    }
}
