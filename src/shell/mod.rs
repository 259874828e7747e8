//! Terminal presentation of the chat widget
//!
//! The panel is drawn as a transcript: every [`WidgetEvent`](crate::core::WidgetEvent)
//! prints the messages that arrived since the last draw, which keeps the view
//! scrolled to the newest message.

mod repl;

pub use repl::run;

use crate::config::builtin;
use crate::conversation::{ChatMessage, Role};
use crate::reply::{ActionKind, MessageContent};
use crate::scheduler::SchedulerOutcome;

pub const TYPING_INDICATOR: &str = "bot › …";

/// A line typed by the visitor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Open,
    Close,
    Quit,
    /// Run the newest call-to-action
    Go,
    /// Quick-send the n-th visible suggestion (1-based)
    Suggestion(usize),
    Send(String),
    Empty,
    Unknown(String),
}

pub fn parse_command(line: &str) -> Command {
    let line = line.trim();
    let Some(command) = line.strip_prefix('/') else {
        return if line.is_empty() {
            Command::Empty
        } else {
            Command::Send(line.to_string())
        };
    };

    match command {
        "open" => Command::Open,
        "close" => Command::Close,
        "quit" | "exit" => Command::Quit,
        "go" => Command::Go,
        other => match other.parse::<usize>() {
            Ok(n) if n > 0 => Command::Suggestion(n),
            _ => Command::Unknown(line.to_string()),
        },
    }
}

pub fn render_message(message: &ChatMessage) -> String {
    let prefix = match message.role {
        Role::User => "  du ›",
        Role::Assistant => "bot ›",
    };

    let mut lines = Vec::new();
    if let Some(text) = message.content.text() {
        lines.push(format!("{} {}", prefix, text));
    }

    if let MessageContent::Structured(reply) = &message.content {
        if let Some(action) = &reply.action {
            let label = action.label.as_deref().unwrap_or(match action.kind {
                ActionKind::OpenScheduler => builtin::BOOKING_LABEL,
                ActionKind::OpenUrl => "Link öffnen",
            });
            lines.push(format!("      [/go] {}", label));
        }
        if let Some(fallback) = &reply.fallback {
            let label = fallback.label.as_deref().unwrap_or("Link");
            lines.push(format!("      ↳ {}: {}", label, fallback.href));
        }
    }

    if lines.is_empty() {
        lines.push(prefix.to_string());
    }
    lines.join("\n")
}

pub fn render_suggestions(suggestions: &[String]) -> Option<String> {
    if suggestions.is_empty() {
        return None;
    }

    let chips = suggestions
        .iter()
        .enumerate()
        .map(|(i, s)| format!("[/{}] {}", i + 1, s))
        .collect::<Vec<_>>()
        .join("  ");
    Some(format!("      {}", chips))
}

pub fn render_outcome(outcome: SchedulerOutcome, url: &str) -> String {
    match outcome {
        SchedulerOutcome::Popup => format!("      Kalender geöffnet. Falls nichts erscheint: {}", url),
        SchedulerOutcome::NewContext => format!("      Im Browser geöffnet: {}", url),
        SchedulerOutcome::LinkOnly => format!("      Bitte öffne den Link selbst: {}", url),
    }
}
