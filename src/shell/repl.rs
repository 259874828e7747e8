//! Interactive loop reading commands from stdin

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;

use crate::config::builtin;
use crate::conversation::Role;
use crate::core::ChatWidget;
use crate::reply::ReplyAction;

use super::{parse_command, render_message, render_outcome, render_suggestions, Command};

/// Tracks how much of the transcript has been printed
struct View {
    printed: usize,
    typing_shown: bool,
}

impl View {
    fn new() -> Self {
        Self {
            printed: 0,
            typing_shown: false,
        }
    }

    /// Print everything new and move to the bottom of the transcript
    fn scroll_to_bottom(&mut self, widget: &ChatWidget) {
        let state = widget.snapshot();
        if !state.is_open() {
            return;
        }

        for message in &state.messages()[self.printed..] {
            println!("{}", render_message(message));
        }
        self.printed = state.messages().len();

        if state.is_loading() {
            if !self.typing_shown {
                println!("{}", super::TYPING_INDICATOR);
                self.typing_shown = true;
            }
            return;
        }
        self.typing_shown = false;

        if let Some(error) = state.last_error() {
            println!("      ({})", error);
        }
        if let Some(chips) = render_suggestions(&widget.suggestions()) {
            println!("{}", chips);
        }
    }
}

fn latest_action(widget: &ChatWidget) -> Option<ReplyAction> {
    widget
        .snapshot()
        .messages()
        .iter()
        .rev()
        .filter(|m| m.role == Role::Assistant)
        .find_map(|m| m.content.action().cloned())
}

/// Drive `widget` from stdin until `/quit` or end of input
pub async fn run(widget: ChatWidget, title: &str) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut events = widget.subscribe();
    let mut view = View::new();

    println!("💬 {} (/open, /close, /go, /quit)", title);

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };

                match parse_command(&line) {
                    Command::Quit => break,
                    Command::Open => {
                        if !widget.snapshot().is_open() {
                            println!("── {} ──", title);
                            println!("({})", builtin::INPUT_PLACEHOLDER);
                            widget.toggle_open();
                        }
                    }
                    Command::Close => {
                        if widget.snapshot().is_open() {
                            widget.toggle_open();
                            println!("── geschlossen ──");
                        }
                    }
                    _ if !widget.snapshot().is_open() => {
                        println!("Tippe /open, um den Chat zu öffnen.");
                    }
                    Command::Send(text) => {
                        widget.set_input(text);
                        if !widget.can_send() || widget.submit_input().is_none() {
                            println!("      (bitte warte auf die Antwort)");
                        }
                    }
                    Command::Suggestion(n) => {
                        let picked = widget.suggestions().get(n - 1).cloned();
                        match picked {
                            Some(text) => {
                                if widget.submit(&text).is_none() {
                                    println!("      (bitte warte auf die Antwort)");
                                }
                            }
                            None => println!("      (kein Vorschlag Nr. {})", n),
                        }
                    }
                    Command::Go => match latest_action(&widget) {
                        Some(action) => {
                            let outcome = widget.open_action(&action).await;
                            println!("{}", render_outcome(outcome, &action.url));
                        }
                        None => println!("      (keine Aktion verfügbar)"),
                    },
                    Command::Empty => {}
                    Command::Unknown(cmd) => println!("      (unbekannter Befehl {})", cmd),
                }
            }
            event = events.recv() => {
                match event {
                    Ok(_) | Err(RecvError::Lagged(_)) => view.scroll_to_bottom(&widget),
                    Err(RecvError::Closed) => break,
                }
            }
        }
    }

    tracing::debug!("Leaving chat");
    Ok(())
}
