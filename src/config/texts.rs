//! Built-in widget copy
//!
//! The website is German, so every user-facing string the widget emits on its
//! own (greeting, apology, acknowledgement, booking prompt) lives here.
//! Replies coming from the webhook are shown as-is.

/// Widget texts resolved from the built-in copy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Texts {
    /// First assistant bubble shown when the panel is mounted
    pub greeting: String,

    /// Assistant bubble appended when the webhook call fails
    pub apology: String,

    /// Short caption stored as the conversation's last error
    pub error_caption: String,

    /// Reply shown when the webhook answer has no usable shape
    pub acknowledgement: String,

    /// Text of the reply synthesised for booking intent
    pub booking_text: String,

    /// Label of the scheduling button
    pub booking_label: String,

    /// Label of the fallback link shown next to the scheduling button
    pub fallback_label: String,
}

impl Default for Texts {
    fn default() -> Self {
        Self {
            greeting: builtin::GREETING.to_string(),
            apology: builtin::APOLOGY.to_string(),
            error_caption: builtin::ERROR_CAPTION.to_string(),
            acknowledgement: builtin::ACKNOWLEDGEMENT.to_string(),
            booking_text: builtin::BOOKING_TEXT.to_string(),
            booking_label: builtin::BOOKING_LABEL.to_string(),
            fallback_label: builtin::FALLBACK_LABEL.to_string(),
        }
    }
}

/// Built-in copy and constant data
pub mod builtin {
    /// Panel header
    pub const TITLE: &str = "InfrasenseAI Chat";

    pub const GREETING: &str = "Hi 👋 Wie kann ich dir helfen?";

    pub const APOLOGY: &str =
        "Entschuldigung, es gab ein Verbindungsproblem. Bitte versuche es gleich noch einmal.";

    pub const ERROR_CAPTION: &str = "Verbindung fehlgeschlagen";

    pub const ACKNOWLEDGEMENT: &str = "Danke für deine Nachricht! Wir melden uns gleich bei dir.";

    pub const BOOKING_TEXT: &str = "Alles klar, ich öffne den Kalender für dich…";

    pub const BOOKING_LABEL: &str = "Termin buchen";

    pub const FALLBACK_LABEL: &str = "Kalender im neuen Tab öffnen";

    pub const INPUT_PLACEHOLDER: &str = "Schreib eine Nachricht...";

    /// Value of the `X-Client` header sent with every webhook call
    pub const CLIENT_TAG: &str = "infrasense-web";

    pub const WEBHOOK_URL: &str = "https://vodasun.app.n8n.cloud/webhook/chat";

    pub const SCHEDULER_URL: &str = "https://calendly.com/infrasenseai/30min";

    pub const SCHEDULER_SCRIPT_URL: &str = "https://assets.calendly.com/assets/external/widget.js";

    pub const SCHEDULER_STYLESHEET_URL: &str =
        "https://assets.calendly.com/assets/external/widget.css";

    /// Canned quick-send questions
    pub const SUGGESTIONS: &[&str] = &[
        "Welche Leistungen bietet ihr?",
        "Was kostet eine Automatisierung?",
        "Ist das DSGVO-konform?",
        "Wie läuft ein Projekt ab?",
    ];
}
