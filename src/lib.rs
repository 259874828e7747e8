//! Infrasense support chat widget
//!
//! Forwards visitor messages to an automation webhook, normalises the replies
//! and offers a scheduling popup when the conversation turns to booking an
//! appointment. The terminal binary in `main.rs` is one presentation of the
//! widget; the library holds everything else.

pub mod config;
pub mod conversation;
pub mod core;
pub mod reply;
pub mod scheduler;
pub mod shell;
pub mod webhook;
