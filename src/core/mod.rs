//! Core widget components
//!
//! This module contains the widget controller and the session identity it
//! sends along with every message.

mod session;
mod widget;

pub use session::{
    get_or_create_session_id, FileStorage, LocalStorage, MemoryStorage, StorageCapability,
    StorageError, FALLBACK_SESSION_ID, SESSION_KEY,
};
pub use widget::{ChatWidget, WidgetEvent, WidgetSettings};
