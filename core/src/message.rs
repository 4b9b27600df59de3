use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opening assistant line shown before the user has typed anything.
pub const GREETING: &str = "Hi! I'm your nutrition assistant. I can help you log meals, \
analyze your nutrition intake, and provide personalized insights. \
What would you like to do today?";

/// Canned prompts offered next to the input box.
pub const QUICK_SUGGESTIONS: [&str; 4] = [
    "Log my breakfast",
    "What should I eat for lunch?",
    "Analyze my nutrition today",
    "Give me healthy snack ideas",
];

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// One line of the chat transcript. Immutable once created.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    /// UUIDv7, so ids sort in creation order
    pub id: Uuid,
    pub role: Role,
    pub text: String,
    pub sent_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            role,
            text: text.into(),
            sent_at: Utc::now(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, text)
    }

    /// Local wall-clock `HH:MM` for display next to the message.
    pub fn display_time(&self) -> String {
        self.sent_at.with_timezone(&Local).format("%H:%M").to_string()
    }
}
