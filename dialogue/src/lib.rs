//! Runtime for the nutrichat meal-logging clarification dialogue.

pub mod config;
pub mod controller;
pub mod interpreter;
pub mod store;
pub mod transcript;

pub use config::DialogueConfig;
pub use controller::{Conversation, DialogueController, DialogueState, TurnOutcome, TurnReport};
pub use interpreter::{Interpreter, WebhookInterpreter};
pub use store::{MemorySessionStore, PgSessionStore, SessionStore};
pub use transcript::Transcript;
