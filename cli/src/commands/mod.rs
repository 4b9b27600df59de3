pub mod chat;
pub mod pending;
pub mod profile;
pub mod send;
pub mod suggestions;
