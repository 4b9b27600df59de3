pub mod error;
pub mod interpreter;
pub mod message;
pub mod session;
