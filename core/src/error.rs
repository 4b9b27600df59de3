use serde::Serialize;
use thiserror::Error;

/// Structured error body printed by the CLI.
/// Carries enough for a script (or a human) to tell what failed and what to try next.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code (see [`codes`])
    pub error: String,
    /// Human-readable description of what went wrong
    pub message: String,
    /// Hint about how to fix it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docs_hint: Option<String>,
}

impl ErrorBody {
    pub fn new(error: &str, message: impl Into<String>) -> Self {
        Self {
            error: error.to_string(),
            message: message.into(),
            docs_hint: None,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.docs_hint = Some(hint.into());
        self
    }
}

/// Error codes used across the workspace
pub mod codes {
    pub const DELIVERY_FAILED: &str = "delivery_failed";
    pub const SESSION_LOOKUP_FAILED: &str = "session_lookup_failed";
    pub const MALFORMED_RESPONSE: &str = "malformed_response";
    pub const INVALID_CONFIG: &str = "invalid_config";
    pub const CLI_ERROR: &str = "cli_error";
}

/// Why an interpreter call did not produce a usable 2xx response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryFailure {
    #[error("network error: {0}")]
    Network(String),
    #[error("timed out")]
    Timeout,
    #[error("HTTP status {0}")]
    Status(u16),
}

/// The interpreter could not be reached or answered with a non-success status.
/// Never retried by the dialogue; the caller resets to a fresh conversation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("delivery to {endpoint} failed: {reason}")]
pub struct DeliveryFailed {
    pub endpoint: String,
    pub reason: DeliveryFailure,
}

impl DeliveryFailed {
    pub fn code(&self) -> &'static str {
        codes::DELIVERY_FAILED
    }
}

/// The session store could not be read. The dialogue treats this as "nothing pending".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("session lookup failed: {0}")]
pub struct SessionLookupFailed(pub String);

impl SessionLookupFailed {
    pub fn code(&self) -> &'static str {
        codes::SESSION_LOOKUP_FAILED
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{name} is not set")]
    Missing { name: &'static str },
    #[error("{name} is not a valid http(s) URL: '{value}' ({reason})")]
    InvalidUrl {
        name: &'static str,
        value: String,
        reason: String,
    },
    #[error("request timeout must be at least one second")]
    ZeroTimeout,
}

impl ConfigError {
    pub fn code(&self) -> &'static str {
        codes::INVALID_CONFIG
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delivery_failed_message_names_endpoint_and_reason() {
        let err = DeliveryFailed {
            endpoint: "http://localhost:5678/webhook/answer".to_string(),
            reason: DeliveryFailure::Status(502),
        };
        assert_eq!(
            err.to_string(),
            "delivery to http://localhost:5678/webhook/answer failed: HTTP status 502"
        );
        assert_eq!(err.code(), "delivery_failed");
    }

    #[test]
    fn error_body_omits_missing_hint() {
        let body = ErrorBody::new(codes::CLI_ERROR, "boom");
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["error"], "cli_error");
        assert!(value.get("docs_hint").is_none());

        let hinted = ErrorBody::new(codes::CLI_ERROR, "boom").with_hint("set it");
        let value = serde_json::to_value(&hinted).unwrap();
        assert_eq!(value["docs_hint"], "set it");
    }
}
