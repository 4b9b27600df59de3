use std::time::Duration;

use nutrichat_core::error::ConfigError;

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Where the two interpreter webhooks live and how long a turn may wait on them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DialogueConfig {
    pub fresh_message_url: url::Url,
    pub clarification_answer_url: url::Url,
    pub request_timeout: Duration,
}

impl DialogueConfig {
    pub fn new(
        fresh_message_url: &str,
        clarification_answer_url: &str,
        timeout_secs: u64,
    ) -> Result<Self, ConfigError> {
        if timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(Self {
            fresh_message_url: parse_webhook_url("NUTRICHAT_FRESH_URL", fresh_message_url)?,
            clarification_answer_url: parse_webhook_url(
                "NUTRICHAT_ANSWER_URL",
                clarification_answer_url,
            )?,
            request_timeout: Duration::from_secs(timeout_secs),
        })
    }

    /// Build from `NUTRICHAT_FRESH_URL`, `NUTRICHAT_ANSWER_URL` and `NUTRICHAT_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let fresh = std::env::var("NUTRICHAT_FRESH_URL").map_err(|_| ConfigError::Missing {
            name: "NUTRICHAT_FRESH_URL",
        })?;
        let answer = std::env::var("NUTRICHAT_ANSWER_URL").map_err(|_| ConfigError::Missing {
            name: "NUTRICHAT_ANSWER_URL",
        })?;
        let timeout_secs = std::env::var("NUTRICHAT_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);
        Self::new(&fresh, &answer, timeout_secs)
    }
}

fn parse_webhook_url(name: &'static str, value: &str) -> Result<url::Url, ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Missing { name });
    }
    let parsed = url::Url::parse(trimmed).map_err(|e| ConfigError::InvalidUrl {
        name,
        value: trimmed.to_string(),
        reason: e.to_string(),
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(ConfigError::InvalidUrl {
            name,
            value: trimmed.to_string(),
            reason: format!("unsupported scheme '{other}'"),
        }),
    }
}
