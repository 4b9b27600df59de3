//! Wire contract with the external meal interpreter.
//!
//! Two webhooks, both `POST application/json`: one takes a fresh free-text
//! message, the other takes an answer to a pending clarification question.
//! Responses are decoded exactly once, here, into [`InterpreterReply`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body of the fresh-message webhook.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct FreshMessageRequest {
    pub user_id: String,
    pub message: String,
    /// Client send time, serialized as RFC 3339
    pub timestamp: DateTime<Utc>,
}

/// Body of the clarification-answer webhook.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ClarificationAnswerRequest {
    pub clarification_id: String,
    pub user_id: String,
    /// The raw text the user just sent
    pub answer: String,
    /// Full answer list with `answer` already written at `current_index`
    pub answers: Vec<String>,
    pub current_index: usize,
}

/// Which webhook a request goes to.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    FreshMessage,
    ClarificationAnswer,
}

/// One outbound call per turn. Serializes as the bare webhook body.
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum InterpreterRequest {
    Fresh(FreshMessageRequest),
    Answer(ClarificationAnswerRequest),
}

impl InterpreterRequest {
    pub fn kind(&self) -> RequestKind {
        match self {
            Self::Fresh(_) => RequestKind::FreshMessage,
            Self::Answer(_) => RequestKind::ClarificationAnswer,
        }
    }

    pub fn user_id(&self) -> &str {
        match self {
            Self::Fresh(req) => &req.user_id,
            Self::Answer(req) => &req.user_id,
        }
    }
}

/// Interpreter response, decoded by shape.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InterpreterReply {
    /// `{ clarification_id, question }`: a fresh message needs a follow-up
    FreshClarification {
        clarification_id: String,
        question: String,
    },
    /// `{ next_clarification_id, next_question }`: an answer needs another follow-up
    ContinuedClarification {
        clarification_id: String,
        question: String,
    },
    /// `{ response }`: the meal was logged (or the message handled) with no further question
    Resolved { response: String },
    /// 2xx body with none of the recognised fields, or not JSON at all
    Malformed,
}

impl InterpreterReply {
    /// Decode a JSON response body.
    ///
    /// A continuation pair beats a fresh pair, and any complete pair beats
    /// `response`. Half a pair (id without question, or the reverse) counts as absent.
    pub fn decode(body: &Value) -> Self {
        if let (Some(clarification_id), Some(question)) = (
            text_field(body, "next_clarification_id"),
            text_field(body, "next_question"),
        ) {
            return Self::ContinuedClarification {
                clarification_id,
                question,
            };
        }

        if let (Some(clarification_id), Some(question)) = (
            text_field(body, "clarification_id"),
            text_field(body, "question"),
        ) {
            return Self::FreshClarification {
                clarification_id,
                question,
            };
        }

        match text_field(body, "response") {
            Some(response) => Self::Resolved { response },
            None => Self::Malformed,
        }
    }

    /// Decode raw response bytes; anything that is not JSON is `Malformed`.
    pub fn from_slice(bytes: &[u8]) -> Self {
        match serde_json::from_slice::<Value>(bytes) {
            Ok(body) => Self::decode(&body),
            Err(_) => Self::Malformed,
        }
    }

    /// The clarification id and question, for either clarification variant.
    pub fn clarification(&self) -> Option<(&str, &str)> {
        match self {
            Self::FreshClarification {
                clarification_id,
                question,
            }
            | Self::ContinuedClarification {
                clarification_id,
                question,
            } => Some((clarification_id, question)),
            _ => None,
        }
    }
}

/// Non-empty string field. Numeric ids are accepted and stringified.
fn text_field(body: &Value, key: &str) -> Option<String> {
    match body.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
