use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle of a clarification exchange. Only `Pending` sessions are ever looked up.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Pending,
    Resolved,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Resolved => "resolved",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "resolved" => Some(Self::Resolved),
            _ => None,
        }
    }
}

/// Server-tracked record of an in-progress clarification exchange.
///
/// Written by the interpreter backend as a side effect of the webhook calls;
/// the dialogue only reads it. At most one `Pending` record per user is expected,
/// but the backing table does not enforce that (see [`pick_oldest_pending`]).
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ClarificationSession {
    /// Opaque clarification id, echoed back to the interpreter
    pub id: String,
    /// Owner of this exchange
    pub user_id: String,
    pub status: SessionStatus,
    /// User answers so far, indexed positionally
    pub answers: Vec<String>,
    /// Slot in `answers` the next user message fills
    pub current_index: usize,
    pub created_at: DateTime<Utc>,
}

impl ClarificationSession {
    pub fn is_pending(&self) -> bool {
        self.status == SessionStatus::Pending
    }

    /// The answer list to submit when `answer` is the next user message.
    ///
    /// Overwrites the slot at `current_index`, or appends when the index is one
    /// past the end. An index further out is padded with empty answers so the
    /// positional contract with the interpreter holds.
    pub fn answers_with(&self, answer: &str) -> Vec<String> {
        let mut answers = self.answers.clone();
        if answers.len() <= self.current_index {
            answers.resize(self.current_index + 1, String::new());
        }
        answers[self.current_index] = answer.to_string();
        answers
    }
}

/// Pick a single pending session out of whatever the store returned.
///
/// Oldest `created_at` wins; equal timestamps fall back to the smaller id so the
/// choice is deterministic across calls.
pub fn pick_oldest_pending(
    sessions: impl IntoIterator<Item = ClarificationSession>,
) -> Option<ClarificationSession> {
    sessions
        .into_iter()
        .filter(ClarificationSession::is_pending)
        .min_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.cmp(&b.id))
        })
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;

    fn session(id: &str, answers: &[&str], current_index: usize) -> ClarificationSession {
        ClarificationSession {
            id: id.to_string(),
            user_id: "u1".to_string(),
            status: SessionStatus::Pending,
            answers: answers.iter().map(|a| a.to_string()).collect(),
            current_index,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn answers_with_appends_at_end() {
        let s = session("c1", &["chicken"], 1);
        assert_eq!(s.answers_with("200"), vec!["chicken", "200"]);
    }

    #[test]
    fn answers_with_overwrites_existing_slot() {
        let s = session("c1", &["chicken", "100"], 1);
        assert_eq!(s.answers_with("200"), vec!["chicken", "200"]);
    }

    #[test]
    fn answers_with_pads_gap() {
        let s = session("c1", &[], 2);
        assert_eq!(s.answers_with("rice"), vec!["", "", "rice"]);
    }

    #[test]
    fn pick_oldest_pending_prefers_earliest_creation() {
        let now = Utc::now();
        let mut newer = session("b", &[], 0);
        newer.created_at = now;
        let mut older = session("z", &[], 0);
        older.created_at = now - Duration::minutes(5);

        let picked = pick_oldest_pending(vec![newer, older]).unwrap();
        assert_eq!(picked.id, "z");
    }

    #[test]
    fn pick_oldest_pending_breaks_ties_by_id() {
        let now = Utc::now();
        let mut a = session("a", &[], 0);
        a.created_at = now;
        let mut b = session("b", &[], 0);
        b.created_at = now;

        assert_eq!(pick_oldest_pending(vec![b, a]).unwrap().id, "a");
    }

    #[test]
    fn pick_oldest_pending_skips_resolved() {
        let mut resolved = session("r", &[], 0);
        resolved.status = SessionStatus::Resolved;
        assert!(pick_oldest_pending(vec![resolved]).is_none());
    }

    #[test]
    fn status_parse_is_case_insensitive() {
        assert_eq!(SessionStatus::parse("PENDING"), Some(SessionStatus::Pending));
        assert_eq!(SessionStatus::parse("resolved"), Some(SessionStatus::Resolved));
        assert_eq!(SessionStatus::parse("archived"), None);
    }
}
