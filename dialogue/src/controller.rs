//! The clarification dialogue state machine.
//!
//! One call to [`DialogueController::run_turn`] is one turn: look up the user's
//! pending session, send exactly one interpreter request, fold the reply back
//! into the [`Conversation`]. Taking the conversation by `&mut` is what keeps two
//! turns from racing on the same clarification id.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use nutrichat_core::error::DeliveryFailed;
use nutrichat_core::interpreter::{
    ClarificationAnswerRequest, FreshMessageRequest, InterpreterReply, InterpreterRequest,
    RequestKind,
};
use nutrichat_core::message::ChatMessage;
use nutrichat_core::session::ClarificationSession;
use serde::Serialize;

use crate::interpreter::Interpreter;
use crate::store::SessionStore;
use crate::transcript::Transcript;

/// Shown when the interpreter answered 2xx but said nothing we recognise.
pub const DEFAULT_ACKNOWLEDGEMENT: &str = "Thanks! I've noted that.";

/// Shown when the interpreter could not be reached.
pub const RETRY_LATER: &str =
    "Sorry, I couldn't reach the nutrition assistant right now. Please try again in a moment.";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DialogueState {
    /// No clarification known; the next input is checked against the store.
    #[default]
    Idle,
    /// The interpreter asked a question under this id and awaits the answer.
    Clarifying { clarification_id: String },
}

impl DialogueState {
    pub fn clarification_id(&self) -> Option<&str> {
        match self {
            Self::Idle => None,
            Self::Clarifying { clarification_id } => Some(clarification_id),
        }
    }
}

/// Per-user dialogue context, passed into every turn.
#[derive(Debug, Clone)]
pub struct Conversation {
    pub user_id: String,
    pub state: DialogueState,
    pub transcript: Transcript,
    /// Clarification ids this conversation has seen end: resolved, superseded
    /// by a newer id, or abandoned after a failed delivery. Store rows carrying
    /// one of these are stale and ignored.
    retired: HashSet<String>,
}

impl Conversation {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            state: DialogueState::Idle,
            transcript: Transcript::with_greeting(),
            retired: HashSet::new(),
        }
    }

    pub fn is_retired(&self, clarification_id: &str) -> bool {
        self.retired.contains(clarification_id)
    }
}

/// How a turn's reply was classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnOutcome {
    Clarification,
    Resolved,
    Acknowledged,
    DeliveryFailed,
}

/// What one turn did, for callers that want more than the transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TurnReport {
    pub request: RequestKind,
    pub outcome: TurnOutcome,
    pub reply: String,
    pub state: DialogueState,
}

pub struct DialogueController {
    store: Arc<dyn SessionStore>,
    interpreter: Arc<dyn Interpreter>,
}

impl DialogueController {
    pub fn new(store: Arc<dyn SessionStore>, interpreter: Arc<dyn Interpreter>) -> Self {
        Self { store, interpreter }
    }

    /// Run one turn. Blank input is ignored and returns `None` without any request.
    pub async fn run_turn(
        &self,
        conversation: &mut Conversation,
        input: &str,
    ) -> Option<TurnReport> {
        let input = input.trim();
        if input.is_empty() {
            tracing::debug!(user_id = %conversation.user_id, "ignoring blank input");
            return None;
        }

        conversation.transcript.push(ChatMessage::user(input));

        let session = self.session_to_answer(conversation).await;
        let request = plan_request(session, &conversation.user_id, input, Utc::now());
        let kind = request.kind();
        let in_flight = match &request {
            InterpreterRequest::Answer(req) => Some(req.clarification_id.clone()),
            InterpreterRequest::Fresh(_) => None,
        };

        let result = self.interpreter.send(&request).await;
        let (state, outcome, reply) = reduce(result);

        // Whatever id was answered is over unless the interpreter asserted it again.
        if let Some(answered) = in_flight {
            if state.clarification_id() != Some(answered.as_str()) {
                conversation.retired.insert(answered);
            }
        }
        if let Some(previous) = conversation.state.clarification_id() {
            if state.clarification_id() != Some(previous) {
                conversation.retired.insert(previous.to_string());
            }
        }
        if let Some(current) = state.clarification_id() {
            conversation.retired.remove(current);
        }

        tracing::info!(
            user_id = %conversation.user_id,
            request = ?kind,
            outcome = ?outcome,
            from = ?conversation.state,
            to = ?state,
            "dialogue turn complete"
        );

        conversation.state = state.clone();
        conversation.transcript.push(ChatMessage::assistant(reply.clone()));

        Some(TurnReport {
            request: kind,
            outcome,
            reply,
            state,
        })
    }

    /// The session this turn answers, read fresh from the store.
    ///
    /// Clarifying reads the cached id's own row, so an older pending duplicate
    /// cannot stand in for it. Idle takes the user's pending session unless this
    /// conversation already retired it. An unreadable store yields `None`. A
    /// cached id that cannot be read back as pending is retired, and the turn
    /// goes out as a fresh message.
    async fn session_to_answer(
        &self,
        conversation: &mut Conversation,
    ) -> Option<ClarificationSession> {
        let user_id = conversation.user_id.as_str();

        let Some(cached) = conversation.state.clarification_id() else {
            return match self.store.find_pending(user_id).await {
                Ok(Some(session)) if conversation.is_retired(&session.id) => {
                    tracing::debug!(clarification_id = %session.id, "ignoring retired pending session");
                    None
                }
                Ok(found) => found,
                Err(err) => {
                    tracing::warn!(user_id, error = %err, code = err.code(), "treating session lookup failure as idle");
                    None
                }
            };
        };

        match self.store.find_session(user_id, cached).await {
            Ok(Some(session)) if session.is_pending() => return Some(session),
            Ok(found) => tracing::warn!(
                user_id,
                clarification_id = cached,
                status = ?found.map(|s| s.status),
                "cached clarification is not pending in the store; restarting"
            ),
            Err(err) => tracing::warn!(
                user_id,
                clarification_id = cached,
                error = %err,
                code = err.code(),
                "treating session lookup failure as idle"
            ),
        }
        let cached = cached.to_string();
        conversation.retired.insert(cached);
        None
    }
}

/// Choose the single outbound request for this turn.
///
/// With a session in hand the input answers it at the session's own
/// `current_index`; without one it is a fresh message. Answer positions only
/// ever come from a stored row.
pub fn plan_request(
    session: Option<ClarificationSession>,
    user_id: &str,
    input: &str,
    now: DateTime<Utc>,
) -> InterpreterRequest {
    let Some(session) = session else {
        tracing::debug!(user_id, "no pending clarification, sending fresh message");
        return InterpreterRequest::Fresh(FreshMessageRequest {
            user_id: user_id.to_string(),
            message: input.to_string(),
            timestamp: now,
        });
    };
    tracing::debug!(user_id, clarification_id = %session.id, "answering clarification");

    InterpreterRequest::Answer(ClarificationAnswerRequest {
        answers: session.answers_with(input),
        current_index: session.current_index,
        clarification_id: session.id,
        user_id: user_id.to_string(),
        answer: input.to_string(),
    })
}

/// Fold an interpreter result into the next state and the assistant's reply text.
///
/// The next state depends only on this reply, so the freshest server-asserted
/// clarification id always replaces whatever was cached.
pub fn reduce(
    result: Result<InterpreterReply, DeliveryFailed>,
) -> (DialogueState, TurnOutcome, String) {
    match result {
        Ok(InterpreterReply::FreshClarification {
            clarification_id,
            question,
        })
        | Ok(InterpreterReply::ContinuedClarification {
            clarification_id,
            question,
        }) => (
            DialogueState::Clarifying { clarification_id },
            TurnOutcome::Clarification,
            question,
        ),
        Ok(InterpreterReply::Resolved { response }) => {
            (DialogueState::Idle, TurnOutcome::Resolved, response)
        }
        Ok(InterpreterReply::Malformed) => (
            DialogueState::Idle,
            TurnOutcome::Acknowledged,
            DEFAULT_ACKNOWLEDGEMENT.to_string(),
        ),
        Err(err) => {
            tracing::warn!(error = %err, code = err.code(), "interpreter delivery failed; resetting dialogue");
            (
                DialogueState::Idle,
                TurnOutcome::DeliveryFailed,
                RETRY_LATER.to_string(),
            )
        }
    }
}
