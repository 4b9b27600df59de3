use async_trait::async_trait;
use nutrichat_core::error::{DeliveryFailed, DeliveryFailure};
use nutrichat_core::interpreter::{InterpreterReply, InterpreterRequest, RequestKind};

use crate::config::DialogueConfig;

/// Anything that can turn one dialogue request into one decoded reply.
///
/// Implementations make exactly one attempt per call and never touch the
/// session store; retry policy belongs to the caller.
#[async_trait]
pub trait Interpreter: Send + Sync {
    async fn send(&self, request: &InterpreterRequest) -> Result<InterpreterReply, DeliveryFailed>;
}

/// Interpreter reached over the two JSON webhooks.
pub struct WebhookInterpreter {
    client: reqwest::Client,
    fresh_message_url: url::Url,
    clarification_answer_url: url::Url,
}

impl WebhookInterpreter {
    pub fn new(config: &DialogueConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            client,
            fresh_message_url: config.fresh_message_url.clone(),
            clarification_answer_url: config.clarification_answer_url.clone(),
        })
    }

    pub fn endpoint(&self, kind: RequestKind) -> &url::Url {
        match kind {
            RequestKind::FreshMessage => &self.fresh_message_url,
            RequestKind::ClarificationAnswer => &self.clarification_answer_url,
        }
    }
}

#[async_trait]
impl Interpreter for WebhookInterpreter {
    async fn send(&self, request: &InterpreterRequest) -> Result<InterpreterReply, DeliveryFailed> {
        let kind = request.kind();
        let endpoint = self.endpoint(kind);
        tracing::debug!(?kind, %endpoint, user_id = request.user_id(), "posting to interpreter");

        let resp = self
            .client
            .post(endpoint.clone())
            .json(request)
            .send()
            .await
            .map_err(|e| delivery_failed(endpoint, &e))?;

        let status = resp.status();
        if !status.is_success() {
            tracing::warn!(?kind, %endpoint, status = status.as_u16(), "interpreter returned non-success status");
            return Err(DeliveryFailed {
                endpoint: endpoint.to_string(),
                reason: DeliveryFailure::Status(status.as_u16()),
            });
        }

        let body = resp
            .bytes()
            .await
            .map_err(|e| delivery_failed(endpoint, &e))?;

        let reply = InterpreterReply::from_slice(&body);
        if reply == InterpreterReply::Malformed {
            tracing::warn!(
                ?kind,
                %endpoint,
                body_len = body.len(),
                "interpreter response had no recognised fields"
            );
        }
        Ok(reply)
    }
}

fn delivery_failed(endpoint: &url::Url, err: &reqwest::Error) -> DeliveryFailed {
    let reason = if err.is_timeout() {
        DeliveryFailure::Timeout
    } else {
        DeliveryFailure::Network(err.to_string())
    };
    tracing::warn!(%endpoint, error = %err, "interpreter delivery failed");
    DeliveryFailed {
        endpoint: endpoint.to_string(),
        reason,
    }
}
