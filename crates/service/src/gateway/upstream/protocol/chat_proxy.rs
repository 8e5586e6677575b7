use aprassist_core::chat::{ChatReply, ErrorBody, FailureKind};
use aprassist_core::completion::CompletionRequest;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use super::super::transport::{body_preview, non_empty_text, CompletionTransport, TransportError};

const QUOTA_STATUS: u16 = 429;

/// Forwards the chat turn to another assistant proxy speaking the `/api/chat` contract.
pub struct ChatProxyTransport {
    client: Client,
    endpoint: String,
    attempt_timeout: Option<Duration>,
}

impl ChatProxyTransport {
    pub fn new(client: Client, endpoint: impl Into<String>, attempt_timeout: Option<Duration>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            attempt_timeout,
        }
    }
}

#[async_trait]
impl CompletionTransport for ChatProxyTransport {
    fn name(&self) -> &'static str {
        "chat_proxy"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<Option<String>, TransportError> {
        let mut builder = self
            .client
            .post(self.endpoint.as_str())
            .json(&request.to_chat_request());
        if let Some(timeout) = self.attempt_timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        if !status.is_success() {
            return Err(proxy_failure(status.as_u16(), &body));
        }
        let reply: ChatReply = serde_json::from_slice(&body)?;
        Ok(non_empty_text(Some(reply.text)))
    }
}

/// The peer already classified the failure; its `QUOTA_EXHAUSTED` code wins over
/// whatever status an intermediate hop rewrote the response to.
fn proxy_failure(status: u16, body: &[u8]) -> TransportError {
    let message = proxy_error_message(body);
    let status = match FailureKind::from_code(&message) {
        FailureKind::QuotaExhausted => QUOTA_STATUS,
        FailureKind::Generic => status,
    };
    TransportError::Status { status, message }
}

fn proxy_error_message(body: &[u8]) -> String {
    match serde_json::from_slice::<ErrorBody>(body) {
        Ok(parsed) => parsed.error,
        Err(_) => body_preview(body),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::upstream::outcome::classify_failure;

    #[test]
    fn proxy_error_code_becomes_message() {
        assert_eq!(
            proxy_error_message(br#"{"error":"QUOTA_EXHAUSTED"}"#),
            "QUOTA_EXHAUSTED"
        );
        assert_eq!(proxy_error_message(b"Service Unavailable"), "Service Unavailable");
    }

    #[test]
    fn peer_quota_code_is_quota_even_behind_a_rewritten_status() {
        let err = proxy_failure(502, br#"{"error":"QUOTA_EXHAUSTED"}"#);
        assert_eq!(err.status(), Some(429));
        assert_eq!(classify_failure(&err), FailureKind::QuotaExhausted);

        let err = proxy_failure(500, br#"{"error":"GENERIC_ERROR"}"#);
        assert_eq!(err.status(), Some(500));
        assert_eq!(classify_failure(&err), FailureKind::Generic);
    }
}
