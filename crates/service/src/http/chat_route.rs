use aprassist_core::chat::{
    ChatReply, ChatRequest, FailureKind, Outcome, INVALID_REQUEST_CODE,
};
use axum::body::{to_bytes, Body};
use axum::extract::State;
use axum::http::{header, Request as HttpRequest, Response, StatusCode};
use std::sync::Arc;

use crate::gateway::{ChatError, ChatGateway};
use crate::http::responses::{error_response, json_response, text_response};
use crate::process_env::generate_request_id;

const METHOD_NOT_ALLOWED_MESSAGE: &str = "Method not allowed";

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) gateway: Arc<ChatGateway>,
    pub(crate) max_body_bytes: usize,
}

pub(crate) fn status_for_failure(kind: FailureKind) -> StatusCode {
    match kind {
        FailureKind::QuotaExhausted => StatusCode::TOO_MANY_REQUESTS,
        FailureKind::Generic => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub(crate) async fn chat_handler(
    State(state): State<AppState>,
    request: HttpRequest<Body>,
) -> Response<Body> {
    let request_id = generate_request_id();
    let (parts, body) = request.into_parts();

    if let Some(content_length) = parts
        .headers
        .get(header::CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
    {
        if content_length > state.max_body_bytes as u64 {
            log::warn!(
                "event=chat_body_too_large request_id={} content_length={} limit={}",
                request_id,
                content_length,
                state.max_body_bytes
            );
            return text_response(
                StatusCode::PAYLOAD_TOO_LARGE,
                format!("request body too large: content-length={content_length}"),
            );
        }
    }

    let body_bytes = match to_bytes(body, state.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(_) => {
            log::warn!(
                "event=chat_body_too_large request_id={} limit={}",
                request_id,
                state.max_body_bytes
            );
            return text_response(
                StatusCode::PAYLOAD_TOO_LARGE,
                format!("request body too large: content-length>{}", state.max_body_bytes),
            );
        }
    };

    let chat: ChatRequest = match serde_json::from_slice(&body_bytes) {
        Ok(chat) => chat,
        Err(err) => {
            log::warn!(
                "event=chat_invalid_body request_id={} err={}",
                request_id,
                err
            );
            return error_response(StatusCode::BAD_REQUEST, INVALID_REQUEST_CODE);
        }
    };

    match state.gateway.answer(&chat, &request_id).await {
        Ok(Outcome::Answer(text)) => json_response(StatusCode::OK, &ChatReply { text }),
        Ok(Outcome::Failed(kind)) => error_response(status_for_failure(kind), kind.code()),
        Err(ChatError::Config(err)) => {
            log::error!(
                "event=chat_config_missing request_id={} err={}",
                request_id,
                err
            );
            error_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
        Err(ChatError::InvalidRequest(err)) => {
            log::warn!(
                "event=chat_invalid_request request_id={} err={}",
                request_id,
                err
            );
            error_response(StatusCode::BAD_REQUEST, INVALID_REQUEST_CODE)
        }
    }
}

pub(crate) async fn method_not_allowed() -> Response<Body> {
    error_response(StatusCode::METHOD_NOT_ALLOWED, METHOD_NOT_ALLOWED_MESSAGE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::upstream::backoff::RetryPolicy;
    use crate::gateway::upstream::retry::RetryingInvoker;
    use crate::gateway::upstream::transport::{CompletionTransport, TransportError};
    use crate::gateway::GatewayConfig;
    use aprassist_core::completion::{CompletionRequest, CompletionSettings};
    use async_trait::async_trait;
    use std::time::Duration;

    struct FixedTransport(Result<Option<String>, TransportError>);

    #[async_trait]
    impl CompletionTransport for FixedTransport {
        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn complete(&self, _request: &CompletionRequest) -> Result<Option<String>, TransportError> {
            self.0.clone()
        }
    }

    fn state_with(result: Result<Option<String>, TransportError>, max_body_bytes: usize) -> AppState {
        let invoker = RetryingInvoker::new(
            Arc::new(FixedTransport(result)),
            RetryPolicy::new(1, Duration::ZERO),
        );
        AppState {
            gateway: Arc::new(ChatGateway::with_invoker(CompletionSettings::default(), invoker)),
            max_body_bytes,
        }
    }

    fn call(state: AppState, body: &str) -> (StatusCode, String) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("runtime");
        let request = HttpRequest::builder()
            .method("POST")
            .uri("/api/chat")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("request");
        let response = runtime.block_on(chat_handler(State(state), request));
        let status = response.status();
        let body = runtime
            .block_on(to_bytes(response.into_body(), usize::MAX))
            .expect("read body");
        (status, String::from_utf8(body.to_vec()).expect("utf8"))
    }

    #[test]
    fn answer_maps_to_200_text() {
        let (status, body) = call(
            state_with(Ok(Some("Use enrolment counts.".to_string())), 1024),
            r#"{"message":"How do I fill Section B?","history":[],"attachments":[]}"#,
        );
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, r#"{"text":"Use enrolment counts."}"#);
    }

    #[test]
    fn failures_map_to_status_and_code() {
        let (status, body) = call(
            state_with(
                Err(TransportError::Status {
                    status: 429,
                    message: "RESOURCE_EXHAUSTED".to_string(),
                }),
                1024,
            ),
            r#"{"message":"hi"}"#,
        );
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body, r#"{"error":"QUOTA_EXHAUSTED"}"#);

        let (status, body) = call(
            state_with(Err(TransportError::Network("connection reset".to_string())), 1024),
            r#"{"message":"hi"}"#,
        );
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, r#"{"error":"GENERIC_ERROR"}"#);
    }

    #[test]
    fn malformed_or_empty_turn_is_400() {
        let (status, body) = call(state_with(Ok(None), 1024), "{not json");
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, r#"{"error":"INVALID_REQUEST"}"#);

        let (status, _) = call(state_with(Ok(None), 1024), r#"{"message":"  "}"#);
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn null_message_with_attachment_is_answered() {
        let (status, body) = call(
            state_with(Ok(Some("Read the CSV.".to_string())), 1024),
            r#"{"message":null,"attachments":[{"name":"kpi.csv","mimeType":"text/csv","data":"YSxiCg=="}]}"#,
        );
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, r#"{"text":"Read the CSV."}"#);

        let (status, body) = call(state_with(Ok(None), 1024), r#"{"message":null}"#);
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, r#"{"error":"INVALID_REQUEST"}"#);
    }

    #[test]
    fn oversized_body_without_content_length_returns_413() {
        let (status, body) = call(state_with(Ok(None), 8), r#"{"message":"longer than eight"}"#);
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert!(body.contains("request body too large"));
    }

    #[test]
    fn missing_key_is_reported_without_calling_upstream() {
        let state = AppState {
            gateway: Arc::new(ChatGateway::from_config(&GatewayConfig::default())),
            max_body_bytes: 1024,
        };
        let (status, body) = call(state, r#"{"message":"hi"}"#);
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, r#"{"error":"API key not configured on server"}"#);
    }
}
