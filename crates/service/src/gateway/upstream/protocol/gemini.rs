use aprassist_core::completion::CompletionRequest;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use super::super::transport::{body_preview, non_empty_text, CompletionTransport, TransportError};

const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Debug, Default, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Default, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Default, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Default, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    thought: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct ProviderErrorEnvelope {
    error: ProviderError,
}

#[derive(Debug, Deserialize)]
struct ProviderError {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Calls the provider's generateContent endpoint directly with the server-held key.
pub struct GeminiTransport {
    client: Client,
    base_url: String,
    api_key: String,
    attempt_timeout: Option<Duration>,
}

impl GeminiTransport {
    pub fn new(
        client: Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        attempt_timeout: Option<Duration>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
            attempt_timeout,
        }
    }

    fn endpoint_for(&self, model: &str) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            model.trim()
        )
    }
}

#[async_trait]
impl CompletionTransport for GeminiTransport {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<Option<String>, TransportError> {
        let mut builder = self
            .client
            .post(self.endpoint_for(&request.model))
            .header(API_KEY_HEADER, self.api_key.as_str())
            .json(request);
        if let Some(timeout) = self.attempt_timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                message: provider_error_message(&body),
            });
        }
        extract_answer_text(&body)
    }
}

/// Concatenated text of the first candidate, ignoring thought parts.
pub(crate) fn extract_answer_text(body: &[u8]) -> Result<Option<String>, TransportError> {
    let parsed: GenerateContentResponse = serde_json::from_slice(body)?;
    let text = parsed
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter(|part| part.thought != Some(true))
                .filter_map(|part| part.text)
                .collect::<String>()
        });
    Ok(non_empty_text(text))
}

pub(crate) fn provider_error_message(body: &[u8]) -> String {
    match serde_json::from_slice::<ProviderErrorEnvelope>(body) {
        Ok(envelope) => {
            let status = envelope.error.status.unwrap_or_default();
            let message = envelope.error.message.unwrap_or_default();
            match (status.is_empty(), message.is_empty()) {
                (false, false) => format!("{status}: {message}"),
                (false, true) => status,
                (true, _) => message,
            }
        }
        Err(_) => body_preview(body),
    }
}
