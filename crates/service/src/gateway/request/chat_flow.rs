use aprassist_core::chat::{ChatRequest, Outcome};
use aprassist_core::completion::{build_completion_request, BuildError, CompletionSettings};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

use super::runtime_config::{build_upstream_client, ConfigError, GatewayConfig};
use super::upstream::config::TransportMode;
use super::upstream::protocol::chat_proxy::ChatProxyTransport;
use super::upstream::protocol::gemini::GeminiTransport;
use super::upstream::retry::RetryingInvoker;
use super::upstream::transport::CompletionTransport;

#[derive(Debug, Error)]
pub enum ChatError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    InvalidRequest(#[from] BuildError),
}

/// Everything a `/api/chat` request needs, built once per process.
pub struct ChatGateway {
    settings: CompletionSettings,
    invoker: Result<RetryingInvoker, ConfigError>,
}

impl ChatGateway {
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self {
            settings: config.completion.clone(),
            invoker: build_invoker(config),
        }
    }

    /// Embeds a caller-supplied invoker, e.g. one wrapping a custom transport.
    pub fn with_invoker(settings: CompletionSettings, invoker: RetryingInvoker) -> Self {
        Self {
            settings,
            invoker: Ok(invoker),
        }
    }

    pub async fn answer(&self, request: &ChatRequest, request_id: &str) -> Result<Outcome, ChatError> {
        let invoker = self.invoker.as_ref().map_err(|err| err.clone())?;
        let completion = build_completion_request(
            &request.message,
            &request.history,
            &request.attachments,
            &self.settings,
        )?;

        let started_at = Instant::now();
        log::info!(
            "event=chat_request request_id={} transport={} history_turns={} attachments={} attachment_bytes={} message_chars={}",
            request_id,
            invoker.transport_name(),
            completion.prior_turns().len(),
            completion.attachment_count(),
            attachment_bytes(request),
            request.message.chars().count()
        );
        let outcome = invoker.invoke_traced(&completion, request_id).await;
        match &outcome {
            Outcome::Answer(text) => log::info!(
                "event=chat_response request_id={} status=ok answer_chars={} elapsed_ms={}",
                request_id,
                text.chars().count(),
                started_at.elapsed().as_millis()
            ),
            Outcome::Failed(kind) => log::info!(
                "event=chat_response request_id={} status={} elapsed_ms={}",
                request_id,
                kind.code(),
                started_at.elapsed().as_millis()
            ),
        }
        Ok(outcome)
    }
}

fn attachment_bytes(request: &ChatRequest) -> usize {
    request
        .attachments
        .iter()
        .filter_map(|attachment| attachment.decoded_len().ok())
        .sum()
}

pub fn build_invoker(config: &GatewayConfig) -> Result<RetryingInvoker, ConfigError> {
    config.check_credentials()?;
    let client = build_upstream_client(config.upstream_connect_timeout);
    let transport: Arc<dyn CompletionTransport> = match config.transport {
        TransportMode::Direct => Arc::new(GeminiTransport::new(
            client,
            config.upstream_base_url.clone(),
            config.api_key.clone().ok_or(ConfigError::MissingApiKey)?,
            config.upstream_total_timeout,
        )),
        TransportMode::Proxy => Arc::new(ChatProxyTransport::new(
            client,
            config.proxy_url.clone().ok_or(ConfigError::MissingProxyUrl)?,
            config.upstream_total_timeout,
        )),
    };
    Ok(RetryingInvoker::new(transport, config.retry_policy()))
}
