use aprassist_core::completion::CompletionRequest;
use async_trait::async_trait;
use thiserror::Error;

const ERROR_BODY_PREVIEW_MAX_CHARS: usize = 512;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("upstream status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("upstream network error: {0}")]
    Network(String),
    #[error("upstream response decode failed: {0}")]
    Decode(String),
}

impl TransportError {
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Status { status, .. } => Some(*status),
            TransportError::Network(_) | TransportError::Decode(_) => None,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            TransportError::Status { message, .. } => message,
            TransportError::Network(message) | TransportError::Decode(message) => message,
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        // 中文注释：URL 不进入错误文本，避免地址里的数字被当成配额标记。
        let status = err.status();
        let message = err.without_url().to_string();
        match status {
            Some(status) => TransportError::Status {
                status: status.as_u16(),
                message,
            },
            None => TransportError::Network(message),
        }
    }
}

impl From<serde_json::Error> for TransportError {
    fn from(err: serde_json::Error) -> Self {
        TransportError::Decode(err.to_string())
    }
}

/// One way of reaching the completion provider.
///
/// `Ok(None)` means the provider answered successfully but without any text.
#[async_trait]
pub trait CompletionTransport: Send + Sync {
    fn name(&self) -> &'static str;

    async fn complete(&self, request: &CompletionRequest) -> Result<Option<String>, TransportError>;
}

pub(super) fn body_preview(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    let trimmed = text.trim();
    if trimmed.chars().count() <= ERROR_BODY_PREVIEW_MAX_CHARS {
        return trimmed.to_string();
    }
    let mut preview: String = trimmed.chars().take(ERROR_BODY_PREVIEW_MAX_CHARS).collect();
    preview.push_str("...");
    preview
}

pub(super) fn non_empty_text(text: Option<String>) -> Option<String> {
    text.filter(|value| !value.is_empty())
}
