use base64::Engine;
use serde::{Deserialize, Serialize};

pub const QUOTA_EXHAUSTED_CODE: &str = "QUOTA_EXHAUSTED";
pub const GENERIC_ERROR_CODE: &str = "GENERIC_ERROR";
pub const INVALID_REQUEST_CODE: &str = "INVALID_REQUEST";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    // 中文注释：未知 sender 一律按助手处理，保证角色映射是全函数。
    #[serde(other)]
    Bot,
}

impl Sender {
    pub fn is_user(self) -> bool {
        matches!(self, Sender::User)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryTurn {
    pub sender: Sender,
    pub text: String,
}

impl HistoryTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::User,
            text: text.into(),
        }
    }

    pub fn bot(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::Bot,
            text: text.into(),
        }
    }
}

/// A named, MIME-typed payload attached to the newest turn.
///
/// `data` is the base64 text exactly as the caller sent it; it is never
/// re-encoded on the way to the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub name: String,
    pub mime_type: String,
    pub data: String,
}

impl Attachment {
    pub fn from_bytes(name: impl Into<String>, mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
        }
    }

    pub fn decoded_len(&self) -> Result<usize, String> {
        base64::engine::general_purpose::STANDARD
            .decode(self.data.trim())
            .map(|bytes| bytes.len())
            .map_err(|err| err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    #[serde(default, deserialize_with = "null_as_default")]
    pub message: String,
    #[serde(default)]
    pub history: Vec<HistoryTurn>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
}

// 中文注释：显式的 null 与缺省字段同义。
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    QuotaExhausted,
    Generic,
}

impl FailureKind {
    pub fn code(self) -> &'static str {
        match self {
            FailureKind::QuotaExhausted => QUOTA_EXHAUSTED_CODE,
            FailureKind::Generic => GENERIC_ERROR_CODE,
        }
    }

    pub fn from_code(code: &str) -> Self {
        if code.trim() == QUOTA_EXHAUSTED_CODE {
            FailureKind::QuotaExhausted
        } else {
            FailureKind::Generic
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Answer(String),
    Failed(FailureKind),
}
