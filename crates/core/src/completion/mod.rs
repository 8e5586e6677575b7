use serde::{Deserialize, Serialize};

use crate::chat::{Attachment, ChatRequest, HistoryTurn, Sender};

mod builder;

pub use builder::{build_completion_request, BuildError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

impl Role {
    pub fn for_sender(sender: Sender) -> Self {
        if sender.is_user() {
            Role::User
        } else {
            Role::Model
        }
    }

    pub fn sender(self) -> Sender {
        match self {
            Role::User => Sender::User,
            Role::Model => Sender::Bot,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
    /// Display label of the originating attachment; kept locally, not sent upstream.
    #[serde(skip)]
    pub name: String,
}

impl From<&Attachment> for InlineData {
    fn from(attachment: &Attachment) -> Self {
        Self {
            mime_type: attachment.mime_type.clone(),
            data: attachment.data.clone(),
            name: attachment.name.clone(),
        }
    }
}

impl InlineData {
    pub fn to_attachment(&self) -> Attachment {
        Attachment {
            name: self.name.clone(),
            mime_type: self.mime_type.clone(),
            data: self.data.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text { text: text.into() }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Part::Text { text } => Some(text.as_str()),
            Part::InlineData { .. } => None,
        }
    }

    pub fn as_inline_data(&self) -> Option<&InlineData> {
        match self {
            Part::Text { .. } => None,
            Part::InlineData { inline_data } => Some(inline_data),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    pub role: Role,
    pub parts: Vec<Part>,
}

impl Content {
    pub fn text(&self) -> String {
        self.parts.iter().filter_map(Part::as_text).collect()
    }

    pub fn inline_data(&self) -> impl Iterator<Item = &InlineData> {
        self.parts.iter().filter_map(Part::as_inline_data)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    pub top_p: f32,
}

/// Per-process settings applied to every built request.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionSettings {
    pub model: String,
    pub system_instruction: String,
    pub temperature: f32,
    pub top_p: f32,
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            model: crate::prompt::DEFAULT_MODEL.to_string(),
            system_instruction: crate::prompt::default_system_instruction().to_string(),
            temperature: crate::prompt::DEFAULT_TEMPERATURE,
            top_p: crate::prompt::DEFAULT_TOP_P,
        }
    }
}

/// Body of a generateContent call. `model` selects the endpoint and is not serialized.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionRequest {
    #[serde(skip)]
    pub model: String,
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Instruction>,
    pub generation_config: GenerationConfig,
}

impl CompletionRequest {
    pub fn final_turn(&self) -> Option<&Content> {
        self.contents.last()
    }

    pub fn prior_turns(&self) -> &[Content] {
        match self.contents.split_last() {
            Some((_, prior)) => prior,
            None => &[],
        }
    }

    pub fn attachment_count(&self) -> usize {
        self.final_turn()
            .map(|turn| turn.inline_data().count())
            .unwrap_or(0)
    }

    /// Rebuilds the caller wire shape, for transports that forward to another proxy.
    pub fn to_chat_request(&self) -> ChatRequest {
        let history = self
            .prior_turns()
            .iter()
            .map(|turn| HistoryTurn {
                sender: turn.role.sender(),
                text: turn.text(),
            })
            .collect();
        let (message, attachments) = match self.final_turn() {
            Some(turn) => (
                turn.text(),
                turn.inline_data().map(InlineData::to_attachment).collect(),
            ),
            None => (String::new(), Vec::new()),
        };
        ChatRequest {
            message,
            history,
            attachments,
        }
    }
}
