use thiserror::Error;

use super::{
    CompletionRequest, CompletionSettings, Content, GenerationConfig, InlineData, Instruction,
    Part, Role,
};
use crate::chat::{Attachment, HistoryTurn};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("message is empty and no attachments were supplied")]
    EmptyTurn,
}

/// Turns one chat submission into a provider request.
///
/// Every history entry becomes a text-only turn in its original order, and the
/// new message is appended as a final `user` turn: the text part first, then
/// one inline-data part per attachment in input order.
pub fn build_completion_request(
    message: &str,
    history: &[HistoryTurn],
    attachments: &[Attachment],
    settings: &CompletionSettings,
) -> Result<CompletionRequest, BuildError> {
    if message.trim().is_empty() && attachments.is_empty() {
        return Err(BuildError::EmptyTurn);
    }

    let mut contents: Vec<Content> = history
        .iter()
        .map(|turn| Content {
            role: Role::for_sender(turn.sender),
            parts: vec![Part::text(turn.text.as_str())],
        })
        .collect();

    let mut parts = Vec::with_capacity(attachments.len() + 1);
    parts.push(Part::text(message));
    parts.extend(attachments.iter().map(|attachment| Part::InlineData {
        inline_data: InlineData::from(attachment),
    }));
    contents.push(Content {
        role: Role::User,
        parts,
    });

    let system_instruction = if settings.system_instruction.trim().is_empty() {
        None
    } else {
        Some(Instruction {
            parts: vec![Part::text(settings.system_instruction.as_str())],
        })
    };

    Ok(CompletionRequest {
        model: settings.model.clone(),
        contents,
        system_instruction,
        generation_config: GenerationConfig {
            temperature: settings.temperature,
            top_p: settings.top_p,
        },
    })
}
