//! Chat-completion request body.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Serialize;

use crate::prompt::{compose_instruction, REFERENCE_FILE_NAME};

use super::ExtractionRequest;

/// Request body for the chat-completion endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
}

/// A single chat message with multi-part content.
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: Vec<ContentPart>,
}

/// One part of a message's content.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    /// Plain instruction text.
    Text { text: String },
    /// Inline file, base64-encoded into the URL field.
    FileUrl { file_url: FileUrl, file_name: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct FileUrl {
    pub url: String,
}

impl ContentPart {
    fn file(bytes: &[u8], file_name: &str) -> Self {
        Self::FileUrl {
            file_url: FileUrl {
                url: STANDARD.encode(bytes),
            },
            file_name: file_name.to_string(),
        }
    }
}

/// Build the request body for one document.
///
/// The message holds the composed instruction, the document, and the
/// reference list when one was supplied, in that order.
pub fn build_request(model: &str, request: &ExtractionRequest<'_>) -> ChatCompletionRequest {
    let mut content = vec![
        ContentPart::Text {
            text: compose_instruction(request.instruction_prompt, &request.document.name),
        },
        ContentPart::file(&request.document.bytes, &request.document.name),
    ];

    if let Some(reference) = request.reference {
        content.push(ContentPart::file(&reference.bytes, REFERENCE_FILE_NAME));
    }

    ChatCompletionRequest {
        model: model.to_string(),
        messages: vec![ChatMessage {
            role: "user".to_string(),
            content,
        }],
        stream: false,
    }
}
