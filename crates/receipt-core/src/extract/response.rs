//! Chat-completion response envelope.

use serde::Deserialize;

use crate::error::ExtractionError;

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<Message>,
}

#[derive(Debug, Deserialize)]
struct Message {
    content: Option<String>,
}

/// Pull the first choice's message text out of a response body.
pub fn message_content(body: &str) -> Result<String, ExtractionError> {
    let response: ChatCompletionResponse = serde_json::from_str(body)
        .map_err(|e| ExtractionError::MissingContent(format!("malformed response body: {}", e)))?;

    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message)
        .and_then(|message| message.content)
        .ok_or_else(|| ExtractionError::MissingContent("choices[0].message.content".to_string()))
}
