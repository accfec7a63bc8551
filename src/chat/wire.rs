//! Chat-completion request and response bodies.

use serde::{Deserialize, Serialize};

use crate::chat::message::Message;
use crate::config::ModelConfig;

/// JSON body of a completion request.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [Message],
    pub max_tokens: u32,
    pub temperature: f32,
}

impl<'a> CompletionRequest<'a> {
    pub fn new(model: &'a ModelConfig, messages: &'a [Message]) -> Self {
        Self {
            model: &model.model,
            messages,
            max_tokens: model.max_tokens,
            temperature: model.temperature,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    model: Option<String>,
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: String,
}

/// Reply text and the model that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedReply {
    pub content: String,
    pub model: Option<String>,
}

/// Extract `choices[0].message.content` from a response body.
pub fn parse_reply(body: &[u8]) -> Result<ParsedReply, String> {
    let response: CompletionResponse =
        serde_json::from_slice(body).map_err(|e| format!("invalid JSON: {}", e))?;
    let first = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| "response has no choices".to_string())?;
    Ok(ParsedReply {
        content: first.message.content,
        model: response.model,
    })
}
