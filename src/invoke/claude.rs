// Claude messages adapter (chat-style payloads)

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{GenerationRequest, GenerationResult, InvokeError, ModelAdapter};

const ANTHROPIC_VERSION: &str = "bedrock-2023-05-31";

pub const CHAT_SYSTEM_PROMPT: &str = "Take the role of a friendly chat bot. Your responses are brief. \
You sometimes use emojis where appropriate, but you don't overdo it. \
You engage human in a dialog by regularly asking questions, \
except when Human indicates that the conversation is over.";

#[derive(Debug, Serialize)]
struct MessagesPayload<'a> {
    anthropic_version: &'static str,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ClaudeMessagesAdapter {
    system_prompt: Option<String>,
}

impl ClaudeMessagesAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_system_prompt(prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: Some(prompt.into()),
        }
    }
}

impl ModelAdapter for ClaudeMessagesAdapter {
    fn name(&self) -> &'static str {
        "claude-messages"
    }

    fn build_payload(&self, request: &GenerationRequest) -> Result<Value, InvokeError> {
        let payload = MessagesPayload {
            anthropic_version: ANTHROPIC_VERSION,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            system: self.system_prompt.as_deref(),
            messages: vec![Message {
                role: "user",
                content: &request.prompt,
            }],
        };
        serde_json::to_value(payload).map_err(InvokeError::Encode)
    }

    fn parse_response(&self, body: &[u8]) -> Result<GenerationResult, InvokeError> {
        let response: MessagesResponse = serde_json::from_slice(body)
            .map_err(|e| InvokeError::malformed(format!("invalid messages response: {}", e)))?;

        let first = response
            .content
            .into_iter()
            .next()
            .ok_or_else(|| InvokeError::malformed("messages response has no content"))?;

        first
            .text
            .map(GenerationResult::Text)
            .ok_or_else(|| InvokeError::malformed("first content block has no text"))
    }
}
