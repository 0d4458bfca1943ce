// AI21 Jurassic-2 adapter (plain completion payloads)

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{GenerationRequest, GenerationResult, InvokeError, ModelAdapter};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CompletionPayload<'a> {
    prompt: &'a str,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    completions: Vec<Completion>,
}

#[derive(Debug, Deserialize)]
struct Completion {
    data: CompletionData,
}

#[derive(Debug, Deserialize)]
struct CompletionData {
    text: String,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JurassicCompletionAdapter;

impl ModelAdapter for JurassicCompletionAdapter {
    fn name(&self) -> &'static str {
        "jurassic-completion"
    }

    fn build_payload(&self, request: &GenerationRequest) -> Result<Value, InvokeError> {
        let payload = CompletionPayload {
            prompt: &request.prompt,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };
        serde_json::to_value(payload).map_err(InvokeError::Encode)
    }

    fn parse_response(&self, body: &[u8]) -> Result<GenerationResult, InvokeError> {
        let response: CompletionResponse = serde_json::from_slice(body)
            .map_err(|e| InvokeError::malformed(format!("invalid completion response: {}", e)))?;

        let completion = response
            .completions
            .into_iter()
            .next()
            .ok_or_else(|| InvokeError::malformed("completion response has no completions"))?;

        // The model opens its output with a newline; drop exactly one.
        let mut text = completion.data.text;
        if text.starts_with('\n') {
            text.remove(0);
            tracing::debug!("Stripped leading newline from completion");
        }
        Ok(GenerationResult::Text(text))
    }
}
