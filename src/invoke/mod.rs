// Model invocation: per-model payload adapters behind a registry-backed dispatcher

pub mod claude;
pub mod jurassic;
mod registry;
pub mod stability;

pub use registry::{
    chat_dispatcher, image_dispatcher, story_dispatcher, text_dispatcher, CHAT_MODEL_ID,
    CLAUDE_TEXT_MODEL_ID, JURASSIC_MID_MODEL_ID, SDXL_MODEL_ID, STORY_MODEL_ID,
};

use bytes::Bytes;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use crate::bedrock::{UpstreamClient, UpstreamError};

pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_MAX_TOKENS: u32 = 1000;

#[derive(Debug, Error)]
pub enum InvokeError {
    #[error("Unsupported model: {0}")]
    UnsupportedModel(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error("malformed model response: {0}")]
    MalformedResponse(String),

    #[error("failed to encode request payload: {0}")]
    Encode(#[source] serde_json::Error),
}

impl InvokeError {
    /// Name of the failure kind, surfaced when there is no provider code.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnsupportedModel(_) => "UnsupportedModel",
            Self::InvalidRequest(_) => "InvalidRequest",
            Self::Upstream(e) => e.kind(),
            Self::MalformedResponse(_) => "MalformedUpstreamResponse",
            Self::Encode(_) => "EncodeError",
        }
    }

    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedResponse(reason.into())
    }
}

/// Generic generation request, shaped per model by an adapter.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub style_preset: Option<String>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            style_preset: None,
        }
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn style_preset(mut self, style_preset: Option<String>) -> Self {
        self.style_preset = style_preset;
        self
    }

    pub fn validate(&self) -> Result<(), InvokeError> {
        if !(0.0..=1.0).contains(&self.temperature) {
            return Err(InvokeError::InvalidRequest(format!(
                "temperature must be between 0 and 1, got {}",
                self.temperature
            )));
        }
        if self.max_tokens == 0 {
            return Err(InvokeError::InvalidRequest(
                "maxTokens must be a positive integer".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GenerationResult {
    Text(String),
    /// Base64 encoded image bytes.
    Image(String),
}

impl GenerationResult {
    pub fn into_text(self) -> Result<String, InvokeError> {
        match self {
            Self::Text(text) => Ok(text),
            Self::Image(_) => Err(InvokeError::malformed("expected text output, model returned an image")),
        }
    }

    pub fn into_image(self) -> Result<String, InvokeError> {
        match self {
            Self::Image(data) => Ok(data),
            Self::Text(_) => Err(InvokeError::malformed("expected an image, model returned text")),
        }
    }
}

/// Stateless translator between the generic request/result and one model family's wire format.
pub trait ModelAdapter: Send + Sync {
    fn name(&self) -> &'static str;

    fn build_payload(&self, request: &GenerationRequest) -> Result<Value, InvokeError>;

    fn parse_response(&self, body: &[u8]) -> Result<GenerationResult, InvokeError>;
}

/// Exact-match registry from model id to adapter, bound to one upstream client.
#[derive(Clone)]
pub struct Dispatcher {
    upstream: Arc<dyn UpstreamClient>,
    adapters: HashMap<String, Arc<dyn ModelAdapter>>,
}

impl Dispatcher {
    pub fn new(upstream: Arc<dyn UpstreamClient>) -> Self {
        Self {
            upstream,
            adapters: HashMap::new(),
        }
    }

    pub fn register<A>(mut self, model_id: impl Into<String>, adapter: A) -> Self
    where
        A: ModelAdapter + 'static,
    {
        self.adapters.insert(model_id.into(), Arc::new(adapter));
        self
    }

    pub fn supports(&self, model_id: &str) -> bool {
        self.adapters.contains_key(model_id)
    }

    pub fn model_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.adapters.keys().map(|k| k.as_str()).collect();
        ids.sort_unstable();
        ids
    }

    /// Shape `request` for `model_id`, call the upstream and parse the reply.
    ///
    /// Unknown ids and invalid requests are rejected before any network call.
    /// Upstream failures are returned as-is; classification happens at the route boundary.
    pub async fn invoke(
        &self,
        model_id: &str,
        request: &GenerationRequest,
    ) -> Result<GenerationResult, InvokeError> {
        let adapter = self
            .adapters
            .get(model_id)
            .ok_or_else(|| InvokeError::UnsupportedModel(model_id.to_string()))?;
        request.validate()?;

        tracing::info!("Invoking {} model: {}", adapter.name(), model_id);

        let payload = adapter.build_payload(request)?;
        tracing::debug!("Invoke payload for {}: {}", model_id, payload);
        let body = serde_json::to_vec(&payload).map_err(InvokeError::Encode)?;

        let response = self.upstream.invoke_model(model_id, Bytes::from(body)).await?;
        let result = adapter.parse_response(&response)?;

        tracing::info!("Invocation of {} completed", model_id);
        Ok(result)
    }
}
