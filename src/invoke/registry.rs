// Registered models per route family

use std::sync::Arc;

use super::claude::{ClaudeMessagesAdapter, CHAT_SYSTEM_PROMPT};
use super::jurassic::JurassicCompletionAdapter;
use super::stability::StableDiffusionAdapter;
use super::Dispatcher;
use crate::bedrock::UpstreamClient;

pub const CHAT_MODEL_ID: &str = "anthropic.claude-3-5-sonnet-20241022-v2:0";
pub const CLAUDE_TEXT_MODEL_ID: &str = "us.anthropic.claude-3-5-sonnet-20241022-v2:0";
pub const JURASSIC_MID_MODEL_ID: &str = "ai21.j2-mid-v1";
pub const SDXL_MODEL_ID: &str = "stability.stable-diffusion-xl-v1";
pub const STORY_MODEL_ID: &str = "anthropic.claude-3-5-sonnet-20240620-v1:0";

/// Chat playground: Claude with the chatbot persona.
pub fn chat_dispatcher(upstream: Arc<dyn UpstreamClient>) -> Dispatcher {
    Dispatcher::new(upstream).register(
        CHAT_MODEL_ID,
        ClaudeMessagesAdapter::with_system_prompt(CHAT_SYSTEM_PROMPT),
    )
}

/// Text playground: free-form prompts with caller supplied sampling settings.
pub fn text_dispatcher(upstream: Arc<dyn UpstreamClient>) -> Dispatcher {
    Dispatcher::new(upstream)
        .register(CLAUDE_TEXT_MODEL_ID, ClaudeMessagesAdapter::new())
        .register(JURASSIC_MID_MODEL_ID, JurassicCompletionAdapter)
}

pub fn image_dispatcher(upstream: Arc<dyn UpstreamClient>) -> Dispatcher {
    Dispatcher::new(upstream).register(SDXL_MODEL_ID, StableDiffusionAdapter)
}

pub fn story_dispatcher(upstream: Arc<dyn UpstreamClient>) -> Dispatcher {
    Dispatcher::new(upstream).register(STORY_MODEL_ID, ClaudeMessagesAdapter::new())
}
