// Stable Diffusion XL adapter (image payloads)

use base64::Engine;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

use super::{GenerationRequest, GenerationResult, InvokeError, ModelAdapter};

const CFG_SCALE: u32 = 20;
const STEPS: u32 = 100;

pub const STYLE_PRESETS: &[&str] = &[
    "3d-model",
    "analog-film",
    "anime",
    "cinematic",
    "comic-book",
    "digital-art",
    "enhance",
    "fantasy-art",
    "isometric",
    "line-art",
    "low-poly",
    "modeling-compound",
    "neon-punk",
    "origami",
    "photographic",
    "pixel-art",
    "tile-texture",
];

static STYLE_SET: Lazy<HashSet<&'static str>> = Lazy::new(|| STYLE_PRESETS.iter().copied().collect());

pub fn is_style_preset(style: &str) -> bool {
    STYLE_SET.contains(style)
}

#[derive(Debug, Serialize)]
struct ImagePayload<'a> {
    text_prompts: Vec<TextPrompt<'a>>,
    cfg_scale: u32,
    steps: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    style_preset: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct TextPrompt<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct ImageResponse {
    #[serde(default)]
    artifacts: Vec<Artifact>,
}

#[derive(Debug, Deserialize)]
struct Artifact {
    base64: String,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StableDiffusionAdapter;

impl ModelAdapter for StableDiffusionAdapter {
    fn name(&self) -> &'static str {
        "stable-diffusion"
    }

    fn build_payload(&self, request: &GenerationRequest) -> Result<Value, InvokeError> {
        // Unknown styles are dropped, not rejected.
        let style_preset = request.style_preset.as_deref().filter(|s| is_style_preset(s));
        match (&request.style_preset, style_preset) {
            (Some(requested), None) => {
                tracing::debug!("No style_preset applied (requested: {})", requested)
            }
            (_, Some(style)) => tracing::debug!("Using style_preset: {}", style),
            _ => {}
        }

        let payload = ImagePayload {
            text_prompts: vec![TextPrompt { text: &request.prompt }],
            cfg_scale: CFG_SCALE,
            steps: STEPS,
            style_preset,
        };
        serde_json::to_value(payload).map_err(InvokeError::Encode)
    }

    fn parse_response(&self, body: &[u8]) -> Result<GenerationResult, InvokeError> {
        let response: ImageResponse = serde_json::from_slice(body)
            .map_err(|e| InvokeError::malformed(format!("invalid image response: {}", e)))?;
        tracing::debug!("Image response artifacts count: {}", response.artifacts.len());

        let artifact = response
            .artifacts
            .into_iter()
            .next()
            .ok_or_else(|| InvokeError::malformed("image response has no artifacts"))?;

        base64::engine::general_purpose::STANDARD
            .decode(&artifact.base64)
            .map_err(|e| InvokeError::malformed(format!("artifact is not valid base64: {}", e)))?;

        Ok(GenerationResult::Image(artifact.base64))
    }
}
