// API request handlers

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    response::Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{ApiError, AppState};
use crate::bedrock::{ModelDetails, ModelSummary};
use crate::invoke::{GenerationRequest, InvokeError, DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE};
use crate::story::{self, StoryLength, StoryParams};

const CHAT_MAX_TOKENS: u32 = 1024;
const CHAT_TEMPERATURE: f32 = 0.8;

// Root endpoint
pub async fn root() -> Json<Value> {
    Json(json!({
        "message": "Foundation model playground proxy",
        "endpoints": [
            "GET /api/health",
            "GET /api/health/model/{modelId}",
            "GET /foundation-models",
            "GET /foundation-models/model/{modelId}",
            "POST /foundation-models/model/chat/{modelId}/invoke",
            "POST /foundation-models/model/text/{modelId}/invoke",
            "POST /foundation-models/model/image/{modelId}/invoke",
            "POST /story-playground/generate"
        ]
    }))
}

fn log_invoke_failure(route: &str, model_id: &str, err: &InvokeError) {
    match err {
        InvokeError::UnsupportedModel(_) | InvokeError::InvalidRequest(_) => {
            tracing::warn!("Rejected {} invoke for model_id {}: {}", route, model_id, err)
        }
        _ => tracing::error!(
            "{} invoke failed for model_id {}: kind={}, error={}",
            route,
            model_id,
            err.kind(),
            err
        ),
    }
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub prompt: String,
}

#[derive(Debug, Serialize)]
pub struct CompletionResponse {
    pub completion: String,
}

pub async fn invoke_chat(
    State(state): State<AppState>,
    Path(model_id): Path<String>,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<CompletionResponse>, ApiError> {
    let Json(body) = body?;
    tracing::info!("Chat invoke called with model_id: {}", model_id);

    let request = GenerationRequest::new(body.prompt)
        .temperature(CHAT_TEMPERATURE)
        .max_tokens(CHAT_MAX_TOKENS);

    let completion = state
        .chat
        .invoke(&model_id, &request)
        .await
        .and_then(|r| r.into_text())
        .inspect_err(|e| log_invoke_failure("chat", &model_id, e))?;

    Ok(Json(CompletionResponse { completion }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextRequest {
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

pub async fn invoke_text(
    State(state): State<AppState>,
    Path(model_id): Path<String>,
    body: Result<Json<TextRequest>, JsonRejection>,
) -> Result<Json<CompletionResponse>, ApiError> {
    let Json(body) = body?;
    tracing::info!("Text invoke called with model_id: {}", model_id);
    tracing::debug!(
        "Text invoke request - temperature: {}, max_tokens: {}, prompt chars: {}",
        body.temperature,
        body.max_tokens,
        body.prompt.len()
    );

    let request = GenerationRequest::new(body.prompt)
        .temperature(body.temperature)
        .max_tokens(body.max_tokens);

    let completion = state
        .text
        .invoke(&model_id, &request)
        .await
        .and_then(|r| r.into_text())
        .inspect_err(|e| log_invoke_failure("text", &model_id, e))?;

    tracing::info!("Text invoke completed successfully for model_id: {}", model_id);
    Ok(Json(CompletionResponse { completion }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRequest {
    pub prompt: String,
    #[serde(default)]
    pub style_preset: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageResponse {
    pub image_byte_array: String,
}

pub async fn invoke_image(
    State(state): State<AppState>,
    Path(model_id): Path<String>,
    body: Result<Json<ImageRequest>, JsonRejection>,
) -> Result<Json<ImageResponse>, ApiError> {
    let Json(body) = body?;
    tracing::info!("Image invoke called with model_id: {}", model_id);

    let request = GenerationRequest::new(body.prompt).style_preset(body.style_preset);

    let image_byte_array = state
        .image
        .invoke(&model_id, &request)
        .await
        .and_then(|r| r.into_image())
        .inspect_err(|e| log_invoke_failure("image", &model_id, e))?;

    tracing::info!(
        "Image invoke completed for model_id: {}, image size: {} chars",
        model_id,
        image_byte_array.len()
    );
    Ok(Json(ImageResponse { image_byte_array }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryRequest {
    #[serde(default)]
    pub theme: Option<String>,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub characters: Option<u32>,
    #[serde(default)]
    pub length: Option<String>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct StoryResponse {
    pub title: String,
    pub story: String,
}

pub async fn generate_story(
    State(state): State<AppState>,
    body: Result<Json<StoryRequest>, JsonRejection>,
) -> Result<Json<StoryResponse>, ApiError> {
    let Json(body) = body?;
    let params = StoryParams {
        theme: body.theme,
        genre: body.genre,
        characters: body.characters.unwrap_or(1),
        length: body.length.as_deref().map(StoryLength::parse).unwrap_or_default(),
    };
    tracing::info!(
        "Story generation requested: characters={}, length={:?}",
        params.characters,
        params.length
    );

    let generated = story::generate_story(
        &state.story,
        &params,
        body.temperature.unwrap_or(DEFAULT_TEMPERATURE),
        body.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
    )
    .await
    .inspect_err(|e| log_invoke_failure("story", crate::invoke::STORY_MODEL_ID, e))?;

    Ok(Json(StoryResponse {
        title: generated.title,
        story: generated.body,
    }))
}

pub async fn list_foundation_models(
    State(state): State<AppState>,
) -> Result<Json<Vec<ModelSummary>>, ApiError> {
    tracing::info!("Listing foundation models");

    let models = state.upstream.list_foundation_models().await.inspect_err(|e| {
        tracing::error!("list_foundation_models failed: kind={}, error={}", e.kind(), e)
    })?;

    tracing::info!("Successfully retrieved {} foundation models", models.len());
    Ok(Json(models))
}

pub async fn get_foundation_model(
    State(state): State<AppState>,
    Path(model_id): Path<String>,
) -> Result<Json<ModelDetails>, ApiError> {
    tracing::info!("Getting foundation model details for model_id: {}", model_id);

    let details = state
        .upstream
        .get_foundation_model(&model_id)
        .await
        .inspect_err(|e| {
            tracing::error!(
                "get_foundation_model failed for {}: kind={}, error={}",
                model_id,
                e.kind(),
                e
            )
        })?;

    Ok(Json(details))
}
