// HTTP API Server module

use anyhow::Result;
use axum::{
    http::{HeaderName, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{AllowHeaders, AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod error;
mod handlers;
mod health;

pub use error::ApiError;

use crate::bedrock::{BedrockClient, BedrockFactory, UpstreamClient, UpstreamFactory};
use crate::config::{AppConfig, CorsConfig};
use crate::invoke::{chat_dispatcher, image_dispatcher, story_dispatcher, text_dispatcher, Dispatcher};

/// Shared, read-only state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub upstream: Arc<dyn UpstreamClient>,
    pub factory: Arc<dyn UpstreamFactory>,
    pub chat: Dispatcher,
    pub text: Dispatcher,
    pub image: Dispatcher,
    pub story: Dispatcher,
    pub default_region: String,
}

impl AppState {
    pub fn new(
        upstream: Arc<dyn UpstreamClient>,
        factory: Arc<dyn UpstreamFactory>,
        default_region: impl Into<String>,
    ) -> Self {
        Self {
            chat: chat_dispatcher(upstream.clone()),
            text: text_dispatcher(upstream.clone()),
            image: image_dispatcher(upstream.clone()),
            story: story_dispatcher(upstream.clone()),
            upstream,
            factory,
            default_region: default_region.into(),
        }
    }

    /// State backed by the real model service, as described by `config`.
    pub fn from_config(config: &AppConfig) -> Self {
        let client = BedrockClient::from_config(&config.upstream, &config.region);
        if !client.has_credentials() {
            tracing::warn!(
                "No model service credentials configured; invoke routes will fail until {} is set",
                crate::bedrock::TOKEN_ENV
            );
        }
        let factory = BedrockFactory::new(config.upstream.clone());
        Self::new(Arc::new(client), Arc::new(factory), config.region.clone())
    }
}

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let origins = if config.allowed_origins.iter().any(|o| o == "*") {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(
            config
                .allowed_origins
                .iter()
                .filter_map(|o| HeaderValue::from_str(o).ok()),
        )
    };

    let headers = if config.allowed_headers.iter().any(|h| h == "*") {
        AllowHeaders::from(Any)
    } else {
        AllowHeaders::list(
            config
                .allowed_headers
                .iter()
                .filter_map(|h| HeaderName::from_bytes(h.as_bytes()).ok()),
        )
    };

    let methods: Vec<Method> = config
        .allowed_methods
        .iter()
        .filter_map(|m| Method::from_bytes(m.to_uppercase().as_bytes()).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(methods)
        .allow_headers(headers)
}

pub fn router(state: AppState, cors: &CorsConfig) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/api/health", get(health::health_check))
        .route("/api/health/model/:model_id", get(health::validate_model))
        .route("/foundation-models", get(handlers::list_foundation_models))
        .route("/foundation-models/model/:model_id", get(handlers::get_foundation_model))
        .route("/foundation-models/model/chat/:model_id/invoke", post(handlers::invoke_chat))
        .route("/foundation-models/model/text/:model_id/invoke", post(handlers::invoke_text))
        .route("/foundation-models/model/image/:model_id/invoke", post(handlers::invoke_image))
        .route("/story-playground/generate", post(handlers::generate_story))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(cors))
        .with_state(state)
}

pub async fn start_server(config: AppConfig) -> Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let app = router(AppState::from_config(&config), &config.cors);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("API server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
            }
        })
        .await?;

    tracing::info!("API server stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bedrock::{ModelDetails, ModelSummary, UpstreamError, ACCESS_DENIED, RESOURCE_NOT_FOUND};
    use crate::invoke::{CHAT_MODEL_ID, CLAUDE_TEXT_MODEL_ID, JURASSIC_MID_MODEL_ID, SDXL_MODEL_ID, STORY_MODEL_ID};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use bytes::Bytes;
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use std::sync::Mutex;
    use tower::ServiceExt;

    #[derive(Clone)]
    enum Reply {
        Ok(Value),
        Fail(&'static str, u16),
    }

    impl Reply {
        fn error(code: &'static str, status: u16) -> UpstreamError {
            UpstreamError::service(code, format!("{} from upstream", code), status)
        }
    }

    struct FakeUpstream {
        reply: Reply,
        calls: Mutex<Vec<(String, Value)>>,
    }

    impl FakeUpstream {
        fn new(reply: Reply) -> Arc<Self> {
            Arc::new(Self {
                reply,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<(String, Value)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl UpstreamClient for FakeUpstream {
        async fn invoke_model(&self, model_id: &str, body: Bytes) -> Result<Bytes, UpstreamError> {
            let payload: Value = serde_json::from_slice(&body).unwrap();
            self.calls.lock().unwrap().push((model_id.to_string(), payload));
            match &self.reply {
                Reply::Ok(value) => Ok(Bytes::from(value.to_string())),
                Reply::Fail(code, status) => Err(Reply::error(code, *status)),
            }
        }

        async fn list_foundation_models(&self) -> Result<Vec<ModelSummary>, UpstreamError> {
            match &self.reply {
                Reply::Ok(_) => Ok(vec![ModelSummary {
                    model_id: JURASSIC_MID_MODEL_ID.to_string(),
                    model_name: Some("Jurassic-2 Mid".to_string()),
                    ..ModelSummary::default()
                }]),
                Reply::Fail(code, status) => Err(Reply::error(code, *status)),
            }
        }

        async fn get_foundation_model(&self, model_id: &str) -> Result<ModelDetails, UpstreamError> {
            match &self.reply {
                Reply::Ok(_) => Ok(ModelDetails {
                    model_id: model_id.to_string(),
                    ..ModelDetails::default()
                }),
                Reply::Fail(code, status) => Err(Reply::error(code, *status)),
            }
        }
    }

    struct FakeFactory(Option<Arc<FakeUpstream>>);

    impl UpstreamFactory for FakeFactory {
        fn client_for_region(&self, _region: &str) -> Result<Arc<dyn UpstreamClient>, UpstreamError> {
            match &self.0 {
                Some(client) => Ok(client.clone()),
                None => Err(UpstreamError::CredentialsUnavailable("token not set".to_string())),
            }
        }
    }

    fn app(upstream: Arc<FakeUpstream>) -> Router {
        let factory = FakeFactory(Some(upstream.clone()));
        router(
            AppState::new(upstream, Arc::new(factory), "us-east-1"),
            &CorsConfig::default(),
        )
    }

    async fn send(app: Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => request
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    fn claude_reply(text: &str) -> Reply {
        Reply::Ok(json!({"content": [{"type": "text", "text": text}]}))
    }

    #[tokio::test]
    async fn test_unsupported_text_model_is_rejected_before_upstream() {
        let upstream = FakeUpstream::new(claude_reply("unused"));
        let (status, body) = send(
            app(upstream.clone()),
            "POST",
            "/foundation-models/model/text/meta.llama2-13b-chat-v1/invoke",
            Some(json!({"prompt": "hi", "temperature": 0.5, "maxTokens": 100})),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["detail"].as_str().unwrap().contains("meta.llama2-13b-chat-v1"));
        assert!(upstream.calls().is_empty());
    }

    #[tokio::test]
    async fn test_text_invoke_claude() {
        let upstream = FakeUpstream::new(claude_reply("Hello there"));
        let uri = format!("/foundation-models/model/text/{}/invoke", CLAUDE_TEXT_MODEL_ID);
        let (status, body) = send(
            app(upstream.clone()),
            "POST",
            &uri,
            Some(json!({"prompt": "Say hello", "temperature": 0.3, "maxTokens": 200})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"completion": "Hello there"}));

        let calls = upstream.calls();
        assert_eq!(calls[0].0, CLAUDE_TEXT_MODEL_ID);
        assert_eq!(calls[0].1["max_tokens"], 200);
        assert_eq!(calls[0].1["messages"][0]["content"], "Say hello");
    }

    #[tokio::test]
    async fn test_text_invoke_jurassic_strips_leading_newline() {
        let upstream = FakeUpstream::new(Reply::Ok(json!({
            "completions": [{"data": {"text": "\nOnce upon a time"}}]
        })));
        let uri = format!("/foundation-models/model/text/{}/invoke", JURASSIC_MID_MODEL_ID);
        let (status, body) = send(
            app(upstream.clone()),
            "POST",
            &uri,
            Some(json!({"prompt": "Begin", "temperature": 0.7, "maxTokens": 50})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["completion"], "Once upon a time");
        assert_eq!(upstream.calls()[0].1["maxTokens"], 50);
    }

    #[tokio::test]
    async fn test_out_of_range_temperature_is_bad_request() {
        let upstream = FakeUpstream::new(claude_reply("unused"));
        let uri = format!("/foundation-models/model/text/{}/invoke", CLAUDE_TEXT_MODEL_ID);
        let (status, _) = send(
            app(upstream.clone()),
            "POST",
            &uri,
            Some(json!({"prompt": "hi", "temperature": 1.5, "maxTokens": 10})),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(upstream.calls().is_empty());
    }

    #[tokio::test]
    async fn test_access_denied_is_forbidden() {
        let upstream = FakeUpstream::new(Reply::Fail(ACCESS_DENIED, 403));
        let uri = format!("/foundation-models/model/text/{}/invoke", CLAUDE_TEXT_MODEL_ID);
        let (status, body) = send(
            app(upstream),
            "POST",
            &uri,
            Some(json!({"prompt": "hi", "temperature": 0.5, "maxTokens": 10})),
        )
        .await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["detail"], "AccessDeniedException from upstream");
    }

    #[tokio::test]
    async fn test_other_service_error_is_internal_with_code() {
        let upstream = FakeUpstream::new(Reply::Fail("ThrottlingException", 429));
        let uri = format!("/foundation-models/model/chat/{}/invoke", CHAT_MODEL_ID);
        let (status, body) = send(app(upstream), "POST", &uri, Some(json!({"prompt": "hi"}))).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["detail"], "ThrottlingException: ThrottlingException from upstream");
    }

    #[tokio::test]
    async fn test_chat_uses_fixed_settings() {
        let upstream = FakeUpstream::new(claude_reply("Hi! How can I help?"));
        let uri = format!("/foundation-models/model/chat/{}/invoke", CHAT_MODEL_ID);
        let (status, body) = send(app(upstream.clone()), "POST", &uri, Some(json!({"prompt": "Hello"}))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["completion"], "Hi! How can I help?");

        let payload = &upstream.calls()[0].1;
        assert_eq!(payload["max_tokens"], 1024);
        assert_eq!(payload["temperature"], json!(0.8f32));
        assert!(payload["system"].as_str().unwrap().contains("friendly chat bot"));
    }

    #[tokio::test]
    async fn test_unsupported_chat_model_is_rejected_before_upstream() {
        let upstream = FakeUpstream::new(claude_reply("unused"));
        let (status, body) = send(
            app(upstream.clone()),
            "POST",
            "/foundation-models/model/chat/amazon.titan-text-express-v1/invoke",
            Some(json!({"prompt": "hi"})),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "Unsupported model: amazon.titan-text-express-v1");
        assert!(upstream.calls().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_body_uses_detail_shape() {
        let upstream = FakeUpstream::new(claude_reply("unused"));
        let uri = format!("/foundation-models/model/text/{}/invoke", CLAUDE_TEXT_MODEL_ID);

        let request = Request::builder()
            .method("POST")
            .uri(&uri)
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let response = app(upstream.clone()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert!(body["detail"].is_string());

        let (status, body) = send(app(upstream.clone()), "POST", &uri, Some(json!({"prompt": "hi"}))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["detail"].as_str().unwrap().contains("temperature"));

        let request = Request::builder()
            .method("POST")
            .uri(&uri)
            .body(Body::from(r#"{"prompt":"hi","temperature":0.5,"maxTokens":10}"#))
            .unwrap();
        let response = app(upstream.clone()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert!(body["detail"].is_string());

        assert!(upstream.calls().is_empty());
    }

    #[tokio::test]
    async fn test_image_invoke_returns_base64() {
        let upstream = FakeUpstream::new(Reply::Ok(json!({"artifacts": [{"base64": "aGVsbG8="}]})));
        let uri = format!("/foundation-models/model/image/{}/invoke", SDXL_MODEL_ID);
        let (status, body) = send(
            app(upstream.clone()),
            "POST",
            &uri,
            Some(json!({"prompt": "a lighthouse", "stylePreset": "anime"})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"imageByteArray": "aGVsbG8="}));
        assert_eq!(upstream.calls()[0].1["style_preset"], "anime");
    }

    #[tokio::test]
    async fn test_image_without_artifacts_is_internal() {
        let upstream = FakeUpstream::new(Reply::Ok(json!({"artifacts": []})));
        let uri = format!("/foundation-models/model/image/{}/invoke", SDXL_MODEL_ID);
        let (status, body) = send(app(upstream), "POST", &uri, Some(json!({"prompt": "x"}))).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["detail"].as_str().unwrap().starts_with("MalformedUpstreamResponse"));
    }

    #[tokio::test]
    async fn test_story_generation_splits_title() {
        let upstream = FakeUpstream::new(claude_reply("Title: The Last Map\n\nThe cartographer woke early."));
        let (status, body) = send(
            app(upstream.clone()),
            "POST",
            "/story-playground/generate",
            Some(json!({"theme": "Mystery", "genre": "Fantasy", "characters": 2, "length": "short"})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"title": "The Last Map", "story": "The cartographer woke early."}));

        let calls = upstream.calls();
        assert_eq!(calls[0].0, STORY_MODEL_ID);
        let prompt = calls[0].1["messages"][0]["content"].as_str().unwrap().to_string();
        assert!(prompt.contains("Fantasy genre with a Mystery theme"));
        assert!(prompt.contains("2 main characters"));
    }

    #[tokio::test]
    async fn test_story_defaults_apply_to_empty_body() {
        let upstream = FakeUpstream::new(claude_reply("A story with no title line."));
        let (status, body) = send(app(upstream.clone()), "POST", "/story-playground/generate", Some(json!({}))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["title"], "Untitled Story");
        assert_eq!(body["story"], "A story with no title line.");

        let payload = upstream.calls()[0].1.clone();
        assert_eq!(payload["max_tokens"], 1000);
        assert_eq!(payload["temperature"], json!(0.7f32));
        let prompt = payload["messages"][0]["content"].as_str().unwrap().to_string();
        assert!(prompt.contains("1 main character."));
        assert!(prompt.contains("medium-length story (about 1000 words)"));
    }

    #[tokio::test]
    async fn test_list_and_get_models() {
        let upstream = FakeUpstream::new(Reply::Ok(Value::Null));
        let (status, body) = send(app(upstream.clone()), "GET", "/foundation-models", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["modelId"], JURASSIC_MID_MODEL_ID);

        let uri = format!("/foundation-models/model/{}", SDXL_MODEL_ID);
        let (status, body) = send(app(upstream), "GET", &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["modelId"], SDXL_MODEL_ID);
    }

    #[tokio::test]
    async fn test_get_unknown_model_is_not_found() {
        let upstream = FakeUpstream::new(Reply::Fail(RESOURCE_NOT_FOUND, 404));
        let (status, _) = send(app(upstream), "GET", "/foundation-models/model/nope", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unhealthy_report_is_still_ok() {
        let upstream = FakeUpstream::new(Reply::Ok(Value::Null));
        let state = AppState::new(upstream, Arc::new(FakeFactory(None)), "us-east-1");
        let app = router(state, &CorsConfig::default());

        let (status, body) = send(app, "GET", "/api/health?region=eu-central-1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "unhealthy");
        assert_eq!(body["region"], "eu-central-1");
        assert_eq!(body["clientInitialized"], false);
        assert_eq!(body["errors"][0]["type"], "CredentialsUnavailable");
    }

    #[tokio::test]
    async fn test_healthy_report_counts_models() {
        let upstream = FakeUpstream::new(Reply::Ok(Value::Null));
        let (status, body) = send(app(upstream), "GET", "/api/health", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["region"], "us-east-1");
        assert_eq!(body["modelCount"], 1);
    }

    #[tokio::test]
    async fn test_model_validation_escalates_not_found_and_denied() {
        let upstream = FakeUpstream::new(Reply::Fail(RESOURCE_NOT_FOUND, 404));
        let (status, body) = send(app(upstream), "GET", "/api/health/model/nope?region=us-west-2", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(
            body["detail"],
            "Model 'nope' not found or not accessible in region 'us-west-2'"
        );

        let upstream = FakeUpstream::new(Reply::Fail(ACCESS_DENIED, 403));
        let (status, body) = send(app(upstream), "GET", "/api/health/model/locked", None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["detail"], "Access denied to model 'locked'");
    }

    #[tokio::test]
    async fn test_model_validation_other_failures_are_ok() {
        let upstream = FakeUpstream::new(Reply::Fail("ValidationException", 400));
        let (status, body) = send(app(upstream), "GET", "/api/health/model/odd", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["accessible"], false);
        assert_eq!(body["errors"][0]["code"], "ValidationException");
    }
}
