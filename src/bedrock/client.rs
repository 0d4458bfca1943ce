// Bedrock HTTP client for proxying requests

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use serde_json::Value;
use std::sync::Arc;

use super::types::{GetModelResponse, ListModelsResponse, ModelDetails, ModelSummary};
use super::{UpstreamClient, UpstreamError, UpstreamFactory, ACCESS_DENIED, RESOURCE_NOT_FOUND};
use crate::config::UpstreamConfig;

/// Environment variable holding the bearer token for the model service.
pub const TOKEN_ENV: &str = "AWS_BEARER_TOKEN_BEDROCK";

const RUNTIME_ENDPOINT: &str = "https://bedrock-runtime.{region}.amazonaws.com";
const CONTROL_ENDPOINT: &str = "https://bedrock.{region}.amazonaws.com";
const ERROR_TYPE_HEADER: &str = "x-amzn-errortype";

#[derive(Debug, Clone)]
pub struct BedrockClient {
    region: String,
    runtime_url: String,
    control_url: String,
    token: Option<String>,
    http_client: reqwest::Client,
}

fn endpoint(template: &str, region: &str) -> String {
    let mut url = template.replace("{region}", region);
    while url.ends_with('/') {
        url.pop();
    }
    url
}

impl BedrockClient {
    /// Build a client for `region`, honouring endpoint overrides from the config.
    pub fn from_config(config: &UpstreamConfig, region: &str) -> Self {
        let runtime = config.runtime_endpoint.as_deref().unwrap_or(RUNTIME_ENDPOINT);
        let control = config.control_endpoint.as_deref().unwrap_or(CONTROL_ENDPOINT);
        Self {
            region: region.to_string(),
            runtime_url: endpoint(runtime, region),
            control_url: endpoint(control, region),
            token: config.bearer_token.clone().filter(|t| !t.is_empty()),
            http_client: reqwest::Client::new(),
        }
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn has_credentials(&self) -> bool {
        self.token.is_some()
    }

    fn token(&self) -> Result<&str, UpstreamError> {
        self.token.as_deref().ok_or_else(|| {
            UpstreamError::CredentialsUnavailable(format!(
                "no bearer token configured; set {} or upstream.bearer-token",
                TOKEN_ENV
            ))
        })
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Bytes, UpstreamError> {
        let response = request
            .bearer_auth(self.token()?)
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;

        tracing::debug!(
            "Model service responded: status={}, request_id={:?}, bytes={}",
            status,
            headers.get("x-amzn-requestid"),
            body.len()
        );

        if !status.is_success() {
            return Err(decode_service_error(status, &headers, &body));
        }
        Ok(body)
    }
}

#[async_trait]
impl UpstreamClient for BedrockClient {
    async fn invoke_model(&self, model_id: &str, body: Bytes) -> Result<Bytes, UpstreamError> {
        let url = format!(
            "{}/model/{}/invoke",
            self.runtime_url,
            urlencoding::encode(model_id)
        );
        tracing::debug!("POST {} ({} bytes)", url, body.len());

        let request = self
            .http_client
            .post(&url)
            .header("Content-Type", "application/json")
            .body(body);
        self.send(request).await
    }

    async fn list_foundation_models(&self) -> Result<Vec<ModelSummary>, UpstreamError> {
        let url = format!("{}/foundation-models", self.control_url);
        tracing::debug!("GET {}", url);

        let body = self.send(self.http_client.get(&url)).await?;
        let parsed: ListModelsResponse = serde_json::from_slice(&body)?;
        Ok(parsed.model_summaries)
    }

    async fn get_foundation_model(&self, model_id: &str) -> Result<ModelDetails, UpstreamError> {
        let url = format!(
            "{}/foundation-models/{}",
            self.control_url,
            urlencoding::encode(model_id)
        );
        tracing::debug!("GET {}", url);

        let body = self.send(self.http_client.get(&url)).await?;
        let parsed: GetModelResponse = serde_json::from_slice(&body)?;
        Ok(parsed.model_details)
    }
}

/// Creates `BedrockClient`s on demand for the diagnostics endpoints.
#[derive(Debug, Clone)]
pub struct BedrockFactory {
    config: UpstreamConfig,
}

impl BedrockFactory {
    pub fn new(config: UpstreamConfig) -> Self {
        Self { config }
    }
}

impl UpstreamFactory for BedrockFactory {
    fn client_for_region(&self, region: &str) -> Result<Arc<dyn UpstreamClient>, UpstreamError> {
        let client = BedrockClient::from_config(&self.config, region);
        // Missing credentials mean no client at all, not a failed call.
        client.token()?;
        Ok(Arc::new(client))
    }
}

/// Turn a non-2xx response into a structured service error.
pub(crate) fn decode_service_error(status: StatusCode, headers: &HeaderMap, body: &[u8]) -> UpstreamError {
    let parsed: Option<Value> = serde_json::from_slice(body).ok();

    let code = headers
        .get(ERROR_TYPE_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(':').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .or_else(|| {
            parsed
                .as_ref()
                .and_then(|b| b.get("__type"))
                .and_then(|t| t.as_str())
                .and_then(|t| t.rsplit('#').next())
                .map(|t| t.to_string())
                .filter(|t| !t.is_empty())
        })
        .unwrap_or_else(|| code_for_status(status).to_string());

    let message = parsed
        .as_ref()
        .and_then(|b| b.get("message").or_else(|| b.get("Message")))
        .and_then(|m| m.as_str())
        .map(|m| m.to_string())
        .unwrap_or_else(|| {
            let text = String::from_utf8_lossy(body).trim().to_string();
            if text.is_empty() {
                status.to_string()
            } else {
                text
            }
        });

    UpstreamError::service(code, message, status.as_u16())
}

fn code_for_status(status: StatusCode) -> &'static str {
    match status {
        StatusCode::FORBIDDEN => ACCESS_DENIED,
        StatusCode::NOT_FOUND => RESOURCE_NOT_FOUND,
        StatusCode::BAD_REQUEST => "ValidationException",
        StatusCode::TOO_MANY_REQUESTS => "ThrottlingException",
        _ => "InternalServerException",
    }
}
