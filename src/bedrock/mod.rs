// Upstream model service binding
//
// Everything the proxy knows about the model-hosting service goes through the
// `UpstreamClient` trait so handlers and adapters can be driven by a fake in tests.

mod client;
mod types;

pub use client::{BedrockClient, BedrockFactory, TOKEN_ENV};
pub use types::{ModelDetails, ModelSummary};

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use thiserror::Error;

/// Provider code for a denied request.
pub const ACCESS_DENIED: &str = "AccessDeniedException";
/// Provider code for a model id that does not exist in the region.
pub const RESOURCE_NOT_FOUND: &str = "ResourceNotFoundException";

#[derive(Debug, Error)]
pub enum UpstreamError {
    /// Structured failure reported by the service itself.
    #[error("{code}: {message}")]
    Service {
        code: String,
        message: String,
        status: u16,
    },

    #[error("no credentials available: {0}")]
    CredentialsUnavailable(String),

    #[error("request to model service failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("could not decode model service response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl UpstreamError {
    pub fn service(code: impl Into<String>, message: impl Into<String>, status: u16) -> Self {
        Self::Service {
            code: code.into(),
            message: message.into(),
            status,
        }
    }

    /// The provider error code, if the service produced one.
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Service { code, .. } => Some(code),
            _ => None,
        }
    }

    /// Short name of the failure kind, used when no provider code exists.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Service { .. } => "ClientError",
            Self::CredentialsUnavailable(_) => "CredentialsUnavailable",
            Self::Transport(_) => "TransportError",
            Self::Decode(_) => "DecodeError",
        }
    }

    /// The message without the code prefix.
    pub fn message(&self) -> String {
        match self {
            Self::Service { message, .. } => message.clone(),
            Self::CredentialsUnavailable(msg) => msg.clone(),
            Self::Transport(e) => e.to_string(),
            Self::Decode(e) => e.to_string(),
        }
    }

    pub fn is_access_denied(&self) -> bool {
        self.code() == Some(ACCESS_DENIED)
    }

    pub fn is_not_found(&self) -> bool {
        self.code() == Some(RESOURCE_NOT_FOUND)
    }
}

/// Network client for the model-hosting service.
#[async_trait]
pub trait UpstreamClient: Send + Sync {
    /// Invoke a model with an already encoded request body and return the raw response body.
    async fn invoke_model(&self, model_id: &str, body: Bytes) -> Result<Bytes, UpstreamError>;

    async fn list_foundation_models(&self) -> Result<Vec<ModelSummary>, UpstreamError>;

    async fn get_foundation_model(&self, model_id: &str) -> Result<ModelDetails, UpstreamError>;
}

/// Builds clients bound to a region, used by the diagnostics endpoints.
pub trait UpstreamFactory: Send + Sync {
    fn client_for_region(&self, region: &str) -> Result<Arc<dyn UpstreamClient>, UpstreamError>;
}
