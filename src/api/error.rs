// HTTP error responses

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::bedrock::UpstreamError;
use crate::error::{classify, classify_upstream, Classified, ExternalStatus};
use crate::invoke::InvokeError;

/// Error returned by route handlers, rendered as `{"detail": "..."}`.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub detail: String,
}

impl ApiError {
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }
}

fn status_code(status: ExternalStatus) -> StatusCode {
    match status {
        ExternalStatus::Forbidden => StatusCode::FORBIDDEN,
        ExternalStatus::NotFound => StatusCode::NOT_FOUND,
        ExternalStatus::BadRequest => StatusCode::BAD_REQUEST,
        ExternalStatus::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<Classified> for ApiError {
    fn from(classified: Classified) -> Self {
        Self::new(status_code(classified.status), classified.detail)
    }
}

impl From<InvokeError> for ApiError {
    fn from(err: InvokeError) -> Self {
        classify(&err).into()
    }
}

impl From<UpstreamError> for ApiError {
    fn from(err: UpstreamError) -> Self {
        classify_upstream(&err).into()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::warn!("Rejected request body: {}", rejection.body_text());
        Self::new(rejection.status(), rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}
