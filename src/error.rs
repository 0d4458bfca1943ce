// Error classification: maps invocation failures to externally visible statuses

use crate::bedrock::{UpstreamError, ACCESS_DENIED, RESOURCE_NOT_FOUND};
use crate::invoke::InvokeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExternalStatus {
    Forbidden,
    NotFound,
    BadRequest,
    Internal,
}

impl ExternalStatus {
    pub fn as_u16(self) -> u16 {
        match self {
            Self::Forbidden => 403,
            Self::NotFound => 404,
            Self::BadRequest => 400,
            Self::Internal => 500,
        }
    }
}

/// Outcome of classifying an error: the status plus the detail shown to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classified {
    pub status: ExternalStatus,
    pub detail: String,
}

impl Classified {
    fn new(status: ExternalStatus, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }
}

/// Classify an upstream failure. First match wins; messages are passed through verbatim.
pub fn classify_upstream(error: &UpstreamError) -> Classified {
    match error {
        UpstreamError::Service { code, message, .. } if code == ACCESS_DENIED => {
            Classified::new(ExternalStatus::Forbidden, message.clone())
        }
        UpstreamError::Service { code, message, .. } if code == RESOURCE_NOT_FOUND => {
            Classified::new(ExternalStatus::NotFound, message.clone())
        }
        UpstreamError::Service { code, message, .. } => {
            Classified::new(ExternalStatus::Internal, format!("{}: {}", code, message))
        }
        other => Classified::new(
            ExternalStatus::Internal,
            format!("{}: {}", other.kind(), other.message()),
        ),
    }
}

pub fn classify(error: &InvokeError) -> Classified {
    match error {
        InvokeError::Upstream(inner) => classify_upstream(inner),
        InvokeError::UnsupportedModel(_) | InvokeError::InvalidRequest(_) => {
            Classified::new(ExternalStatus::BadRequest, error.to_string())
        }
        InvokeError::MalformedResponse(reason) => {
            Classified::new(ExternalStatus::Internal, format!("{}: {}", error.kind(), reason))
        }
        InvokeError::Encode(source) => {
            Classified::new(ExternalStatus::Internal, format!("{}: {}", error.kind(), source))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_denied_is_forbidden() {
        let err = InvokeError::Upstream(UpstreamError::service(
            ACCESS_DENIED,
            "You don't have access to the model with the specified model ID.",
            403,
        ));
        let classified = classify(&err);
        assert_eq!(classified.status, ExternalStatus::Forbidden);
        assert_eq!(
            classified.detail,
            "You don't have access to the model with the specified model ID."
        );
    }

    #[test]
    fn test_not_found_is_not_found() {
        let err = UpstreamError::service(RESOURCE_NOT_FOUND, "Model not found", 404);
        assert_eq!(classify_upstream(&err).status, ExternalStatus::NotFound);
    }

    #[test]
    fn test_other_code_keeps_code_and_message() {
        let err = UpstreamError::service("ThrottlingException", "Too many requests, please wait", 429);
        let classified = classify_upstream(&err);
        assert_eq!(classified.status, ExternalStatus::Internal);
        assert_eq!(classified.detail, "ThrottlingException: Too many requests, please wait");
    }

    #[test]
    fn test_non_provider_error_keeps_kind_and_message() {
        let err = InvokeError::malformed("messages response has no content");
        let classified = classify(&err);
        assert_eq!(classified.status, ExternalStatus::Internal);
        assert_eq!(
            classified.detail,
            "MalformedUpstreamResponse: messages response has no content"
        );

        let err = UpstreamError::CredentialsUnavailable("no bearer token configured".to_string());
        assert_eq!(
            classify_upstream(&err).detail,
            "CredentialsUnavailable: no bearer token configured"
        );
    }

    #[test]
    fn test_unsupported_model_is_bad_request() {
        let classified = classify(&InvokeError::UnsupportedModel("foo.bar-v1".to_string()));
        assert_eq!(classified.status, ExternalStatus::BadRequest);
        assert_eq!(classified.status.as_u16(), 400);
        assert_eq!(classified.detail, "Unsupported model: foo.bar-v1");
    }
}
