// Health diagnostics: reachability of the model service and per-model access checks
//
// Both checks report failures as data instead of raising; the HTTP layer decides
// which of them escalate to an error status.

use serde::Serialize;

use crate::bedrock::{ModelDetails, ModelSummary, UpstreamError, UpstreamFactory};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

/// One problem found while checking.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DiagnosticError {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl DiagnosticError {
    fn guidance(message: String) -> Self {
        Self {
            kind: "Guidance".to_string(),
            code: None,
            message,
            details: None,
        }
    }
}

impl From<&UpstreamError> for DiagnosticError {
    fn from(err: &UpstreamError) -> Self {
        match err {
            UpstreamError::Service { code, message, .. } => Self {
                kind: err.kind().to_string(),
                code: Some(code.clone()),
                message: message.clone(),
                details: None,
            },
            UpstreamError::CredentialsUnavailable(msg) => Self {
                kind: err.kind().to_string(),
                code: None,
                message: "No credentials found for the model service".to_string(),
                details: Some(msg.clone()),
            },
            other => Self {
                kind: other.kind().to_string(),
                code: None,
                message: other.message(),
                details: None,
            },
        }
    }
}

/// Trimmed model entry listed in the health report.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AvailableModel {
    pub model_id: String,
    pub model_name: Option<String>,
    pub provider_name: Option<String>,
    pub input_modalities: Vec<String>,
    pub output_modalities: Vec<String>,
}

impl From<ModelSummary> for AvailableModel {
    fn from(summary: ModelSummary) -> Self {
        Self {
            model_id: summary.model_id,
            model_name: summary.model_name,
            provider_name: summary.provider_name,
            input_modalities: summary.input_modalities,
            output_modalities: summary.output_modalities,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub status: HealthStatus,
    pub region: String,
    pub client_initialized: bool,
    pub available_models: Vec<AvailableModel>,
    pub model_count: usize,
    pub errors: Vec<DiagnosticError>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelValidation {
    pub model_id: String,
    pub accessible: bool,
    pub region: String,
    pub model_details: Option<ModelDetails>,
    pub errors: Vec<DiagnosticError>,
}

impl ModelValidation {
    /// The provider code of the first failure, if any.
    pub fn failure_code(&self) -> Option<&str> {
        self.errors.iter().find_map(|e| e.code.as_deref())
    }
}

pub async fn check_health(factory: &dyn UpstreamFactory, region: &str) -> HealthReport {
    let mut report = HealthReport {
        status: HealthStatus::Healthy,
        region: region.to_string(),
        client_initialized: false,
        available_models: Vec::new(),
        model_count: 0,
        errors: Vec::new(),
    };

    tracing::info!("Initializing model service client for health check in region: {}", region);
    let result = match factory.client_for_region(region) {
        Ok(client) => {
            report.client_initialized = true;
            client.list_foundation_models().await
        }
        Err(e) => Err(e),
    };

    match result {
        Ok(models) => {
            report.model_count = models.len();
            report.available_models = models.into_iter().map(AvailableModel::from).collect();
            tracing::info!("Successfully retrieved {} foundation models", report.model_count);
        }
        Err(e) => {
            tracing::error!("Health check against {} failed: {}", region, e);
            report.status = HealthStatus::Unhealthy;
            report.errors.push(DiagnosticError::from(&e));
        }
    }

    report
}

pub async fn validate_model(factory: &dyn UpstreamFactory, model_id: &str, region: &str) -> ModelValidation {
    let mut validation = ModelValidation {
        model_id: model_id.to_string(),
        accessible: false,
        region: region.to_string(),
        model_details: None,
        errors: Vec::new(),
    };

    tracing::info!("Validating model access for model_id: {} in region: {}", model_id, region);
    let result = match factory.client_for_region(region) {
        Ok(client) => client.get_foundation_model(model_id).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(details) => {
            validation.accessible = true;
            validation.model_details = Some(details);
            tracing::info!("Model {} is accessible", model_id);
        }
        Err(e) => {
            tracing::error!("Model validation for {} failed: {}", model_id, e);
            validation.errors.push(DiagnosticError::from(&e));
            if e.is_not_found() {
                validation.errors.push(DiagnosticError::guidance(format!(
                    "Model '{}' not found. It may not exist, not be available in region '{}', or model access may not be enabled.",
                    model_id, region
                )));
            } else if e.is_access_denied() {
                validation.errors.push(DiagnosticError::guidance(format!(
                    "Access denied to model '{}'. Check permissions for the GetFoundationModel action.",
                    model_id
                )));
            }
        }
    }

    validation
}
