// Health check handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;

use super::{ApiError, AppState};
use crate::bedrock::{ACCESS_DENIED, RESOURCE_NOT_FOUND};
use crate::health::{self, HealthReport, HealthStatus, ModelValidation};

#[derive(Debug, Deserialize)]
pub struct RegionQuery {
    pub region: Option<String>,
}

impl RegionQuery {
    fn resolve(self, default_region: &str) -> String {
        self.region
            .filter(|r| !r.trim().is_empty())
            .unwrap_or_else(|| default_region.to_string())
    }
}

/// Always answers 200; an unreachable service shows up as `status: unhealthy`.
pub async fn health_check(
    State(state): State<AppState>,
    Query(query): Query<RegionQuery>,
) -> Json<HealthReport> {
    let region = query.resolve(&state.default_region);
    tracing::info!("Health check requested for region: {}", region);

    let report = health::check_health(state.factory.as_ref(), &region).await;
    match report.status {
        HealthStatus::Healthy => {
            tracing::info!("Health check passed: {} models available", report.model_count)
        }
        HealthStatus::Unhealthy => tracing::warn!("Health check failed: {:?}", report.errors),
    }

    Json(report)
}

/// Escalates not-found and access-denied to 404 and 403; other failures come back as 200.
pub async fn validate_model(
    State(state): State<AppState>,
    Path(model_id): Path<String>,
    Query(query): Query<RegionQuery>,
) -> Result<Json<ModelValidation>, ApiError> {
    let region = query.resolve(&state.default_region);
    tracing::info!("Model validation requested for model_id: {} in region: {}", model_id, region);

    let validation = health::validate_model(state.factory.as_ref(), &model_id, &region).await;
    if validation.accessible {
        tracing::info!("Model validation passed for {}", model_id);
        return Ok(Json(validation));
    }

    tracing::warn!("Model validation failed for {}: {:?}", model_id, validation.errors);
    match validation.failure_code() {
        Some(RESOURCE_NOT_FOUND) => Err(ApiError::new(
            StatusCode::NOT_FOUND,
            format!(
                "Model '{}' not found or not accessible in region '{}'",
                model_id, region
            ),
        )),
        Some(ACCESS_DENIED) => Err(ApiError::new(
            StatusCode::FORBIDDEN,
            format!("Access denied to model '{}'", model_id),
        )),
        _ => Ok(Json(validation)),
    }
}
