//! Diagnostics endpoint.
//!
//! Exposes non-sensitive runtime details useful for support: the instance
//! configuration with the API key and location redacted, a sample of the
//! upstream request parameters, and a summary of the current snapshot.
//! No network I/O is performed.

use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::errors::AppError;
use crate::services::scheduler::SharedRegistry;
use crate::util::REDACTED;

/// Instance configuration with secrets and location masked.
#[derive(Debug, Serialize, ToSchema)]
pub struct DiagnosticsConfig {
    pub forecast_days: u8,
    pub language: Option<String>,
    pub create_d1: bool,
    pub create_d2: bool,
    pub update_interval_hours: u64,
}

/// Example of the upstream request query, fully redacted.
#[derive(Debug, Serialize, ToSchema)]
pub struct RequestParamsExample {
    pub key: String,
    #[serde(rename = "location.latitude")]
    pub latitude: String,
    #[serde(rename = "location.longitude")]
    pub longitude: String,
    pub days: u8,
    #[serde(rename = "languageCode", skip_serializing_if = "Option::is_none")]
    pub language_code: Option<String>,
}

/// Diagnostics response for one instance.
#[derive(Debug, Serialize, ToSchema)]
pub struct DiagnosticsResponse {
    pub instance_id: String,
    pub config: DiagnosticsConfig,
    pub request_params_example: RequestParamsExample,
    pub last_updated: Option<DateTime<Utc>>,
    /// Keys of the current sensor map; values are omitted to keep the
    /// payload small and location-neutral.
    pub sensor_keys: Vec<String>,
}

/// Get diagnostics for one instance, with secrets redacted.
#[utoipa::path(
    get,
    path = "/api/v1/diagnostics/{instance_id}",
    tag = "Diagnostics",
    params(
        ("instance_id" = String, Path, description = "Pipeline instance identifier"),
    ),
    responses(
        (status = 200, description = "Redacted diagnostics", body = DiagnosticsResponse),
        (status = 404, description = "Unknown instance", body = crate::errors::ErrorResponse),
    )
)]
pub async fn get_diagnostics(
    State(registry): State<SharedRegistry>,
    Path(instance_id): Path<String>,
) -> Result<Json<DiagnosticsResponse>, AppError> {
    let instance = registry
        .get(&instance_id)
        .ok_or_else(|| AppError::NotFound(format!("No instance '{}'", instance_id)))?;

    let config = &instance.config;
    let snapshot = instance.snapshot().await;

    Ok(Json(DiagnosticsResponse {
        instance_id: config.instance_id.clone(),
        config: DiagnosticsConfig {
            forecast_days: config.forecast_days,
            language: config.language.clone(),
            create_d1: config.sensor_mode.create_d1(),
            create_d2: config.sensor_mode.create_d2(),
            update_interval_hours: config.update_interval_hours,
        },
        request_params_example: RequestParamsExample {
            key: REDACTED.to_string(),
            latitude: REDACTED.to_string(),
            longitude: REDACTED.to_string(),
            days: config.forecast_days,
            language_code: config.language.clone(),
        },
        last_updated: snapshot.last_updated,
        sensor_keys: snapshot.sensors.keys().cloned().collect(),
    }))
}
