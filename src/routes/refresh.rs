//! Manual refresh triggers.
//!
//! Refreshes are delivered as wake-ups to the per-instance scheduler task,
//! so they serialize behind any in-flight cycle instead of racing it.

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::errors::AppError;
use crate::services::scheduler::SharedRegistry;

/// Refresh trigger response.
#[derive(Debug, Serialize, ToSchema)]
pub struct RefreshResponse {
    /// How many instances were woken for a refresh.
    pub notified: usize,
}

/// Force a refresh of every active instance.
#[utoipa::path(
    post,
    path = "/api/v1/refresh",
    tag = "Refresh",
    responses(
        (status = 202, description = "All instances woken for refresh", body = RefreshResponse),
    )
)]
pub async fn refresh_all(
    State(registry): State<SharedRegistry>,
) -> (axum::http::StatusCode, Json<RefreshResponse>) {
    let notified = registry.force_update_all();
    tracing::info!("Manual refresh requested for {} instance(s)", notified);
    (
        axum::http::StatusCode::ACCEPTED,
        Json(RefreshResponse { notified }),
    )
}

/// Force a refresh of one instance.
#[utoipa::path(
    post,
    path = "/api/v1/refresh/{instance_id}",
    tag = "Refresh",
    params(
        ("instance_id" = String, Path, description = "Pipeline instance identifier"),
    ),
    responses(
        (status = 202, description = "Instance woken for refresh", body = RefreshResponse),
        (status = 404, description = "Unknown instance", body = crate::errors::ErrorResponse),
    )
)]
pub async fn refresh_one(
    State(registry): State<SharedRegistry>,
    Path(instance_id): Path<String>,
) -> Result<(axum::http::StatusCode, Json<RefreshResponse>), AppError> {
    let instance = registry
        .get(&instance_id)
        .ok_or_else(|| AppError::NotFound(format!("No instance '{}'", instance_id)))?;
    instance.request_refresh();
    tracing::info!("Manual refresh requested for instance {}", instance_id);
    Ok((
        axum::http::StatusCode::ACCEPTED,
        Json(RefreshResponse { notified: 1 }),
    ))
}
