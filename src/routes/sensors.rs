//! Published sensor map endpoint.
//!
//! GET /api/v1/sensors/:instance_id — the current snapshot for one location:
//! the full sensor map plus its last-updated timestamp. Reads the in-memory
//! snapshot only; never triggers a fetch.

use axum::extract::{Path, State};
use axum::Json;

use crate::api::sensor::Snapshot;
use crate::errors::AppError;
use crate::services::scheduler::SharedRegistry;

/// Get the current sensor snapshot for one instance.
#[utoipa::path(
    get,
    path = "/api/v1/sensors/{instance_id}",
    tag = "Sensors",
    params(
        ("instance_id" = String, Path, description = "Pipeline instance identifier"),
    ),
    responses(
        (status = 200, description = "Current sensor map and last-updated timestamp", body = Object),
        (status = 404, description = "Unknown instance", body = crate::errors::ErrorResponse),
    )
)]
pub async fn get_sensors(
    State(registry): State<SharedRegistry>,
    Path(instance_id): Path<String>,
) -> Result<Json<Snapshot>, AppError> {
    let instance = registry
        .get(&instance_id)
        .ok_or_else(|| AppError::NotFound(format!("No instance '{}'", instance_id)))?;
    Ok(Json(instance.snapshot().await))
}
