//! Scheduler status endpoint.
//!
//! GET /api/v1/status — per-instance scheduler state (last result, counters,
//! next scheduled refresh) as JSON.

use axum::extract::State;
use axum::Json;

use crate::services::scheduler::{InstanceStatus, SharedRegistry};

/// Get the current status of every pipeline instance.
#[utoipa::path(
    get,
    path = "/api/v1/status",
    tag = "Status",
    responses(
        (status = 200, description = "Per-instance scheduler status", body = [InstanceStatus]),
    )
)]
pub async fn get_status(State(registry): State<SharedRegistry>) -> Json<Vec<InstanceStatus>> {
    Json(registry.statuses().await)
}
