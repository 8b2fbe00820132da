//! Per-location update pipelines and the process-level registry.
//!
//! Each configured location owns one [`Instance`]: a fetch client, the
//! published snapshot, and status bookkeeping. One tokio task per instance
//! runs fetch → normalize → publish on the configured interval; a
//! [`tokio::sync::Notify`] wakes it early for manual refreshes. Because a
//! single task drives each instance, at most one fetch is ever in flight per
//! location and no locking beyond the snapshot swap is needed.
//!
//! The [`Registry`] is the explicit collection of active instances owned by
//! the process orchestrator; the force-update path iterates it instead of
//! relying on any global mutable state.

use chrono::{DateTime, Duration, Utc};
use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{Notify, RwLock};
use utoipa::ToSchema;

use crate::api::sensor::{SensorMap, Snapshot};
use crate::config::LocationConfig;
use crate::errors::FetchError;
use crate::services::client::PollenClient;
use crate::services::normalize::{normalize, NormalizeOptions};

/// Status of one pipeline instance, exposed via the status endpoint.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct InstanceStatus {
    pub instance_id: String,
    /// "pending", "success", "auth_failed", or "error: ..."
    pub last_result: String,
    pub last_attempt_at: Option<DateTime<Utc>>,
    pub last_success_at: Option<DateTime<Utc>>,
    pub next_refresh_at: Option<DateTime<Utc>>,
    pub total_updates: u64,
    pub sensor_count: usize,
}

impl InstanceStatus {
    fn pending(instance_id: &str) -> Self {
        Self {
            instance_id: instance_id.to_string(),
            last_result: "pending".to_string(),
            last_attempt_at: None,
            last_success_at: None,
            next_refresh_at: None,
            total_updates: 0,
            sensor_count: 0,
        }
    }
}

/// One location's update pipeline: config, client, snapshot, status.
pub struct Instance {
    pub config: LocationConfig,
    client: PollenClient,
    snapshot: RwLock<Snapshot>,
    status: RwLock<InstanceStatus>,
    refresh: Notify,
}

impl Instance {
    pub fn new(config: LocationConfig, api_key: &str, referrer: Option<&str>) -> Self {
        let client = PollenClient::new(api_key).with_referrer(referrer);
        Self::with_client(config, client)
    }

    /// Build an instance around an existing client (tests point the client
    /// at a mock server).
    pub fn with_client(config: LocationConfig, client: PollenClient) -> Self {
        let status = InstanceStatus::pending(&config.instance_id);
        Self {
            config,
            client,
            snapshot: RwLock::new(Snapshot::default()),
            status: RwLock::new(status),
            refresh: Notify::new(),
        }
    }

    pub async fn snapshot(&self) -> Snapshot {
        self.snapshot.read().await.clone()
    }

    pub async fn status(&self) -> InstanceStatus {
        self.status.read().await.clone()
    }

    /// Wake the scheduler task for an out-of-band refresh. The permit is
    /// consumed at the task's next wait point, so a refresh requested while
    /// a cycle is in flight runs after it, never concurrently.
    pub fn request_refresh(&self) {
        self.refresh.notify_one();
    }

    fn normalize_options(&self) -> NormalizeOptions {
        NormalizeOptions {
            forecast_days: self.config.forecast_days,
            create_d1: self.config.sensor_mode.create_d1(),
            create_d2: self.config.sensor_mode.create_d2(),
        }
    }

    /// One fetch → normalize → publish cycle. A failed fetch leaves the
    /// previous snapshot untouched.
    pub async fn run_cycle(&self) -> Result<usize, FetchError> {
        {
            let mut s = self.status.write().await;
            s.last_attempt_at = Some(Utc::now());
        }

        let result = self
            .client
            .fetch(
                self.config.latitude,
                self.config.longitude,
                self.config.forecast_days,
                self.config.language.as_deref(),
            )
            .await;

        let payload = match result {
            Ok(p) => p,
            Err(err) => {
                // Messages in FetchError are already credential-redacted.
                tracing::error!("Instance {}: update failed: {}", self.config.instance_id, err);
                let mut s = self.status.write().await;
                s.last_result = match &err {
                    FetchError::Auth(_) => "auth_failed".to_string(),
                    other => format!("error: {}", other),
                };
                return Err(err);
            }
        };

        let sensors = normalize(&payload, &self.normalize_options());
        let count = sensors.len();

        if tracing::enabled!(tracing::Level::DEBUG) {
            let (types, plants, meta, per_day) = summarize(&sensors);
            tracing::debug!(
                "Instance {}: update complete: entries={} types={} plants={} meta={} per_day={}",
                self.config.instance_id,
                count,
                types,
                plants,
                meta,
                per_day,
            );
        }

        {
            let mut snap = self.snapshot.write().await;
            *snap = Snapshot {
                sensors,
                last_updated: Some(Utc::now()),
            };
        }
        {
            let mut s = self.status.write().await;
            s.last_result = "success".to_string();
            s.last_success_at = Some(Utc::now());
            s.total_updates += 1;
            s.sensor_count = count;
        }

        Ok(count)
    }
}

/// Count entries per source tag plus per-day siblings, for the debug summary.
fn summarize(sensors: &SensorMap) -> (usize, usize, usize, usize) {
    let mut types = 0;
    let mut plants = 0;
    let mut meta = 0;
    let mut per_day = 0;
    for (key, record) in sensors {
        match record.source() {
            "type" => types += 1,
            "plant" => plants += 1,
            _ => meta += 1,
        }
        if key.ends_with("_d1") || key.ends_with("_d2") {
            per_day += 1;
        }
    }
    (types, plants, meta, per_day)
}

/// Run one instance's scheduler loop. Never returns; spawn via
/// `tokio::spawn(run_instance(...))`.
pub async fn run_instance(instance: Arc<Instance>) {
    let interval =
        std::time::Duration::from_secs(instance.config.update_interval_hours * 3600);
    tracing::info!(
        "Scheduler started for instance {} (interval {}h)",
        instance.config.instance_id,
        instance.config.update_interval_hours,
    );

    loop {
        let _ = instance.run_cycle().await;

        {
            let mut s = instance.status.write().await;
            s.next_refresh_at =
                Some(Utc::now() + Duration::seconds(interval.as_secs() as i64));
        }

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = instance.refresh.notified() => {
                tracing::info!(
                    "Instance {}: manual refresh requested",
                    instance.config.instance_id,
                );
            }
        }
    }
}

/// Explicit collection of active pipeline instances, fixed at startup.
pub struct Registry {
    instances: Vec<Arc<Instance>>,
}

impl Registry {
    pub fn new(instances: Vec<Arc<Instance>>) -> Self {
        Self { instances }
    }

    pub fn get(&self, instance_id: &str) -> Option<&Arc<Instance>> {
        self.instances
            .iter()
            .find(|i| i.config.instance_id == instance_id)
    }

    /// Wake every instance for an out-of-band refresh; returns how many were
    /// notified.
    pub fn force_update_all(&self) -> usize {
        for instance in &self.instances {
            instance.request_refresh();
        }
        self.instances.len()
    }

    pub async fn statuses(&self) -> Vec<InstanceStatus> {
        join_all(self.instances.iter().map(|i| i.status())).await
    }
}

/// Shared registry handle.
pub type SharedRegistry = Arc<Registry>;
