//! Health reporting for the data directory backing the store.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{Json, Router, extract::State, http::StatusCode, routing::get};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    fn status_code(self) -> StatusCode {
        match self {
            HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
            HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthCheckResult {
    pub status: HealthStatus,
    pub description: String,
}

impl HealthCheckResult {
    fn healthy(description: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Healthy,
            description: description.into(),
        }
    }

    fn degraded(description: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Degraded,
            description: description.into(),
        }
    }

    fn unhealthy(description: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Unhealthy,
            description: description.into(),
        }
    }
}

/// Checks that the directory holding the data file exists and accepts writes,
/// and that the data file can be read when present.
#[derive(Debug, Clone)]
pub struct FileSystemHealthCheck {
    data_path: PathBuf,
}

impl FileSystemHealthCheck {
    pub const NAME: &'static str = "filesystem";

    pub fn new(data_path: impl Into<PathBuf>) -> Self {
        Self {
            data_path: data_path.into(),
        }
    }

    /// Runs the check. Touches the file system, so call it off the async runtime.
    pub fn check(&self) -> HealthCheckResult {
        let directory = match self.data_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => return HealthCheckResult::unhealthy("Data directory path is invalid"),
        };

        if !directory.is_dir() {
            if let Err(err) = fs::create_dir_all(directory) {
                return HealthCheckResult::unhealthy(format!(
                    "Cannot create data directory: {err}"
                ));
            }
        }

        let probe = directory.join(format!(
            "health-check-{}.tmp",
            uuid::Uuid::new_v4().simple()
        ));
        if let Err(err) = fs::write(&probe, "health check").and_then(|_| fs::remove_file(&probe)) {
            return HealthCheckResult::unhealthy(format!(
                "Data directory is not writable: {err}"
            ));
        }

        if self.data_path.exists() {
            if let Err(err) = fs::read_to_string(&self.data_path) {
                return HealthCheckResult::degraded(format!(
                    "Data file exists but is not readable: {err}"
                ));
            }
        }

        HealthCheckResult::healthy("File system is accessible and writable")
    }

    async fn check_in_background(self: Arc<Self>) -> HealthCheckResult {
        tokio::task::spawn_blocking(move || self.check())
            .await
            .unwrap_or_else(|err| {
                HealthCheckResult::unhealthy(format!("File system health check failed: {err}"))
            })
    }
}

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub checks: Vec<HealthCheckEntry>,
}

#[derive(Debug, Serialize)]
pub struct HealthCheckEntry {
    pub name: &'static str,
    pub status: HealthStatus,
    pub description: String,
}

#[tracing::instrument(skip(check))]
pub async fn health_handler(
    State(check): State<Arc<FileSystemHealthCheck>>,
) -> (StatusCode, Json<HealthReport>) {
    let result = check.check_in_background().await;
    if result.status != HealthStatus::Healthy {
        tracing::warn!("Health check {:?}: {}", result.status, result.description);
    }
    let report = HealthReport {
        status: result.status,
        checks: vec![HealthCheckEntry {
            name: FileSystemHealthCheck::NAME,
            status: result.status,
            description: result.description,
        }],
    };
    (report.status.status_code(), Json(report))
}

/// Handler for the readiness and liveness probes; replies with the bare status.
#[tracing::instrument(skip(check))]
pub async fn probe_handler(
    State(check): State<Arc<FileSystemHealthCheck>>,
) -> (StatusCode, String) {
    let result = check.check_in_background().await;
    (result.status.status_code(), format!("{:?}", result.status))
}

pub fn create_health_router(check: Arc<FileSystemHealthCheck>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/health/ready", get(probe_handler))
        .route("/health/live", get(probe_handler))
        .with_state(check)
}
