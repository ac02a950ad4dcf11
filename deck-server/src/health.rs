//! Health check endpoints.
//!
//! - `/health/live` - Liveness probe
//! - `/health/ready` - Readiness probe
//! - `/health` - Same as ready

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::AppState;

const PROBE_PRESENTATION: &str = "__health__";

/// Health status response.
#[derive(Debug, Serialize)]
pub struct HealthStatus {
    /// Overall status: "healthy" or "unhealthy"
    pub status: &'static str,
    /// Server version
    pub version: &'static str,
    /// Individual component checks
    pub checks: HealthChecks,
}

/// Individual health checks.
#[derive(Debug, Serialize)]
pub struct HealthChecks {
    /// At least one template is registered
    pub templates: bool,
    /// The default theme resolves
    pub themes: bool,
    /// Snapshot store answers reads
    pub store: bool,
}

impl HealthChecks {
    fn all_ok(&self) -> bool {
        self.templates && self.themes && self.store
    }
}

/// Liveness probe - is the server running?
#[tracing::instrument(name = "liveness_probe")]
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

/// Readiness probe - can views be opened?
#[tracing::instrument(name = "readiness_probe", skip(state))]
pub async fn readiness(State(state): State<AppState>) -> (StatusCode, Json<HealthStatus>) {
    let checks = HealthChecks {
        templates: !state.resolver.templates().is_empty(),
        themes: state
            .resolver
            .themes()
            .resolve(&state.default_theme)
            .is_some(),
        store: state.store.load(PROBE_PRESENTATION, 0).await.is_ok(),
    };
    let healthy = checks.all_ok();

    let status = HealthStatus {
        status: if healthy { "healthy" } else { "unhealthy" },
        version: env!("CARGO_PKG_VERSION"),
        checks,
    };
    let code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(status))
}
