//! Health check handler

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;
use utoipa::ToSchema;

use super::super::state::HealthProbe;

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    #[schema(example = "ok")]
    pub status: String,
    #[schema(example = "0.1.0")]
    pub version: String,
    #[schema(example = "a1b2c3d")]
    pub git_hash: String,
}

/// Health check endpoint
///
/// Checks the service's own store only, never its upstreams.
///
/// - Healthy: 200 OK + {status: "ok", version, git_hash}
/// - Unhealthy: 503 Service Unavailable + {status: "unavailable", ...}
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service healthy", body = HealthResponse),
        (status = 503, description = "Store unreachable", body = HealthResponse)
    ),
    tag = "System"
)]
pub async fn health_check(
    State(probe): State<Arc<dyn HealthProbe>>,
) -> (StatusCode, Json<HealthResponse>) {
    let healthy = probe.healthy().await;
    let (status, label) = if healthy {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "unavailable")
    };

    (
        status,
        Json(HealthResponse {
            status: label.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            git_hash: env!("GIT_HASH").to_string(),
        }),
    )
}
