//! Health, readiness, statistics and caller introspection endpoints.
//!
//! # Endpoints
//!
//! - `GET /health` - Liveness with service version
//! - `GET /ready` - Readiness probe (503 once shutdown has begun)
//! - `GET /stats` - Record counts and uptime
//! - `GET /me` - The caller as the server resolved it
//!
//! `/health` and `/ready` never consume `apiCall` quota.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use chrono::Utc;
use tracing::instrument;

use crate::identity::Caller;
use crate::models::{HealthResponse, MeResponse, StatsResponse};
use crate::quota::{Operation, derive_key};
use crate::state::AppState;

/// Health check endpoint.
///
/// # Response Body
///
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "timestamp": "2024-01-15T10:30:00Z"
/// }
/// ```
#[instrument(skip_all)]
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
    })
}

/// Readiness check endpoint for Kubernetes probes.
///
/// Returns 200 OK while serving, 503 Service Unavailable once graceful
/// shutdown has been signalled.
#[instrument(skip(state))]
pub async fn readiness_check(State(state): State<AppState>) -> Result<StatusCode, StatusCode> {
    if state.is_shutting_down() {
        Err(StatusCode::SERVICE_UNAVAILABLE)
    } else {
        Ok(StatusCode::OK)
    }
}

#[instrument(skip(state))]
pub async fn stats(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse {
        messages_count: state.messages.count().await,
        files_count: state.files.count().await,
        admins_count: state.admin_policy().admins().len(),
        tracked_quota_keys: Operation::ALL
            .iter()
            .map(|&operation| state.gate.tracked_keys(operation))
            .sum(),
        uptime_seconds: state.uptime_seconds(),
    })
}

/// Resolve the caller. Clients use this to guard pages that need a
/// signed-in user; anonymous callers get `authenticated: false`.
#[instrument(skip_all)]
pub async fn me(caller: Caller) -> Json<MeResponse> {
    let quota_key = derive_key(caller.principal()).as_str().to_string();

    Json(MeResponse {
        authenticated: caller.is_authenticated(),
        display_name: caller.display_name().to_string(),
        quota_key,
        principal: caller.into_principal(),
    })
}
