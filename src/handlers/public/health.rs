use axum::extract::State;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub version: &'static str,
    pub timestamp: DateTime<Utc>,
    pub database: &'static str,
}

/// GET /health - liveness plus a store round trip
pub async fn health(State(state): State<AppState>) -> ApiResult<HealthStatus> {
    state.store.ping().await.map_err(|e| {
        tracing::error!(error = %e, "health check failed");
        ApiError::ServiceUnavailable {
            code: "DATABASE_UNAVAILABLE",
            message: "Database unavailable".to_string(),
        }
    })?;

    Ok(ApiResponse::success(HealthStatus {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: Utc::now(),
        database: "ok",
    }))
}
