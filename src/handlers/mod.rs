//! # API Handlers
//!
//! This module contains all the HTTP endpoint handlers for the Reefdesk API.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::models::ServiceInfo;
use crate::server::AppState;

pub mod bookings;
pub mod customers;
pub mod organizations;
pub mod products;
pub mod sales;
pub mod transactions;
pub mod trips;
pub mod types;

/// Root handler that returns basic service information
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Service information", body = ServiceInfo)
    ),
    tag = "root"
)]
pub async fn root() -> Json<ServiceInfo> {
    Json(ServiceInfo::default())
}

/// Health check response payload
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Overall service health
    #[schema(example = "ok")]
    pub status: String,
}

/// Health check handler that verifies database connectivity
#[utoipa::path(
    get,
    path = "/healthz",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
        (status = 503, description = "Database unreachable", body = ApiError)
    ),
    tag = "root"
)]
pub async fn healthz(State(state): State<AppState>) -> Result<Json<HealthResponse>, ApiError> {
    crate::db::health_check(&state.db).await.map_err(|err| {
        tracing::error!("Health check failed: {:?}", err);
        ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "SERVICE_UNAVAILABLE",
            "Database health check failed",
        )
    })?;

    Ok(Json(HealthResponse {
        status: "ok".to_string(),
    }))
}
