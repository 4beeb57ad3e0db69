//! # Trips API Handlers

use axum::{
    extract::rejection::JsonRejection,
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::{OperatorAuth, OrganizationExtension, OrganizationHeader};
use crate::error::ApiError;
use crate::handlers::types::{PageQuery, PaginatedResponse, parse_page_query};
use crate::models::trip::Model as TripModel;
use crate::repositories::TripRepository;
use crate::repositories::trip::CreateTripRequest;
use crate::server::AppState;

/// Request payload for creating a new trip
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateTripDto {
    /// Trip name (required, max 255 characters)
    #[schema(example = "Two-Tank Morning Reef")]
    pub name: String,
    /// Scheduled departure time (RFC3339)
    #[schema(example = "2026-07-04T08:00:00Z")]
    pub departs_at: String,
    /// Maximum participant slots (at least 1)
    #[schema(example = 12)]
    pub capacity: i32,
    /// Per-participant price
    #[schema(value_type = String, example = "129.99")]
    pub price: Decimal,
}

/// Trip information for API responses
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TripResponse {
    /// Unique identifier for the trip (UUID)
    #[schema(example = "550e8400-e29b-41d4-a716-446655440000")]
    pub id: String,
    pub name: String,
    /// Scheduled departure time (RFC3339)
    pub departs_at: String,
    pub capacity: i32,
    /// Per-participant price
    #[schema(value_type = String, example = "129.99")]
    pub price: Decimal,
    pub is_active: bool,
    /// Timestamp when the trip was created (RFC3339)
    pub created_at: String,
    /// Timestamp when the trip was last updated (RFC3339)
    pub updated_at: String,
}

impl From<TripModel> for TripResponse {
    fn from(model: TripModel) -> Self {
        Self {
            id: model.id.to_string(),
            name: model.name,
            departs_at: model.departs_at.to_rfc3339(),
            capacity: model.capacity,
            price: model.price,
            is_active: model.is_active,
            created_at: model.created_at.to_rfc3339(),
            updated_at: model.updated_at.to_rfc3339(),
        }
    }
}

/// Create a new trip in the caller's organization
#[utoipa::path(
    post,
    path = "/api/v1/trips",
    security(("bearer_auth" = [])),
    params(OrganizationHeader),
    request_body = CreateTripDto,
    responses(
        (status = 201, description = "Trip created successfully", body = TripResponse),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "trips"
)]
pub async fn create_trip(
    State(state): State<AppState>,
    _operator_auth: OperatorAuth,
    OrganizationExtension(organization): OrganizationExtension,
    payload: Result<Json<CreateTripDto>, JsonRejection>,
) -> Result<(StatusCode, Json<TripResponse>), ApiError> {
    let Json(request) = payload?;

    let departs_at = match DateTime::parse_from_rfc3339(&request.departs_at) {
        Ok(dt) => dt.with_timezone(&Utc),
        Err(_) => {
            return Err(ApiError::new(
                StatusCode::BAD_REQUEST,
                "VALIDATION_FAILED",
                "departs_at must be a valid RFC3339 timestamp",
            ));
        }
    };

    let repo = TripRepository::new(&state.db);
    let trip = repo
        .create_trip(
            organization.0,
            CreateTripRequest {
                name: request.name,
                departs_at,
                capacity: request.capacity,
                price: request.price,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(trip.into())))
}

/// Get a trip by ID within the caller's organization
#[utoipa::path(
    get,
    path = "/api/v1/trips/{id}",
    security(("bearer_auth" = [])),
    params(
        OrganizationHeader,
        ("id" = Uuid, Path, description = "Trip UUID")
    ),
    responses(
        (status = 200, description = "Trip retrieved successfully", body = TripResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 404, description = "Trip not found in this organization", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "trips"
)]
pub async fn get_trip(
    State(state): State<AppState>,
    _operator_auth: OperatorAuth,
    OrganizationExtension(organization): OrganizationExtension,
    Path(trip_id): Path<Uuid>,
) -> Result<Json<TripResponse>, ApiError> {
    let repo = TripRepository::new(&state.db);
    let trip = repo
        .find_by_id(organization.0, trip_id)
        .await?
        .ok_or_else(|| ApiError::new(StatusCode::NOT_FOUND, "NOT_FOUND", "Trip not found"))?;

    Ok(Json(trip.into()))
}

/// List trips with cursor pagination
#[utoipa::path(
    get,
    path = "/api/v1/trips",
    security(("bearer_auth" = [])),
    params(OrganizationHeader, PageQuery),
    responses(
        (status = 200, description = "Trips listed successfully", body = PaginatedResponse<TripResponse>),
        (status = 400, description = "Invalid query parameters", body = ApiError),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "trips"
)]
pub async fn list_trips(
    State(state): State<AppState>,
    _operator_auth: OperatorAuth,
    OrganizationExtension(organization): OrganizationExtension,
    Query(query): Query<PageQuery>,
) -> Result<Json<PaginatedResponse<TripResponse>>, ApiError> {
    let (limit, cursor) = parse_page_query(query)?;

    let repo = TripRepository::new(&state.db);
    let (trips, next_cursor) = repo.list_trips(organization.0, limit, cursor).await?;

    Ok(Json(PaginatedResponse::new(
        trips.into_iter().map(Into::into).collect(),
        next_cursor,
    )))
}
