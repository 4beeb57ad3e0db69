//! # Organizations API Handlers
//!
//! Operator-only endpoints for the tenant roots. These routes carry no
//! `X-Organization-Id` header; everything else in the API is scoped to one.

use axum::{
    extract::rejection::JsonRejection,
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::OperatorAuth;
use crate::error::ApiError;
use crate::models::organization::Model as OrganizationModel;
use crate::repositories::OrganizationRepository;
use crate::repositories::organization::CreateOrganizationRequest;
use crate::server::AppState;

/// Request payload for creating a new organization
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateOrganizationDto {
    /// Display name for the organization (required, max 255 characters)
    #[schema(example = "Blue Reef Divers")]
    pub name: String,
    /// When the trial period ends (RFC3339), if known
    #[schema(example = "2026-09-15T00:00:00Z")]
    pub trial_ends_at: Option<String>,
}

/// Organization information for API responses
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrganizationResponse {
    /// Unique identifier for the organization (UUID)
    #[schema(example = "550e8400-e29b-41d4-a716-446655440000")]
    pub id: String,
    /// Display name of the organization
    #[schema(example = "Blue Reef Divers")]
    pub name: String,
    /// Subscription status label
    #[schema(example = "trial")]
    pub subscription_status: String,
    /// When the trial period ends (RFC3339), if on trial
    pub trial_ends_at: Option<String>,
    /// Timestamp when the organization was created (RFC3339)
    #[schema(example = "2026-06-01T10:30:00Z")]
    pub created_at: String,
    /// Timestamp when the organization was last updated (RFC3339)
    pub updated_at: String,
}

impl From<OrganizationModel> for OrganizationResponse {
    fn from(model: OrganizationModel) -> Self {
        Self {
            id: model.id.to_string(),
            name: model.name,
            subscription_status: model.subscription_status,
            trial_ends_at: model.trial_ends_at.map(|ts| ts.to_rfc3339()),
            created_at: model.created_at.to_rfc3339(),
            updated_at: model.updated_at.to_rfc3339(),
        }
    }
}

/// Create a new organization
#[utoipa::path(
    post,
    path = "/api/v1/organizations",
    security(("bearer_auth" = [])),
    request_body = CreateOrganizationDto,
    responses(
        (status = 201, description = "Organization created successfully", body = OrganizationResponse, headers(
            ("Location", description = "URL of the created organization")
        )),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "organizations"
)]
pub async fn create_organization(
    State(state): State<AppState>,
    _operator_auth: OperatorAuth,
    payload: Result<Json<CreateOrganizationDto>, JsonRejection>,
) -> Result<
    (
        StatusCode,
        [(&'static str, String); 1],
        Json<OrganizationResponse>,
    ),
    ApiError,
> {
    let Json(request) = payload?;

    let trial_ends_at = parse_trial_ends_at(request.trial_ends_at)?;

    let repo = OrganizationRepository::new(&state.db);
    let organization = repo
        .create_organization(CreateOrganizationRequest {
            name: request.name,
            trial_ends_at,
        })
        .await?;

    let location = format!("/api/v1/organizations/{}", organization.id);

    Ok((
        StatusCode::CREATED,
        [("Location", location)],
        Json(organization.into()),
    ))
}

/// Get an organization by ID
#[utoipa::path(
    get,
    path = "/api/v1/organizations/{id}",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Organization UUID")
    ),
    responses(
        (status = 200, description = "Organization retrieved successfully", body = OrganizationResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 404, description = "Organization not found", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "organizations"
)]
pub async fn get_organization(
    State(state): State<AppState>,
    _operator_auth: OperatorAuth,
    Path(organization_id): Path<Uuid>,
) -> Result<Json<OrganizationResponse>, ApiError> {
    let repo = OrganizationRepository::new(&state.db);
    let organization = repo.get_organization_by_id(organization_id).await?.ok_or_else(|| {
        ApiError::new(StatusCode::NOT_FOUND, "NOT_FOUND", "Organization not found")
    })?;

    Ok(Json(organization.into()))
}

/// List all organizations
#[utoipa::path(
    get,
    path = "/api/v1/organizations",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Organizations listed successfully", body = Vec<OrganizationResponse>),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "organizations"
)]
pub async fn list_organizations(
    State(state): State<AppState>,
    _operator_auth: OperatorAuth,
) -> Result<Json<Vec<OrganizationResponse>>, ApiError> {
    let repo = OrganizationRepository::new(&state.db);
    let organizations = repo.list_organizations().await?;

    Ok(Json(
        organizations.into_iter().map(Into::into).collect(),
    ))
}

fn parse_trial_ends_at(value: Option<String>) -> Result<Option<DateTime<Utc>>, ApiError> {
    match value {
        Some(timestamp) => match DateTime::parse_from_rfc3339(&timestamp) {
            Ok(dt) => Ok(Some(dt.with_timezone(&Utc))),
            Err(_) => Err(ApiError::new(
                StatusCode::BAD_REQUEST,
                "VALIDATION_FAILED",
                "trial_ends_at must be a valid RFC3339 timestamp",
            )),
        },
        None => Ok(None),
    }
}
