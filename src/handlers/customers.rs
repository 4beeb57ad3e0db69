//! # Customers API Handlers

use axum::{
    extract::rejection::JsonRejection,
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::{OperatorAuth, OrganizationExtension, OrganizationHeader};
use crate::error::ApiError;
use crate::handlers::types::{PageQuery, PaginatedResponse, parse_page_query};
use crate::models::customer::Model as CustomerModel;
use crate::repositories::CustomerRepository;
use crate::repositories::customer::CreateCustomerRequest;
use crate::server::AppState;

/// Request payload for creating a new customer
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateCustomerDto {
    /// Customer first name (required, max 255 characters)
    #[schema(example = "Maya")]
    pub first_name: String,
    /// Customer last name (required, max 255 characters)
    #[schema(example = "Tanaka")]
    pub last_name: String,
    /// Contact email
    #[schema(example = "maya@example.com")]
    pub email: Option<String>,
    /// Contact phone number
    pub phone: Option<String>,
    /// Diving certification level, free-form
    #[schema(example = "Open Water")]
    pub certification_level: Option<String>,
}

/// Customer information for API responses
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CustomerResponse {
    /// Unique identifier for the customer (UUID)
    #[schema(example = "550e8400-e29b-41d4-a716-446655440000")]
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub certification_level: Option<String>,
    /// Timestamp when the customer was created (RFC3339)
    pub created_at: String,
    /// Timestamp when the customer was last updated (RFC3339)
    pub updated_at: String,
}

impl From<CustomerModel> for CustomerResponse {
    fn from(model: CustomerModel) -> Self {
        Self {
            id: model.id.to_string(),
            first_name: model.first_name,
            last_name: model.last_name,
            email: model.email,
            phone: model.phone,
            certification_level: model.certification_level,
            created_at: model.created_at.to_rfc3339(),
            updated_at: model.updated_at.to_rfc3339(),
        }
    }
}

/// Create a new customer in the caller's organization
#[utoipa::path(
    post,
    path = "/api/v1/customers",
    security(("bearer_auth" = [])),
    params(OrganizationHeader),
    request_body = CreateCustomerDto,
    responses(
        (status = 201, description = "Customer created successfully", body = CustomerResponse),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "customers"
)]
pub async fn create_customer(
    State(state): State<AppState>,
    _operator_auth: OperatorAuth,
    OrganizationExtension(organization): OrganizationExtension,
    payload: Result<Json<CreateCustomerDto>, JsonRejection>,
) -> Result<(StatusCode, Json<CustomerResponse>), ApiError> {
    let Json(request) = payload?;

    let repo = CustomerRepository::new(&state.db);
    let customer = repo
        .create_customer(
            organization.0,
            CreateCustomerRequest {
                first_name: request.first_name,
                last_name: request.last_name,
                email: request.email,
                phone: request.phone,
                certification_level: request.certification_level,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(customer.into())))
}

/// Get a customer by ID within the caller's organization
#[utoipa::path(
    get,
    path = "/api/v1/customers/{id}",
    security(("bearer_auth" = [])),
    params(
        OrganizationHeader,
        ("id" = Uuid, Path, description = "Customer UUID")
    ),
    responses(
        (status = 200, description = "Customer retrieved successfully", body = CustomerResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 404, description = "Customer not found in this organization", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "customers"
)]
pub async fn get_customer(
    State(state): State<AppState>,
    _operator_auth: OperatorAuth,
    OrganizationExtension(organization): OrganizationExtension,
    Path(customer_id): Path<Uuid>,
) -> Result<Json<CustomerResponse>, ApiError> {
    let repo = CustomerRepository::new(&state.db);
    let customer = repo
        .find_by_id(organization.0, customer_id)
        .await?
        .ok_or_else(|| ApiError::new(StatusCode::NOT_FOUND, "NOT_FOUND", "Customer not found"))?;

    Ok(Json(customer.into()))
}

/// List customers with cursor pagination
#[utoipa::path(
    get,
    path = "/api/v1/customers",
    security(("bearer_auth" = [])),
    params(OrganizationHeader, PageQuery),
    responses(
        (status = 200, description = "Customers listed successfully", body = PaginatedResponse<CustomerResponse>),
        (status = 400, description = "Invalid query parameters", body = ApiError),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "customers"
)]
pub async fn list_customers(
    State(state): State<AppState>,
    _operator_auth: OperatorAuth,
    OrganizationExtension(organization): OrganizationExtension,
    Query(query): Query<PageQuery>,
) -> Result<Json<PaginatedResponse<CustomerResponse>>, ApiError> {
    let (limit, cursor) = parse_page_query(query)?;

    let repo = CustomerRepository::new(&state.db);
    let (customers, next_cursor) = repo.list_customers(organization.0, limit, cursor).await?;

    Ok(Json(PaginatedResponse::new(
        customers.into_iter().map(Into::into).collect(),
        next_cursor,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::repositories::OrganizationRepository;
    use crate::repositories::organization::CreateOrganizationRequest;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use migration::{Migrator, MigratorTrait};
    use sea_orm::Database;
    use serde_json::json;
    use tower::ServiceExt;

    async fn setup_test_app() -> (AppState, axum::Router, Uuid) {
        let config = AppConfig {
            database_url: "sqlite::memory:".to_string(),
            operator_tokens: vec!["test-token".to_string()],
            ..Default::default()
        };

        let db = Database::connect("sqlite::memory:")
            .await
            .expect("Failed to init test DB");
        Migrator::up(&db, None)
            .await
            .expect("Failed to run migrations");

        let organization = OrganizationRepository::new(&db)
            .create_organization(CreateOrganizationRequest {
                name: "Handler Test Divers".to_string(),
                trial_ends_at: None,
            })
            .await
            .expect("Failed to create test organization");

        let (state, _events) = crate::server::create_test_app_state(config, db);
        let app = crate::server::create_app(state.clone());
        (state, app, organization.id)
    }

    fn scoped_headers(organization_id: Uuid) -> Vec<(&'static str, String)> {
        vec![
            ("Authorization", "Bearer test-token".to_string()),
            ("X-Organization-Id", organization_id.to_string()),
            ("Content-Type", "application/json".to_string()),
        ]
    }

    #[tokio::test]
    async fn create_and_fetch_customer() {
        let (_state, app, organization_id) = setup_test_app().await;

        let mut builder = Request::builder().method("POST").uri("/api/v1/customers");
        for (name, value) in scoped_headers(organization_id) {
            builder = builder.header(name, value);
        }
        let request = builder
            .body(Body::from(
                json!({
                    "first_name": "Maya",
                    "last_name": "Tanaka",
                    "certification_level": "Rescue"
                })
                .to_string(),
            ))
            .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let created: CustomerResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(created.first_name, "Maya");

        let mut builder = Request::builder()
            .method("GET")
            .uri(format!("/api/v1/customers/{}", created.id));
        for (name, value) in scoped_headers(organization_id) {
            builder = builder.header(name, value);
        }
        let response = app
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn customer_from_another_organization_is_404() {
        let (state, app, organization_id) = setup_test_app().await;

        let other_org = OrganizationRepository::new(&state.db)
            .create_organization(CreateOrganizationRequest {
                name: "Other Shop".to_string(),
                trial_ends_at: None,
            })
            .await
            .unwrap();
        let foreign = CustomerRepository::new(&state.db)
            .create_customer(
                other_org.id,
                CreateCustomerRequest {
                    first_name: "Ines".to_string(),
                    last_name: "Duarte".to_string(),
                    email: None,
                    phone: None,
                    certification_level: None,
                },
            )
            .await
            .unwrap();

        let mut builder = Request::builder()
            .method("GET")
            .uri(format!("/api/v1/customers/{}", foreign.id));
        for (name, value) in scoped_headers(organization_id) {
            builder = builder.header(name, value);
        }
        let response = app
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn list_customers_rejects_bad_limit() {
        let (_state, app, organization_id) = setup_test_app().await;

        let mut builder = Request::builder()
            .method("GET")
            .uri("/api/v1/customers?limit=500");
        for (name, value) in scoped_headers(organization_id) {
            builder = builder.header(name, value);
        }
        let response = app
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn customers_require_organization_header() {
        let (_state, app, _organization_id) = setup_test_app().await;

        let request = Request::builder()
            .method("GET")
            .uri("/api/v1/customers")
            .header("Authorization", "Bearer test-token")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
