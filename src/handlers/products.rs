//! # Products API Handlers
//!
//! Catalog management plus the stock-adjustment endpoint. Stock never
//! changes through PATCH alone; counter movements go through the
//! dedicated adjustment route so every change is race-checked.

use axum::{
    extract::rejection::JsonRejection,
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::{OperatorAuth, OrganizationExtension, OrganizationHeader};
use crate::error::ApiError;
use crate::handlers::types::{PageQuery, PaginatedResponse, parse_page_query};
use crate::models::product::Model as ProductModel;
use crate::repositories::ProductRepository;
use crate::repositories::product::{CreateProductRequest, StockAdjustment, UpdateProductRequest};
use crate::server::AppState;

fn default_track_inventory() -> bool {
    true
}

/// Request payload for creating a new product
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateProductDto {
    /// Product name (required, max 255 characters)
    #[schema(example = "Aluminum 80 Tank Rental")]
    pub name: String,
    pub description: Option<String>,
    /// Unit price
    #[schema(value_type = String, example = "12.50")]
    pub price: Decimal,
    /// Opening stock count (defaults to 0)
    #[serde(default)]
    pub stock_quantity: i32,
    /// Threshold at or below which the product counts as low stock
    #[serde(default)]
    pub low_stock_threshold: i32,
    /// Whether stock is counted for this product (defaults to true)
    #[serde(default = "default_track_inventory")]
    pub track_inventory: bool,
}

/// Request payload for updating a product; absent fields are left unchanged
#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateProductDto {
    pub name: Option<String>,
    pub description: Option<String>,
    #[schema(value_type = Option<String>, example = "14.00")]
    pub price: Option<Decimal>,
    pub stock_quantity: Option<i32>,
    pub low_stock_threshold: Option<i32>,
    pub track_inventory: Option<bool>,
}

/// Request payload for a stock adjustment
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StockAdjustmentDto {
    /// Signed quantity change; positive restocks, negative deducts
    #[schema(example = -2)]
    pub delta: i32,
}

/// Product information for API responses
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProductResponse {
    /// Unique identifier for the product (UUID)
    #[schema(example = "550e8400-e29b-41d4-a716-446655440000")]
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    /// Unit price
    #[schema(value_type = String, example = "12.50")]
    pub price: Decimal,
    pub stock_quantity: i32,
    pub low_stock_threshold: i32,
    pub track_inventory: bool,
    pub is_active: bool,
    /// Timestamp when the product was created (RFC3339)
    pub created_at: String,
    /// Timestamp when the product was last updated (RFC3339)
    pub updated_at: String,
}

impl From<ProductModel> for ProductResponse {
    fn from(model: ProductModel) -> Self {
        Self {
            id: model.id.to_string(),
            name: model.name,
            description: model.description,
            price: model.price,
            stock_quantity: model.stock_quantity,
            low_stock_threshold: model.low_stock_threshold,
            track_inventory: model.track_inventory,
            is_active: model.is_active,
            created_at: model.created_at.to_rfc3339(),
            updated_at: model.updated_at.to_rfc3339(),
        }
    }
}

/// Result of an applied stock adjustment
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StockAdjustmentResponse {
    /// Product the adjustment was applied to (UUID)
    pub product_id: String,
    pub previous_quantity: i32,
    pub new_quantity: i32,
    pub delta: i32,
}

impl From<StockAdjustment> for StockAdjustmentResponse {
    fn from(adjustment: StockAdjustment) -> Self {
        Self {
            product_id: adjustment.product_id.to_string(),
            previous_quantity: adjustment.previous_quantity,
            new_quantity: adjustment.new_quantity,
            delta: adjustment.delta,
        }
    }
}

/// Create a new product in the caller's organization
#[utoipa::path(
    post,
    path = "/api/v1/products",
    security(("bearer_auth" = [])),
    params(OrganizationHeader),
    request_body = CreateProductDto,
    responses(
        (status = 201, description = "Product created successfully", body = ProductResponse),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "products"
)]
pub async fn create_product(
    State(state): State<AppState>,
    _operator_auth: OperatorAuth,
    OrganizationExtension(organization): OrganizationExtension,
    payload: Result<Json<CreateProductDto>, JsonRejection>,
) -> Result<(StatusCode, Json<ProductResponse>), ApiError> {
    let Json(request) = payload?;

    let repo = ProductRepository::new(&state.db);
    let product = repo
        .create_product(
            organization.0,
            CreateProductRequest {
                name: request.name,
                description: request.description,
                price: request.price,
                stock_quantity: request.stock_quantity,
                low_stock_threshold: request.low_stock_threshold,
                track_inventory: request.track_inventory,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(product.into())))
}

/// List active products with cursor pagination
#[utoipa::path(
    get,
    path = "/api/v1/products",
    security(("bearer_auth" = [])),
    params(OrganizationHeader, PageQuery),
    responses(
        (status = 200, description = "Products listed successfully", body = PaginatedResponse<ProductResponse>),
        (status = 400, description = "Invalid query parameters", body = ApiError),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "products"
)]
pub async fn list_products(
    State(state): State<AppState>,
    _operator_auth: OperatorAuth,
    OrganizationExtension(organization): OrganizationExtension,
    Query(query): Query<PageQuery>,
) -> Result<Json<PaginatedResponse<ProductResponse>>, ApiError> {
    let (limit, cursor) = parse_page_query(query)?;

    let repo = ProductRepository::new(&state.db);
    let (products, next_cursor) = repo.list_products(organization.0, limit, cursor).await?;

    Ok(Json(PaginatedResponse::new(
        products.into_iter().map(Into::into).collect(),
        next_cursor,
    )))
}

/// List tracked products at or below their low-stock threshold
#[utoipa::path(
    get,
    path = "/api/v1/products/low-stock",
    security(("bearer_auth" = [])),
    params(OrganizationHeader),
    responses(
        (status = 200, description = "Low-stock products listed successfully", body = Vec<ProductResponse>),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "products"
)]
pub async fn list_low_stock(
    State(state): State<AppState>,
    _operator_auth: OperatorAuth,
    OrganizationExtension(organization): OrganizationExtension,
) -> Result<Json<Vec<ProductResponse>>, ApiError> {
    let repo = ProductRepository::new(&state.db);
    let products = repo.list_low_stock(organization.0).await?;

    Ok(Json(products.into_iter().map(Into::into).collect()))
}

/// Get a product by ID within the caller's organization
#[utoipa::path(
    get,
    path = "/api/v1/products/{id}",
    security(("bearer_auth" = [])),
    params(
        OrganizationHeader,
        ("id" = Uuid, Path, description = "Product UUID")
    ),
    responses(
        (status = 200, description = "Product retrieved successfully", body = ProductResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 404, description = "Product not found in this organization", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "products"
)]
pub async fn get_product(
    State(state): State<AppState>,
    _operator_auth: OperatorAuth,
    OrganizationExtension(organization): OrganizationExtension,
    Path(product_id): Path<Uuid>,
) -> Result<Json<ProductResponse>, ApiError> {
    let repo = ProductRepository::new(&state.db);
    let product = repo
        .find_by_id(organization.0, product_id)
        .await?
        .ok_or_else(|| ApiError::new(StatusCode::NOT_FOUND, "NOT_FOUND", "Product not found"))?;

    Ok(Json(product.into()))
}

/// Update product fields; stock changes should use the adjustment endpoint
#[utoipa::path(
    patch,
    path = "/api/v1/products/{id}",
    security(("bearer_auth" = [])),
    params(
        OrganizationHeader,
        ("id" = Uuid, Path, description = "Product UUID")
    ),
    request_body = UpdateProductDto,
    responses(
        (status = 200, description = "Product updated successfully", body = ProductResponse),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 404, description = "Product not found in this organization", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "products"
)]
pub async fn update_product(
    State(state): State<AppState>,
    _operator_auth: OperatorAuth,
    OrganizationExtension(organization): OrganizationExtension,
    Path(product_id): Path<Uuid>,
    payload: Result<Json<UpdateProductDto>, JsonRejection>,
) -> Result<Json<ProductResponse>, ApiError> {
    let Json(request) = payload?;

    let repo = ProductRepository::new(&state.db);
    let product = repo
        .update_product(
            organization.0,
            product_id,
            UpdateProductRequest {
                name: request.name,
                description: request.description,
                price: request.price,
                stock_quantity: request.stock_quantity,
                low_stock_threshold: request.low_stock_threshold,
                track_inventory: request.track_inventory,
            },
        )
        .await?;

    Ok(Json(product.into()))
}

/// Soft-delete a product so it no longer appears in listings or sales
#[utoipa::path(
    delete,
    path = "/api/v1/products/{id}",
    security(("bearer_auth" = [])),
    params(
        OrganizationHeader,
        ("id" = Uuid, Path, description = "Product UUID")
    ),
    responses(
        (status = 200, description = "Product deactivated", body = ProductResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 404, description = "Product not found in this organization", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "products"
)]
pub async fn delete_product(
    State(state): State<AppState>,
    _operator_auth: OperatorAuth,
    OrganizationExtension(organization): OrganizationExtension,
    Path(product_id): Path<Uuid>,
) -> Result<Json<ProductResponse>, ApiError> {
    let repo = ProductRepository::new(&state.db);
    let product = repo.deactivate_product(organization.0, product_id).await?;

    Ok(Json(product.into()))
}

/// Apply a signed stock adjustment to a product
#[utoipa::path(
    post,
    path = "/api/v1/products/{id}/stock-adjustments",
    security(("bearer_auth" = [])),
    params(
        OrganizationHeader,
        ("id" = Uuid, Path, description = "Product UUID")
    ),
    request_body = StockAdjustmentDto,
    responses(
        (status = 200, description = "Stock adjustment applied", body = StockAdjustmentResponse),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 404, description = "Product not found in this organization", body = ApiError),
        (status = 409, description = "Adjustment would drive stock negative", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "products"
)]
pub async fn adjust_stock(
    State(state): State<AppState>,
    _operator_auth: OperatorAuth,
    OrganizationExtension(organization): OrganizationExtension,
    Path(product_id): Path<Uuid>,
    payload: Result<Json<StockAdjustmentDto>, JsonRejection>,
) -> Result<Json<StockAdjustmentResponse>, ApiError> {
    let Json(request) = payload?;

    let repo = ProductRepository::new(&state.db);
    let adjustment = repo
        .adjust_stock(organization.0, product_id, request.delta)
        .await?;

    Ok(Json(adjustment.into()))
}
