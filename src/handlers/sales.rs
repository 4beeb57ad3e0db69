//! # Sales API Handlers
//!
//! Point-of-sale checkout. A sale decrements stock for every tracked
//! line and appends one sale entry to the transaction record, all in a
//! single database transaction.

use std::str::FromStr;

use axum::{
    extract::rejection::JsonRejection,
    extract::State,
    http::StatusCode,
    response::Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::{OperatorAuth, OrganizationExtension, OrganizationHeader};
use crate::error::ApiError;
use crate::handlers::transactions::TransactionResponse;
use crate::repositories::SaleRepository;
use crate::repositories::sale::{SaleItem, SaleLineResult};
use crate::server::AppState;

/// One line of a sale request
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SaleItemDto {
    /// Product being sold (UUID)
    #[schema(example = "550e8400-e29b-41d4-a716-446655440000")]
    pub product_id: String,
    /// Units sold (at least 1)
    #[schema(example = 2)]
    pub quantity: i32,
}

/// Request payload for recording a point-of-sale transaction
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RecordSaleDto {
    pub items: Vec<SaleItemDto>,
    /// How the money moved (e.g. card, cash)
    pub payment_method: Option<String>,
    pub notes: Option<String>,
}

/// One priced line of a recorded sale
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SaleLineResponse {
    pub product_id: String,
    pub name: String,
    pub quantity: i32,
    #[schema(value_type = String, example = "12.50")]
    pub unit_price: Decimal,
    #[schema(value_type = String, example = "25.00")]
    pub line_total: Decimal,
    /// Stock before the sale; absent for untracked products
    pub previous_quantity: Option<i32>,
    /// Stock after the sale; absent for untracked products
    pub new_quantity: Option<i32>,
}

impl From<SaleLineResult> for SaleLineResponse {
    fn from(line: SaleLineResult) -> Self {
        Self {
            product_id: line.product_id.to_string(),
            name: line.name,
            quantity: line.quantity,
            unit_price: line.unit_price,
            line_total: line.line_total,
            previous_quantity: line.previous_quantity,
            new_quantity: line.new_quantity,
        }
    }
}

/// A recorded sale: the ledger entry plus its priced lines
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SaleResponse {
    pub transaction: TransactionResponse,
    pub lines: Vec<SaleLineResponse>,
}

/// Record a point-of-sale transaction
#[utoipa::path(
    post,
    path = "/api/v1/sales",
    security(("bearer_auth" = [])),
    params(OrganizationHeader),
    request_body = RecordSaleDto,
    responses(
        (status = 201, description = "Sale recorded", body = SaleResponse),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 404, description = "A product was not found in this organization", body = ApiError),
        (status = 409, description = "Insufficient stock for a line", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "sales"
)]
pub async fn record_sale(
    State(state): State<AppState>,
    _operator_auth: OperatorAuth,
    OrganizationExtension(organization): OrganizationExtension,
    payload: Result<Json<RecordSaleDto>, JsonRejection>,
) -> Result<(StatusCode, Json<SaleResponse>), ApiError> {
    let Json(request) = payload?;

    let mut items = Vec::with_capacity(request.items.len());
    for item in &request.items {
        let product_id = Uuid::from_str(&item.product_id).map_err(|_| {
            ApiError::new(
                StatusCode::BAD_REQUEST,
                "VALIDATION_FAILED",
                "items[].product_id must be a valid UUID",
            )
        })?;
        items.push(SaleItem {
            product_id,
            quantity: item.quantity,
        });
    }

    let repo = SaleRepository::new(&state.db);
    let (transaction, lines) = repo
        .record_sale(organization.0, items, request.payment_method, request.notes)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(SaleResponse {
            transaction: transaction.into(),
            lines: lines.into_iter().map(Into::into).collect(),
        }),
    ))
}
