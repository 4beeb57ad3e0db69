//! # Transactions API Handlers
//!
//! Read-only access to the append-only transaction record. Entries are
//! written by the booking and sale flows; there is no endpoint that
//! mutates or deletes them.

use std::str::FromStr;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::auth::{OperatorAuth, OrganizationExtension, OrganizationHeader};
use crate::error::ApiError;
use crate::handlers::types::{PageQuery, PaginatedResponse, parse_page_query};
use crate::models::transaction::Model as TransactionModel;
use crate::repositories::TransactionRepository;
use crate::server::AppState;

/// Query parameters for listing transactions
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct ListTransactionsQuery {
    /// Restrict results to a single booking (UUID)
    pub booking_id: Option<String>,
    /// Page size (1-100, default 50)
    pub limit: Option<i64>,
    /// Opaque cursor from a previous page
    pub cursor: Option<String>,
}

/// A single entry in the transaction record
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TransactionResponse {
    /// Unique identifier for the transaction (UUID)
    #[schema(example = "550e8400-e29b-41d4-a716-446655440000")]
    pub id: String,
    /// Booking this entry belongs to, if any (UUID)
    pub booking_id: Option<String>,
    /// Entry type: payment, refund or sale
    #[schema(example = "payment")]
    pub transaction_type: String,
    /// Monetary amount of the entry
    #[schema(value_type = String, example = "129.99")]
    pub amount: Decimal,
    /// How the money moved (e.g. card, cash)
    pub payment_method: Option<String>,
    pub notes: Option<String>,
    /// Timestamp when the entry was recorded (RFC3339)
    pub created_at: String,
}

impl From<TransactionModel> for TransactionResponse {
    fn from(model: TransactionModel) -> Self {
        Self {
            id: model.id.to_string(),
            booking_id: model.booking_id.map(|id| id.to_string()),
            transaction_type: model.transaction_type,
            amount: model.amount,
            payment_method: model.payment_method,
            notes: model.notes,
            created_at: model.created_at.to_rfc3339(),
        }
    }
}

/// List transactions newest first, optionally filtered to one booking
#[utoipa::path(
    get,
    path = "/api/v1/transactions",
    security(("bearer_auth" = [])),
    params(OrganizationHeader, ListTransactionsQuery),
    responses(
        (status = 200, description = "Transactions listed successfully", body = PaginatedResponse<TransactionResponse>),
        (status = 400, description = "Invalid query parameters", body = ApiError),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "transactions"
)]
pub async fn list_transactions(
    State(state): State<AppState>,
    _operator_auth: OperatorAuth,
    OrganizationExtension(organization): OrganizationExtension,
    Query(query): Query<ListTransactionsQuery>,
) -> Result<Json<PaginatedResponse<TransactionResponse>>, ApiError> {
    let booking_id = match &query.booking_id {
        Some(raw) => Some(Uuid::from_str(raw).map_err(|_| {
            ApiError::new(
                StatusCode::BAD_REQUEST,
                "VALIDATION_FAILED",
                "booking_id must be a valid UUID",
            )
        })?),
        None => None,
    };

    let (limit, cursor) = parse_page_query(PageQuery {
        limit: query.limit,
        cursor: query.cursor,
    })?;

    let repo = TransactionRepository::new(&state.db);
    let (entries, next_cursor) = repo
        .list_transactions(organization.0, booking_id, limit, cursor)
        .await?;

    Ok(Json(PaginatedResponse::new(
        entries.into_iter().map(Into::into).collect(),
        next_cursor,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::models::status::TransactionType;
    use crate::repositories::OrganizationRepository;
    use crate::repositories::organization::CreateOrganizationRequest;
    use crate::repositories::transaction::new_entry;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use migration::{Migrator, MigratorTrait};
    use rust_decimal_macros::dec;
    use sea_orm::{ActiveModelTrait, Database};
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
        ]
    }

    #[tokio::test]
    async fn list_transactions_returns_recorded_entries() {
        let (state, app, organization_id) = setup_test_app().await;

        new_entry(
            organization_id,
            None,
            TransactionType::Sale,
            dec!(42.50),
            Some("cash".to_string()),
            None,
        )
        .insert(&state.db)
        .await
        .unwrap();

        let mut builder = Request::builder().method("GET").uri("/api/v1/transactions");
        for (name, value) in scoped_headers(organization_id) {
            builder = builder.header(name, value);
        }
        let response = app
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let page: PaginatedResponse<TransactionResponse> = serde_json::from_slice(&body).unwrap();
        assert_eq!(page.data.len(), 1);
        assert_eq!(page.data[0].transaction_type, "sale");
        assert_eq!(page.data[0].amount, dec!(42.50));
        assert!(page.next_cursor.is_none());
    }

    #[tokio::test]
    async fn list_transactions_rejects_malformed_booking_filter() {
        let (_state, app, organization_id) = setup_test_app().await;

        let mut builder = Request::builder()
            .method("GET")
            .uri("/api/v1/transactions?booking_id=not-a-uuid");
        for (name, value) in scoped_headers(organization_id) {
            builder = builder.header(name, value);
        }
        let response = app
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let error: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(error["code"], "VALIDATION_FAILED");
    }

    #[tokio::test]
    async fn booking_filter_excludes_unrelated_entries() {
        let (state, app, organization_id) = setup_test_app().await;

        new_entry(
            organization_id,
            None,
            TransactionType::Sale,
            dec!(10.00),
            None,
            None,
        )
        .insert(&state.db)
        .await
        .unwrap();

        let mut builder = Request::builder()
            .method("GET")
            .uri(format!("/api/v1/transactions?booking_id={}", Uuid::new_v4()));
        for (name, value) in scoped_headers(organization_id) {
            builder = builder.header(name, value);
        }
        let response = app
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let page: PaginatedResponse<TransactionResponse> = serde_json::from_slice(&body).unwrap();
        assert!(page.data.is_empty());
    }
}
