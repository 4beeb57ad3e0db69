//! # Bookings API Handlers
//!
//! Booking lifecycle endpoints plus the payment ledger routes. Payments
//! and refunds return both the transaction entry and the booking as it
//! looks after the ledger was updated, so callers never need a second
//! read to learn the new payment status.

use std::str::FromStr;

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
use crate::handlers::transactions::TransactionResponse;
use crate::handlers::types::{PageQuery, PaginatedResponse, parse_page_query};
use crate::models::booking::Model as BookingModel;
use crate::models::status::BookingStatus;
use crate::repositories::BookingRepository;
use crate::repositories::booking::CreateBookingRequest;
use crate::server::AppState;

/// Request payload for creating a new booking
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateBookingDto {
    /// Trip being booked (UUID)
    #[schema(example = "550e8400-e29b-41d4-a716-446655440000")]
    pub trip_id: String,
    /// Customer making the booking (UUID)
    #[schema(example = "650e8400-e29b-41d4-a716-446655440001")]
    pub customer_id: String,
    /// Number of participants (at least 1)
    #[schema(example = 2)]
    pub participants: i32,
    /// Sum of line prices before discount and tax
    #[schema(value_type = String, example = "259.98")]
    pub subtotal: Decimal,
    /// Discount applied (defaults to 0)
    #[serde(default)]
    #[schema(value_type = Option<String>, example = "10.00")]
    pub discount: Option<Decimal>,
    /// Tax applied (defaults to 0)
    #[serde(default)]
    #[schema(value_type = Option<String>, example = "20.00")]
    pub tax: Option<Decimal>,
    /// Amount the customer owes in total
    #[schema(value_type = String, example = "269.98")]
    pub total: Decimal,
    /// Initial status (defaults to pending)
    #[schema(example = "confirmed")]
    pub status: Option<String>,
    pub notes: Option<String>,
}

/// Request payload for changing a booking's status
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UpdateBookingStatusDto {
    /// New status: pending, confirmed, cancelled, no_show or completed
    #[schema(example = "confirmed")]
    pub status: String,
}

/// Request payload for recording a payment against a booking
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RecordPaymentDto {
    /// Amount received (must be greater than zero)
    #[schema(value_type = String, example = "129.99")]
    pub amount: Decimal,
    /// How the money moved (e.g. card, cash)
    pub payment_method: Option<String>,
    pub notes: Option<String>,
}

/// Request payload for recording a refund against a booking
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RecordRefundDto {
    /// Amount returned (must be greater than zero)
    #[schema(value_type = String, example = "50.00")]
    pub amount: Decimal,
    /// How the money moved (e.g. card, cash)
    pub payment_method: Option<String>,
    pub notes: Option<String>,
}

/// Booking information for API responses
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BookingResponse {
    /// Unique identifier for the booking (UUID)
    #[schema(example = "550e8400-e29b-41d4-a716-446655440000")]
    pub id: String,
    /// Human-facing reference, e.g. BK-260704-0042
    pub booking_number: String,
    pub trip_id: String,
    pub customer_id: String,
    pub participants: i32,
    #[schema(value_type = String, example = "259.98")]
    pub subtotal: Decimal,
    #[schema(value_type = String, example = "10.00")]
    pub discount: Decimal,
    #[schema(value_type = String, example = "20.00")]
    pub tax: Decimal,
    #[schema(value_type = String, example = "269.98")]
    pub total: Decimal,
    /// Sum of payments minus refunds recorded so far
    #[schema(value_type = String, example = "129.99")]
    pub paid_amount: Decimal,
    /// Lifecycle status
    #[schema(example = "confirmed")]
    pub status: String,
    /// Derived from total and paid_amount: pending, partial or paid
    #[schema(example = "partial")]
    pub payment_status: String,
    pub notes: Option<String>,
    /// Timestamp when the booking was created (RFC3339)
    pub created_at: String,
    /// Timestamp when the booking was last updated (RFC3339)
    pub updated_at: String,
}

impl From<BookingModel> for BookingResponse {
    fn from(model: BookingModel) -> Self {
        Self {
            id: model.id.to_string(),
            booking_number: model.booking_number,
            trip_id: model.trip_id.to_string(),
            customer_id: model.customer_id.to_string(),
            participants: model.participants,
            subtotal: model.subtotal,
            discount: model.discount,
            tax: model.tax,
            total: model.total,
            paid_amount: model.paid_amount,
            status: model.status,
            payment_status: model.payment_status,
            notes: model.notes,
            created_at: model.created_at.to_rfc3339(),
            updated_at: model.updated_at.to_rfc3339(),
        }
    }
}

/// A ledger write paired with the booking state it produced
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BookingTransactionResponse {
    pub transaction: TransactionResponse,
    pub booking: BookingResponse,
}

fn parse_uuid_field(raw: &str, field: &str) -> Result<Uuid, ApiError> {
    Uuid::from_str(raw).map_err(|_| {
        ApiError::new(
            StatusCode::BAD_REQUEST,
            "VALIDATION_FAILED",
            &format!("{field} must be a valid UUID"),
        )
    })
}

fn parse_status_field(raw: &str) -> Result<BookingStatus, ApiError> {
    raw.parse::<BookingStatus>().map_err(|message| {
        ApiError::new(StatusCode::BAD_REQUEST, "VALIDATION_FAILED", &message)
    })
}

/// Create a new booking in the caller's organization
#[utoipa::path(
    post,
    path = "/api/v1/bookings",
    security(("bearer_auth" = [])),
    params(OrganizationHeader),
    request_body = CreateBookingDto,
    responses(
        (status = 201, description = "Booking created successfully", body = BookingResponse),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 404, description = "Trip or customer not found in this organization", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "bookings"
)]
pub async fn create_booking(
    State(state): State<AppState>,
    _operator_auth: OperatorAuth,
    OrganizationExtension(organization): OrganizationExtension,
    payload: Result<Json<CreateBookingDto>, JsonRejection>,
) -> Result<(StatusCode, Json<BookingResponse>), ApiError> {
    let Json(request) = payload?;

    let trip_id = parse_uuid_field(&request.trip_id, "trip_id")?;
    let customer_id = parse_uuid_field(&request.customer_id, "customer_id")?;
    let status = match &request.status {
        Some(raw) => Some(parse_status_field(raw)?),
        None => None,
    };

    let repo = BookingRepository::new(&state.db, &state.events);
    let booking = repo
        .create_booking(
            organization.0,
            CreateBookingRequest {
                trip_id,
                customer_id,
                participants: request.participants,
                subtotal: request.subtotal,
                discount: request.discount.unwrap_or(Decimal::ZERO),
                tax: request.tax.unwrap_or(Decimal::ZERO),
                total: request.total,
                status,
                notes: request.notes,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(booking.into())))
}

/// List bookings newest first with cursor pagination
#[utoipa::path(
    get,
    path = "/api/v1/bookings",
    security(("bearer_auth" = [])),
    params(OrganizationHeader, PageQuery),
    responses(
        (status = 200, description = "Bookings listed successfully", body = PaginatedResponse<BookingResponse>),
        (status = 400, description = "Invalid query parameters", body = ApiError),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "bookings"
)]
pub async fn list_bookings(
    State(state): State<AppState>,
    _operator_auth: OperatorAuth,
    OrganizationExtension(organization): OrganizationExtension,
    Query(query): Query<PageQuery>,
) -> Result<Json<PaginatedResponse<BookingResponse>>, ApiError> {
    let (limit, cursor) = parse_page_query(query)?;

    let repo = BookingRepository::new(&state.db, &state.events);
    let (bookings, next_cursor) = repo.list_bookings(organization.0, limit, cursor).await?;

    Ok(Json(PaginatedResponse::new(
        bookings.into_iter().map(Into::into).collect(),
        next_cursor,
    )))
}

/// Get a booking by ID within the caller's organization
#[utoipa::path(
    get,
    path = "/api/v1/bookings/{id}",
    security(("bearer_auth" = [])),
    params(
        OrganizationHeader,
        ("id" = Uuid, Path, description = "Booking UUID")
    ),
    responses(
        (status = 200, description = "Booking retrieved successfully", body = BookingResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 404, description = "Booking not found in this organization", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "bookings"
)]
pub async fn get_booking(
    State(state): State<AppState>,
    _operator_auth: OperatorAuth,
    OrganizationExtension(organization): OrganizationExtension,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<BookingResponse>, ApiError> {
    let repo = BookingRepository::new(&state.db, &state.events);
    let booking = repo
        .find_by_id(organization.0, booking_id)
        .await?
        .ok_or_else(|| ApiError::new(StatusCode::NOT_FOUND, "NOT_FOUND", "Booking not found"))?;

    Ok(Json(booking.into()))
}

/// Change a booking's lifecycle status
#[utoipa::path(
    patch,
    path = "/api/v1/bookings/{id}/status",
    security(("bearer_auth" = [])),
    params(
        OrganizationHeader,
        ("id" = Uuid, Path, description = "Booking UUID")
    ),
    request_body = UpdateBookingStatusDto,
    responses(
        (status = 200, description = "Booking status updated", body = BookingResponse),
        (status = 400, description = "Unknown status value", body = ApiError),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 404, description = "Booking not found in this organization", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "bookings"
)]
pub async fn update_booking_status(
    State(state): State<AppState>,
    _operator_auth: OperatorAuth,
    OrganizationExtension(organization): OrganizationExtension,
    Path(booking_id): Path<Uuid>,
    payload: Result<Json<UpdateBookingStatusDto>, JsonRejection>,
) -> Result<Json<BookingResponse>, ApiError> {
    let Json(request) = payload?;
    let new_status = parse_status_field(&request.status)?;

    let repo = BookingRepository::new(&state.db, &state.events);
    let booking = repo
        .update_status(organization.0, booking_id, new_status)
        .await?;

    Ok(Json(booking.into()))
}

/// Record a payment against a booking
#[utoipa::path(
    post,
    path = "/api/v1/bookings/{id}/payments",
    security(("bearer_auth" = [])),
    params(
        OrganizationHeader,
        ("id" = Uuid, Path, description = "Booking UUID")
    ),
    request_body = RecordPaymentDto,
    responses(
        (status = 201, description = "Payment recorded", body = BookingTransactionResponse),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 404, description = "Booking not found in this organization", body = ApiError),
        (status = 409, description = "Payment exceeds the remaining balance", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "bookings"
)]
pub async fn record_payment(
    State(state): State<AppState>,
    _operator_auth: OperatorAuth,
    OrganizationExtension(organization): OrganizationExtension,
    Path(booking_id): Path<Uuid>,
    payload: Result<Json<RecordPaymentDto>, JsonRejection>,
) -> Result<(StatusCode, Json<BookingTransactionResponse>), ApiError> {
    let Json(request) = payload?;

    let repo = BookingRepository::new(&state.db, &state.events);
    let (transaction, booking) = repo
        .record_payment(
            organization.0,
            booking_id,
            request.amount,
            request.payment_method,
            request.notes,
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(BookingTransactionResponse {
            transaction: transaction.into(),
            booking: booking.into(),
        }),
    ))
}

/// Record a refund against a booking
#[utoipa::path(
    post,
    path = "/api/v1/bookings/{id}/refunds",
    security(("bearer_auth" = [])),
    params(
        OrganizationHeader,
        ("id" = Uuid, Path, description = "Booking UUID")
    ),
    request_body = RecordRefundDto,
    responses(
        (status = 201, description = "Refund recorded", body = BookingTransactionResponse),
        (status = 400, description = "Validation failed", body = ApiError),
        (status = 401, description = "Missing or invalid bearer token", body = ApiError),
        (status = 404, description = "Booking not found in this organization", body = ApiError),
        (status = 409, description = "Refund exceeds the amount paid", body = ApiError),
        (status = 500, description = "Internal server error", body = ApiError)
    ),
    tag = "bookings"
)]
pub async fn record_refund(
    State(state): State<AppState>,
    _operator_auth: OperatorAuth,
    OrganizationExtension(organization): OrganizationExtension,
    Path(booking_id): Path<Uuid>,
    payload: Result<Json<RecordRefundDto>, JsonRejection>,
) -> Result<(StatusCode, Json<BookingTransactionResponse>), ApiError> {
    let Json(request) = payload?;

    let repo = BookingRepository::new(&state.db, &state.events);
    let (transaction, booking) = repo
        .record_refund(
            organization.0,
            booking_id,
            request.amount,
            request.payment_method,
            request.notes,
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(BookingTransactionResponse {
            transaction: transaction.into(),
            booking: booking.into(),
        }),
    ))
}
