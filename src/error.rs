//! # Error Handling
//!
//! This module provides unified error handling for the Reefdesk API,
//! implementing a consistent problem+json response format with trace ID
//! propagation, plus the typed ledger error taxonomy the repositories use.

use axum::{
    extract::rejection::JsonRejection,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::telemetry;

/// Unified API error response structure
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ApiError {
    /// HTTP status code for the response
    #[serde(skip_serializing, skip_deserializing)]
    pub status: StatusCode,
    /// Error code for programmatic handling
    pub code: Box<str>,
    /// Human-readable error message
    pub message: Box<str>,
    /// Additional error details (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Box<serde_json::Value>>,
    /// Correlation trace ID for debugging (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<Box<str>>,
}

impl ApiError {
    /// Create a new API error with the given status code and message
    pub fn new<S: Into<String>>(status: StatusCode, code: S, message: S) -> Self {
        Self {
            status,
            code: code.into().into_boxed_str(),
            message: message.into().into_boxed_str(),
            details: None,
            trace_id: Self::current_trace_id(),
        }
    }

    /// Add details to the error
    pub fn with_details<V: Into<serde_json::Value>>(mut self, details: V) -> Self {
        self.details = Some(Box::new(details.into()));
        self
    }

    /// Extract current trace ID from the active tracing span (falls back to generated correlation ID)
    fn current_trace_id() -> Option<Box<str>> {
        telemetry::current_trace_id()
            .map(|trace_id| trace_id.into_boxed_str())
            .or_else(|| {
                // Fallback: generate a correlation ID for basic client-server log correlation
                Some(format!("corr-{}", &uuid::Uuid::new_v4().to_string()[..8]).into_boxed_str())
            })
    }
}

/// Detect a unique-constraint violation across the supported backends.
///
/// Used by the booking number generator to retry on a suffix collision.
pub(crate) fn is_unique_violation(error: &sea_orm::DbErr) -> bool {
    use sea_orm::RuntimeErr;

    const PG_UNIQUE: &str = "23505";
    const SQLITE_DUPLICATE_CODES: &[&str] = &["1555", "2067"];

    let runtime_err = match error {
        sea_orm::DbErr::Query(RuntimeErr::SqlxError(sqlx_err))
        | sea_orm::DbErr::Exec(RuntimeErr::SqlxError(sqlx_err)) => sqlx_err,
        _ => return false,
    };

    let Some(db_error) = runtime_err.as_database_error() else {
        return false;
    };

    if db_error.is_unique_violation() {
        return true;
    }

    if let Some(code) = db_error.code() {
        let code_str = code.as_ref();
        if code_str == PG_UNIQUE || SQLITE_DUPLICATE_CODES.contains(&code_str) {
            return true;
        }
    }

    false
}

/// Standard error types with predefined status codes
#[derive(Debug, Error)]
pub enum ErrorType {
    #[error("Bad Request")]
    BadRequest,
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Forbidden")]
    Forbidden,
    #[error("Not Found")]
    NotFound,
    #[error("Conflict")]
    Conflict,
    #[error("Internal Server Error")]
    InternalServerError,
    #[error("Service Unavailable")]
    ServiceUnavailable,
}

impl ErrorType {
    /// Get the appropriate HTTP status code for this error type
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorType::BadRequest => StatusCode::BAD_REQUEST,
            ErrorType::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorType::Forbidden => StatusCode::FORBIDDEN,
            ErrorType::NotFound => StatusCode::NOT_FOUND,
            ErrorType::Conflict => StatusCode::CONFLICT,
            ErrorType::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorType::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Get the error code string for this error type (SCREAMING_SNAKE_CASE)
    pub fn error_code(&self) -> &'static str {
        match self {
            ErrorType::BadRequest => "VALIDATION_FAILED",
            ErrorType::Unauthorized => "UNAUTHORIZED",
            ErrorType::Forbidden => "FORBIDDEN",
            ErrorType::NotFound => "NOT_FOUND",
            ErrorType::Conflict => "CONFLICT",
            ErrorType::InternalServerError => "INTERNAL_SERVER_ERROR",
            ErrorType::ServiceUnavailable => "SERVICE_UNAVAILABLE",
        }
    }
}

/// Typed rejection from the ledger operations.
///
/// Every variant is detected before any write: a failed operation never
/// leaves partial state behind. Handlers convert these into problem+json
/// responses via the `From<LedgerError> for ApiError` impl.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The entity does not resolve inside the caller's organization scope.
    ///
    /// Covers both "does not exist" and "belongs to another organization";
    /// the two are deliberately indistinguishable.
    #[error("{entity} not found")]
    NotFound { entity: &'static str },

    /// A structural precondition failed before the mutation was attempted.
    #[error("{0}")]
    Validation(String),

    /// The requested mutation would break a standing invariant
    /// (negative stock, overpayment beyond tolerance, refund beyond paid).
    #[error("{message}")]
    InvariantViolation {
        message: String,
        details: Option<serde_json::Value>,
    },

    /// Storage-level failure from the underlying connection or query.
    #[error(transparent)]
    Database(#[from] sea_orm::DbErr),
}

impl LedgerError {
    pub fn not_found(entity: &'static str) -> Self {
        LedgerError::NotFound { entity }
    }

    pub fn validation<S: Into<String>>(message: S) -> Self {
        LedgerError::Validation(message.into())
    }

    pub fn invariant<S: Into<String>>(message: S, details: serde_json::Value) -> Self {
        LedgerError::InvariantViolation {
            message: message.into(),
            details: Some(details),
        }
    }
}

impl From<LedgerError> for ApiError {
    fn from(error: LedgerError) -> Self {
        match error {
            LedgerError::NotFound { .. } => {
                ApiError::new(StatusCode::NOT_FOUND, "NOT_FOUND", &error.to_string())
            }
            LedgerError::Validation(message) => {
                ApiError::new(StatusCode::BAD_REQUEST, "VALIDATION_FAILED", &message)
            }
            LedgerError::InvariantViolation { message, details } => {
                let api_error = ApiError::new(StatusCode::CONFLICT, "CONFLICT", &message);
                match details {
                    Some(details) => api_error.with_details(details),
                    None => api_error,
                }
            }
            LedgerError::Database(db_err) => ApiError::from(db_err),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut headers = HeaderMap::new();
        headers.insert(
            "content-type",
            HeaderValue::from_static("application/problem+json"),
        );

        (self.status, headers, axum::Json(self)).into_response()
    }
}

// Error mappers for common sources

impl From<ErrorType> for ApiError {
    fn from(error_type: ErrorType) -> Self {
        Self::new(
            error_type.status_code(),
            error_type.error_code(),
            &error_type.to_string(),
        )
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(error: anyhow::Error) -> Self {
        // Log the full error for debugging
        tracing::error!("Internal error: {:?}", error);

        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_SERVER_ERROR",
            "An internal error occurred",
        )
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let message = match rejection {
            JsonRejection::JsonDataError(err) => format!("Invalid JSON: {}", err),
            JsonRejection::JsonSyntaxError(err) => format!("JSON syntax error: {}", err),
            JsonRejection::MissingJsonContentType(_) => {
                "Missing 'Content-Type: application/json' header".to_string()
            }
            _ => "Invalid request body".to_string(),
        };

        Self::new(StatusCode::BAD_REQUEST, "VALIDATION_FAILED", &message)
    }
}

impl From<sea_orm::DbErr> for ApiError {
    fn from(error: sea_orm::DbErr) -> Self {
        if is_unique_violation(&error) {
            tracing::debug!(?error, "Unique constraint violation detected");
            return Self::new(StatusCode::CONFLICT, "CONFLICT", "Resource already exists");
        }

        match error {
            sea_orm::DbErr::RecordNotFound(record) => Self::new(
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                &format!("Record not found: {}", record),
            ),
            sea_orm::DbErr::Query(query_err) => {
                tracing::error!("Database query error: {:?}", query_err);
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_SERVER_ERROR",
                    "Database error occurred",
                )
            }
            sea_orm::DbErr::Exec(exec_err) => {
                tracing::error!("Database execution error: {:?}", exec_err);
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_SERVER_ERROR",
                    "Database error occurred",
                )
            }
            sea_orm::DbErr::Conn(connection_err) => {
                tracing::error!("Database connection error: {:?}", connection_err);
                Self::new(
                    StatusCode::SERVICE_UNAVAILABLE,
                    "SERVICE_UNAVAILABLE",
                    "Database service unavailable",
                )
            }
            _ => {
                tracing::error!("Database error: {:?}", error);
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_SERVER_ERROR",
                    "Database error occurred",
                )
            }
        }
    }
}

/// Create an unauthorized error (401)
pub fn unauthorized(message: Option<&str>) -> ApiError {
    let msg = message.unwrap_or("Authentication required");
    ApiError::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg)
}

/// Create an unauthorized error (401) with explicit trace_id
pub fn unauthorized_with_trace_id(message: Option<&str>, trace_id: String) -> ApiError {
    let msg = message.unwrap_or("Authentication required");
    let mut error = ApiError::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg);
    error.trace_id = Some(trace_id.into_boxed_str());
    error
}

/// Create a validation error with field details
pub fn validation_error(message: &str, field_errors: serde_json::Value) -> ApiError {
    ApiError::new(StatusCode::BAD_REQUEST, "VALIDATION_FAILED", message).with_details(field_errors)
}
