//! # Common API Types
//!
//! Shared types for the API handlers: the paginated response wrapper and
//! the query parameters every cursor-paginated list endpoint accepts.

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::cursor::{CursorData, decode_cursor};
use crate::error::ApiError;

/// Generic paginated response wrapper for list endpoints
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PaginatedResponse<T> {
    /// List of items for the current page
    pub data: Vec<T>,
    /// Opaque cursor for fetching the next page (null if this is the last page)
    pub next_cursor: Option<String>,
}

impl<T> PaginatedResponse<T> {
    /// Create a new paginated response
    pub fn new(data: Vec<T>, next_cursor: Option<String>) -> Self {
        Self { data, next_cursor }
    }
}

/// Query parameters shared by cursor-paginated list endpoints
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct PageQuery {
    /// Maximum number of items to return (default: 50, max: 100)
    pub limit: Option<i64>,
    /// Opaque cursor for pagination continuation
    pub cursor: Option<String>,
}

/// Validate the page limit and decode the cursor, if any.
pub(crate) fn parse_page_query(query: PageQuery) -> Result<(u64, Option<CursorData>), ApiError> {
    let limit = query.limit.unwrap_or(50);
    if !(1..=100).contains(&limit) {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "VALIDATION_FAILED",
            "limit must be between 1 and 100",
        ));
    }

    let cursor = match query.cursor {
        Some(cursor) => Some(decode_cursor(&cursor)?),
        None => None,
    };

    Ok((limit as u64, cursor))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::encode_cursor;
    use chrono::Utc;
    use uuid::Uuid;

    #[test]
    fn default_limit_is_fifty() {
        let (limit, cursor) = parse_page_query(PageQuery::default()).unwrap();
        assert_eq!(limit, 50);
        assert!(cursor.is_none());
    }

    #[test]
    fn limit_bounds_are_enforced() {
        for bad in [0, -1, 101] {
            let result = parse_page_query(PageQuery {
                limit: Some(bad),
                cursor: None,
            });
            let err = result.unwrap_err();
            assert_eq!(err.status, StatusCode::BAD_REQUEST);
            assert_eq!(err.code, Box::from("VALIDATION_FAILED"));
        }

        for good in [1, 100] {
            assert!(
                parse_page_query(PageQuery {
                    limit: Some(good),
                    cursor: None,
                })
                .is_ok()
            );
        }
    }

    #[test]
    fn valid_cursor_round_trips() {
        let id = Uuid::new_v4();
        let created_at = Utc::now();
        let encoded = encode_cursor(&created_at, &id);

        let (_, cursor) = parse_page_query(PageQuery {
            limit: Some(10),
            cursor: Some(encoded),
        })
        .unwrap();

        let cursor = cursor.unwrap();
        assert_eq!(cursor.id, id);
        assert_eq!(cursor.created_at, created_at);
    }

    #[test]
    fn garbage_cursor_is_rejected() {
        let result = parse_page_query(PageQuery {
            limit: None,
            cursor: Some("not base64 at all!!!".to_string()),
        });
        assert_eq!(result.unwrap_err().status, StatusCode::BAD_REQUEST);
    }
}
