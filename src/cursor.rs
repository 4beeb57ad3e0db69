//! # Cursor Utilities
//!
//! Opaque keyset pagination cursors. A cursor encodes the `(created_at, id)`
//! pair of the last row on a page as base64 JSON, and decoding validates the
//! payload before any of it reaches a query.

use axum::http::StatusCode;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;

/// Keyset position for create-time ordered listings
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CursorData {
    pub created_at: DateTime<Utc>,
    pub id: Uuid,
}

fn invalid_cursor(message: &str) -> ApiError {
    ApiError::new(StatusCode::BAD_REQUEST, "VALIDATION_FAILED", message)
}

/// Encode cursor data as an opaque base64 string
pub fn encode_cursor(created_at: &DateTime<Utc>, id: &Uuid) -> String {
    let cursor_data = CursorData {
        created_at: *created_at,
        id: *id,
    };
    let json = serde_json::to_string(&cursor_data).unwrap();
    base64::engine::general_purpose::STANDARD.encode(json.as_bytes())
}

/// Decode cursor data from an opaque base64 string with validation
pub fn decode_cursor(cursor: &str) -> Result<CursorData, ApiError> {
    if cursor.is_empty() {
        return Err(invalid_cursor("cursor cannot be empty"));
    }
    if cursor.len() > 1000 {
        return Err(invalid_cursor("cursor is too long"));
    }
    if !cursor
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '/' || c == '=')
    {
        return Err(invalid_cursor("cursor contains invalid characters"));
    }

    let decoded = base64::engine::general_purpose::STANDARD
        .decode(cursor)
        .map_err(|_| invalid_cursor("cursor is not valid base64"))?;

    if decoded.is_empty() {
        return Err(invalid_cursor("cursor is empty after decoding"));
    }
    if decoded.len() > 500 {
        return Err(invalid_cursor("decoded cursor is too large"));
    }

    let json = String::from_utf8(decoded)
        .map_err(|_| invalid_cursor("cursor contains invalid UTF-8 data"))?;
    let cursor_data: CursorData = serde_json::from_str(&json)
        .map_err(|_| invalid_cursor("cursor contains invalid JSON structure"))?;

    // Reject positions that cannot belong to a live listing: timestamps more
    // than a year out of range, or a nil row ID.
    let now = Utc::now();
    if cursor_data.created_at < now - chrono::Duration::days(365) {
        return Err(invalid_cursor("cursor timestamp is too old"));
    }
    if cursor_data.created_at > now + chrono::Duration::days(365) {
        return Err(invalid_cursor("cursor timestamp is too far in the future"));
    }
    if cursor_data.id == Uuid::nil() {
        return Err(invalid_cursor("cursor contains invalid ID"));
    }

    Ok(cursor_data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_position() {
        let created_at = Utc::now();
        let id = Uuid::new_v4();

        let cursor = encode_cursor(&created_at, &id);
        let decoded = decode_cursor(&cursor).unwrap();

        assert_eq!(decoded.created_at, created_at);
        assert_eq!(decoded.id, id);
    }

    #[test]
    fn rejects_empty_cursor() {
        let err = decode_cursor("").unwrap_err();
        assert_eq!(err.code, "VALIDATION_FAILED".into());
        assert!(err.message.contains("cannot be empty"));
    }

    #[test]
    fn rejects_oversized_cursor() {
        let err = decode_cursor(&"a".repeat(1001)).unwrap_err();
        assert!(err.message.contains("too long"));
    }

    #[test]
    fn rejects_invalid_characters() {
        let err = decode_cursor("cursor@#$%").unwrap_err();
        assert!(err.message.contains("invalid characters"));
    }

    #[test]
    fn rejects_non_json_payload() {
        let cursor = base64::engine::general_purpose::STANDARD.encode(b"not json");
        let err = decode_cursor(&cursor).unwrap_err();
        assert!(err.message.contains("invalid JSON structure"));
    }

    #[test]
    fn rejects_invalid_utf8_payload() {
        let err = decode_cursor("//8=").unwrap_err();
        assert!(err.message.contains("invalid UTF-8"));
    }

    #[test]
    fn rejects_stale_timestamp() {
        let created_at = Utc::now() - chrono::Duration::days(400);
        let cursor = encode_cursor(&created_at, &Uuid::new_v4());
        let err = decode_cursor(&cursor).unwrap_err();
        assert!(err.message.contains("too old"));
    }

    #[test]
    fn rejects_future_timestamp() {
        let created_at = Utc::now() + chrono::Duration::days(400);
        let cursor = encode_cursor(&created_at, &Uuid::new_v4());
        let err = decode_cursor(&cursor).unwrap_err();
        assert!(err.message.contains("too far in the future"));
    }

    #[test]
    fn rejects_nil_id() {
        let cursor = encode_cursor(&Utc::now(), &Uuid::nil());
        let err = decode_cursor(&cursor).unwrap_err();
        assert!(err.message.contains("invalid ID"));
    }

    #[test]
    fn ignores_extra_json_fields() {
        let json = format!(
            r#"{{"created_at":"{}","id":"{}","extra":true}}"#,
            Utc::now().to_rfc3339(),
            Uuid::new_v4()
        );
        let cursor = base64::engine::general_purpose::STANDARD.encode(json.as_bytes());
        assert!(decode_cursor(&cursor).is_ok());
    }

    #[test]
    fn rejects_oversized_decoded_payload() {
        let json = format!(
            r#"{{"created_at":"2026-01-01T00:00:00Z","id":"{}","padding":"{}"}}"#,
            Uuid::new_v4(),
            "x".repeat(600)
        );
        let cursor = base64::engine::general_purpose::STANDARD.encode(json.as_bytes());
        let err = decode_cursor(&cursor).unwrap_err();
        assert!(err.message.contains("too large"));
    }
}
