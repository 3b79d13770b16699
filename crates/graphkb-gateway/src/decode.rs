//! Update payload decoding.

use axum::body::Body;
use serde::de::DeserializeOwned;

/// Why a request body could not be turned into a payload.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("failed to read request body: {0}")]
    Body(String),

    #[error("invalid payload: {0}")]
    Json(#[from] serde_json::Error),
}

/// Read at most `limit` bytes of `body`.
pub async fn read_body(body: Body, limit: usize) -> Result<axum::body::Bytes, DecodeError> {
    axum::body::to_bytes(body, limit)
        .await
        .map_err(|e| DecodeError::Body(e.to_string()))
}

/// Parse a complete JSON document into `T`.
///
/// Trailing non-whitespace input after the document is rejected.
pub fn decode<T: DeserializeOwned>(raw: &[u8]) -> Result<T, DecodeError> {
    Ok(serde_json::from_slice(raw)?)
}
