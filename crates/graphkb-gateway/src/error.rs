//! Error types for graphkb-gateway

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::auth::AuthError;
use crate::decode::DecodeError;

/// Why an update request was not accepted.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Missing or unknown credential
    #[error("Unauthorized")]
    Unauthorized,

    /// No admission permit available
    #[error("Too many concurrent updates, retry later")]
    Saturated,

    /// The body does not match the expected payload shape
    #[error("Malformed payload: {0}")]
    Malformed(#[from] DecodeError),

    /// The credential could not be checked
    #[error("Authentication failed: {0}")]
    Auth(#[from] AuthError),

    /// The graph mutation collaborator failed
    #[error("Graph update failed: {0}")]
    Forwarding(#[from] graphkb_graph::GraphError),
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::Unauthorized => StatusCode::UNAUTHORIZED,
            GatewayError::Saturated => StatusCode::TOO_MANY_REQUESTS,
            GatewayError::Malformed(_)
            | GatewayError::Auth(_)
            | GatewayError::Forwarding(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            GatewayError::Unauthorized => "UNAUTHORIZED",
            GatewayError::Saturated => "TOO_MANY_REQUESTS",
            GatewayError::Malformed(_) => "MALFORMED_PAYLOAD",
            GatewayError::Auth(_) | GatewayError::Forwarding(_) => "INTERNAL_ERROR",
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: self.to_string(),
            code: self.code().to_string(),
        };

        (self.status(), Json(body)).into_response()
    }
}
