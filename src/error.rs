//! Error handling module
//!
//! Centralized error types and HTTP response conversion.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::MsatsError;
use crate::quote::QuoteError;
use crate::rail::RailError;
use crate::store::StoreError;

/// Application-wide Result type
pub type AppResult<T> = Result<T, AppError>;

/// Application error types
///
/// Everything is thrown synchronously out of the orchestrator call and is
/// not retried internally; the API layer translates to a transport-level
/// response.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Client errors (4xx)
    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Insufficient funds: {requested_msats} msats requested, {available_msats} available")]
    InsufficientFunds {
        available_msats: i64,
        requested_msats: i64,
    },

    #[error("Invalid transaction state: {0}")]
    TransactionState(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Unauthorized(String),

    #[error("Version conflict: concurrent modification of transaction {0}")]
    VersionConflict(Uuid),

    // Amount/conversion errors
    #[error(transparent)]
    Amount(#[from] MsatsError),

    // Upstream rail and swap-service errors, propagated with context
    #[error("Payment rail error: {0}")]
    Rail(#[from] RailError),

    #[error("Quote provider error: {0}")]
    Quote(#[from] QuoteError),

    // Server errors (5xx)
    #[error("Store error: {0}")]
    Store(StoreError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AppError {
    /// Short stable label used as the `error_type` of operation metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation",
            AppError::InsufficientFunds { .. } => "insufficient_funds",
            AppError::TransactionState(_) => "transaction_state",
            AppError::NotFound(_) => "not_found",
            AppError::Unauthorized(_) => "unauthorized",
            AppError::VersionConflict(_) => "version_conflict",
            AppError::Amount(_) => "invalid_amount",
            AppError::Rail(_) => "rail",
            AppError::Quote(_) => "quote",
            AppError::Store(_) => "store",
            AppError::Serialization(_) => "serialization",
        }
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(id) => AppError::NotFound(format!("transaction {id}")),
            StoreError::VersionConflict { id, .. } => AppError::VersionConflict(id),
            other => AppError::Store(other),
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code, details) = match &self {
            // 400 Bad Request
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, "invalid_request", Some(msg.clone()))
            }
            AppError::InsufficientFunds { .. } => {
                (StatusCode::BAD_REQUEST, "insufficient_funds", Some(self.to_string()))
            }
            AppError::Amount(e) => {
                (StatusCode::BAD_REQUEST, "invalid_amount", Some(e.to_string()))
            }

            // 403 Forbidden
            AppError::Unauthorized(msg) => {
                (StatusCode::FORBIDDEN, "forbidden", Some(msg.clone()))
            }

            // 404 Not Found
            AppError::NotFound(what) => {
                (StatusCode::NOT_FOUND, "not_found", Some(what.clone()))
            }

            // 409 Conflict
            AppError::TransactionState(msg) => {
                (StatusCode::CONFLICT, "invalid_transaction_state", Some(msg.clone()))
            }
            AppError::VersionConflict(_) => {
                (StatusCode::CONFLICT, "version_conflict", None)
            }

            // 502 Bad Gateway - upstream collaborator failures
            AppError::Rail(e) => {
                tracing::error!("Payment rail error: {:?}", e);
                (StatusCode::BAD_GATEWAY, "rail_error", Some(e.to_string()))
            }
            AppError::Quote(e) => {
                tracing::error!("Quote provider error: {:?}", e);
                (StatusCode::BAD_GATEWAY, "quote_error", Some(e.to_string()))
            }

            // 500 Internal Server Error
            AppError::Store(e) => {
                tracing::error!("Store error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "store_error", None)
            }
            AppError::Serialization(e) => {
                tracing::error!("Serialization error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "serialization_error", None)
            }
        };

        let body = ErrorResponse {
            error: self.to_string(),
            error_code: error_code.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}
