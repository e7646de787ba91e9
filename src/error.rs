// error.rs
// Domain errors raised by the ledger/state layer and their HTTP mapping.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Domain failures. The state layer returns them inside `anyhow::Error`;
/// `ApiError` downcasts them back to pick a status code.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("journal has fewer than two lines")]
    EmptyJournal,

    #[error("invalid line for account {account_code}: {reason}")]
    InvalidLine {
        account_code: String,
        reason: String,
    },

    #[error("journal is unbalanced: debits {debits:.2} != credits {credits:.2}")]
    UnbalancedJournal { debits: f64, credits: f64 },

    #[error("account {0} is not in the chart of accounts")]
    UnknownAccount(String),

    #[error("account {0} is inactive")]
    InactiveAccount(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Invalid(String),

    #[error("{0}")]
    Conflict(String),
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast_ref::<LedgerError>() {
            Some(LedgerError::NotFound(_)) => ApiError::NotFound(err.to_string()),
            Some(LedgerError::Conflict(_)) => ApiError::Conflict(err.to_string()),
            Some(_) => ApiError::BadRequest(err.to_string()),
            None => {
                tracing::error!(error = ?err, "request failed");
                ApiError::Internal(err.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string(),
        }));

        (status, body).into_response()
    }
}
