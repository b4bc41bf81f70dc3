use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tq_ledger::LedgerError;

/// Errors that stop the server itself.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type ServerResult<T> = Result<T, ServerError>;

/// Errors returned to HTTP clients.
///
/// Rendered as `{"detail": ...}`, plus `"field"` when a specific input field
/// was at fault.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{detail}")]
    BadRequest {
        detail: String,
        field: Option<String>,
    },

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::BadRequest {
            detail: detail.into(),
            field: None,
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest { .. } | Self::Ledger(LedgerError::Validation(_)) => {
                StatusCode::BAD_REQUEST
            }
            Self::Ledger(LedgerError::EmptyStore | LedgerError::AppendFailed { .. }) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            Self::Ledger(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<tq_types::ValidationError> for ApiError {
    fn from(err: tq_types::ValidationError) -> Self {
        Self::Ledger(LedgerError::Validation(err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let field = match &self {
            Self::BadRequest { field, .. } => field.clone(),
            Self::Ledger(LedgerError::Validation(v)) => Some(v.field.clone()),
            _ => None,
        };
        let detail = match &self {
            Self::Ledger(LedgerError::Validation(v)) => v.to_string(),
            other => other.to_string(),
        };

        let body = match field {
            Some(field) => json!({ "detail": detail, "field": field }),
            None => json!({ "detail": detail }),
        };
        (status, Json(body)).into_response()
    }
}
