use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// ApiError
///
/// The single failure taxonomy of the access core. Callers can always tell a
/// "who are you" failure (Authentication) from a "you can't do that" failure
/// (Authorization), which the route layer maps to 401 vs 403.
///
/// The core never swallows or retries one of these; every failure is terminal for
/// the current request and propagates to the handler, which translates and logs it.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing/invalid/expired token, unknown account, bad credentials,
    /// inactive account, or a federation assertion that doesn't match.
    #[error("{0}")]
    Authentication(&'static str),

    /// Membership absent or rights insufficient for the requested action.
    #[error("{0}")]
    Authorization(&'static str),

    /// A referenced record does not exist. Dangling references in the store are
    /// treated as this, not as corruption.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Malformed input, e.g. an authenticate payload with zero or multiple
    /// identifying fields.
    #[error("{0}")]
    Validation(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("mail delivery failed: {0}")]
    Mail(String),

    /// A broken internal invariant, e.g. a failed hash computation.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Wire shape of every error response, matching the `{result, message}` envelope
/// used throughout the API.
#[derive(Serialize)]
struct ErrorBody {
    result: &'static str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Authentication(_) => StatusCode::UNAUTHORIZED,
            ApiError::Authorization(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Database(_) | ApiError::Mail(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("internal error: {self}");
        }

        let body = ErrorBody {
            result: "error",
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
