//! Handler errors and their HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Errors returned by route handlers.
#[derive(Debug, Error)]
pub enum AppError {
    /// Raised on purpose by `/error`.
    #[error("Simulated failure in {0}")]
    Simulated(&'static str),

    /// The downstream service could not be reached or failed.
    #[error("Downstream call failed: {0}")]
    Downstream(#[from] reqwest::Error),
}

impl AppError {
    /// Returns the response status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Simulated(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Downstream(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}
