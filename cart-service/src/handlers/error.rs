use crate::services::CartError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Failures surfaced to HTTP clients as a plain-text diagnostic.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("could not decode request body: {0}")]
    MalformedBody(#[source] serde_json::Error),

    #[error("{0} is not provided")]
    MissingPathParam(&'static str),

    #[error("data from request body is not valid")]
    Validation(#[source] validator::ValidationErrors),

    #[error("{action}: {source}")]
    Store {
        action: &'static str,
        source: CartError,
    },
}

impl ApiError {
    pub fn store(action: &'static str) -> impl FnOnce(CartError) -> Self {
        move |source| ApiError::Store { action, source }
    }

    /// Every store failure is a 500, malformed ids and missing carts included.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MalformedBody(_)
            | ApiError::MissingPathParam(_)
            | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Store { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            ApiError::Validation(details) => {
                tracing::warn!(details = %details, "Rejected request body");
            }
            ApiError::Store { .. } => tracing::error!(error = %self, "Cart operation failed"),
            _ => tracing::warn!(error = %self, "Rejected request"),
        }

        (status, self.to_string()).into_response()
    }
}
