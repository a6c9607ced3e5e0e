use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::error::TariffError;

/// API error types that can be returned from handlers
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Upstream data malformed: {0}")]
    UpstreamFormat(String),

    #[error("No data: {0}")]
    NoData(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Error response that gets serialized to JSON
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) | ApiError::NoData(_) => StatusCode::NOT_FOUND,
            ApiError::UpstreamUnavailable(_) | ApiError::UpstreamFormat(_) => {
                StatusCode::BAD_GATEWAY
            }
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_type(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "NotFound",
            ApiError::UpstreamUnavailable(_) => "UpstreamUnavailable",
            ApiError::UpstreamFormat(_) => "UpstreamFormatError",
            ApiError::NoData(_) => "NoData",
            ApiError::Internal(_) => "InternalServerError",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_type = self.error_type();

        let message = match &self {
            ApiError::Internal(_) => {
                tracing::error!(error = %self, "API error occurred");
                "An internal error occurred".to_string()
            }
            ApiError::UpstreamUnavailable(_) | ApiError::UpstreamFormat(_) => {
                tracing::warn!(error = %self, "upstream error surfaced to client");
                self.to_string()
            }
            _ => {
                tracing::debug!(error = %self, "Client error");
                self.to_string()
            }
        };

        let error_response = ErrorResponse {
            error: error_type.to_string(),
            message,
        };

        (status, Json(error_response)).into_response()
    }
}

impl From<TariffError> for ApiError {
    fn from(err: TariffError) -> Self {
        match err {
            TariffError::UpstreamUnavailable(m) => ApiError::UpstreamUnavailable(m),
            TariffError::UpstreamFormat(m) => ApiError::UpstreamFormat(m),
            TariffError::NoData(m) => ApiError::NoData(m),
            TariffError::Persistence(e) => ApiError::Internal(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_distinguish_connect_from_empty() {
        // Setup-flow remediation differs: retry later vs upstream genuinely empty.
        assert_eq!(
            ApiError::UpstreamUnavailable("down".into()).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ApiError::NoData("empty".into()).status_code(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn core_taxonomy_maps_onto_api_errors() {
        let err: ApiError = TariffError::NoData("x".into()).into();
        assert_eq!(err.error_type(), "NoData");
        let err: ApiError = TariffError::UpstreamFormat("y".into()).into();
        assert_eq!(err.error_type(), "UpstreamFormatError");
    }
}
