use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use thiserror::Error;

/// Errors surfaced to API callers. Upstream feed failures never appear
/// here; the poller recovers them by retaining the previous snapshot data.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("unknown trip {0:?}")]
    TripNotFound(String),

    #[error("no line matches trip {0:?}")]
    LineNotFound(String),

    /// No poll cycle has succeeded yet. Distinct from a snapshot with zero
    /// vehicles: the caller is early, not the network idle.
    #[error("live snapshot not yet available")]
    NotYetReady,
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::TripNotFound(_) | ApiError::LineNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::NotYetReady => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .json(serde_json::json!({ "detail": self.to_string() }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::TripNotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::NotYetReady.status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
