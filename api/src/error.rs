//! HTTP error envelope.
//!
//! Every failure renders as `{"error": <code>, "message": <text>}` with a
//! status derived from the domain error, so clients can branch on the code
//! without parsing the message.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use hotmap_core::CoreError;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error("missing or invalid admin token")]
    Unauthorized,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Core(err) => match err {
                CoreError::Validation(_) | CoreError::PaymentMissing => StatusCode::BAD_REQUEST,
                CoreError::NotFound(_) => StatusCode::NOT_FOUND,
                CoreError::DuplicateVote
                | CoreError::WordExists
                | CoreError::PaymentAlreadyUsed
                | CoreError::FreeQuotaExhausted
                | CoreError::FreeQuotaNotYetUsed => StatusCode::CONFLICT,
                CoreError::DailyLimitReached => StatusCode::TOO_MANY_REQUESTS,
                CoreError::Conflict | CoreError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                CoreError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::Unauthorized => "unauthorized",
            ApiError::Core(err) => err.code(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        metrics::counter!("api_errors_total", "code" => self.code()).increment(1);
        let body = Json(json!({
            "error": self.code(),
            "message": self.to_string(),
        }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_the_domain_error() {
        assert_eq!(
            ApiError::from(CoreError::DailyLimitReached).status(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            ApiError::from(CoreError::FreeQuotaNotYetUsed).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(CoreError::PaymentMissing).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(CoreError::Conflict).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(ApiError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
    }
}
