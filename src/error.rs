use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::models::MessageResponse;
use crate::rate_limit::TooManyAttempts;
use crate::store::StoreError;

/// Why a login was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    UnknownUser,
    AccountMismatch,
    BadPassword,
}

impl AuthFailure {
    pub fn message(self) -> &'static str {
        match self {
            AuthFailure::UnknownUser => "Username does not exist.",
            AuthFailure::AccountMismatch => "Account number is incorrect.",
            AuthFailure::BadPassword => "Password is incorrect.",
        }
    }
}

#[derive(Debug)]
pub enum AppError {
    Validation(String),
    Conflict(String),
    Auth(AuthFailure),
    RateLimited(TooManyAttempts),
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut headers = HeaderMap::new();
        let (status, message) = match self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Conflict(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Auth(failure) => (StatusCode::UNAUTHORIZED, failure.message().to_string()),
            AppError::RateLimited(rejection) => {
                headers.insert(
                    header::RETRY_AFTER,
                    HeaderValue::from(rejection.retry_after_secs()),
                );
                (
                    StatusCode::TOO_MANY_REQUESTS,
                    rejection.class.exhausted_message().to_string(),
                )
            }
            // Details stay in the log; callers only learn that the server failed.
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Server error. Please try again later.".to_string(),
            ),
        };

        (status, headers, Json(MessageResponse { message })).into_response()
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::Validation(msg) => write!(f, "Validation error: {}", msg),
            AppError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            AppError::Auth(failure) => write!(f, "Authentication failed: {:?}", failure),
            AppError::RateLimited(rejection) => write!(
                f,
                "Rate limited: {:?} (retry after {}s)",
                rejection.class,
                rejection.retry_after_secs()
            ),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Duplicate => {
                AppError::Conflict("Username or account number already exists.".to_string())
            }
            StoreError::Unavailable(msg) => AppError::Internal(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rate_limit::EndpointClass;
    use std::time::Duration;

    async fn body_message(response: Response) -> String {
        let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        value["message"].as_str().unwrap().to_string()
    }

    #[test]
    fn test_validation_status() {
        let response = AppError::Validation("test".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_conflict_is_bad_request() {
        let response = AppError::Conflict("test".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_auth_failures_are_unauthorized() {
        for failure in [
            AuthFailure::UnknownUser,
            AuthFailure::AccountMismatch,
            AuthFailure::BadPassword,
        ] {
            let response = AppError::Auth(failure).into_response();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        }
    }

    #[test]
    fn test_rate_limited_sets_retry_after() {
        let response = AppError::RateLimited(TooManyAttempts {
            class: EndpointClass::Login,
            limit: 5,
            retry_after: Duration::from_millis(41_200),
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "42");
    }

    #[tokio::test]
    async fn test_auth_failure_message_in_body() {
        let response = AppError::Auth(AuthFailure::AccountMismatch).into_response();
        assert_eq!(body_message(response).await, "Account number is incorrect.");
    }

    #[tokio::test]
    async fn test_internal_error_hides_details() {
        let response =
            AppError::Internal("connection refused to 10.0.0.5:5432".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let message = body_message(response).await;
        assert!(!message.contains("10.0.0.5"));
    }
}
