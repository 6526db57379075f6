pub mod health;
pub mod login;
pub mod register;

use axum::extract::rejection::JsonRejection;
use axum::http::{HeaderMap, HeaderName, HeaderValue};
use log::warn;

use crate::error::AppError;
use crate::rate_limit::{EndpointClass, RateLimitState, RateLimiter};

/// Count the request against `class`, turning an exhausted window into [`AppError::RateLimited`].
pub(crate) fn admit(
    limiter: &RateLimiter,
    client: &str,
    class: EndpointClass,
) -> Result<RateLimitState, AppError> {
    limiter.check(client, class).map_err(|rejection| {
        warn!(
            "rate_limit: rejected {:?} request from client={} (limit {}, retry in {}s)",
            class,
            client,
            rejection.limit,
            rejection.retry_after_secs()
        );
        AppError::RateLimited(rejection)
    })
}

/// `X-RateLimit-*` headers describing the caller's remaining allowance.
pub(crate) fn rate_limit_headers(state: &RateLimitState) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        HeaderName::from_static("x-ratelimit-limit"),
        HeaderValue::from(state.limit),
    );
    headers.insert(
        HeaderName::from_static("x-ratelimit-remaining"),
        HeaderValue::from(state.remaining),
    );
    headers.insert(
        HeaderName::from_static("x-ratelimit-reset"),
        HeaderValue::from(state.reset_after_secs()),
    );
    headers
}

pub(crate) fn body_rejected(rejection: JsonRejection) -> AppError {
    warn!("request body rejected: {}", rejection);
    AppError::Validation("Invalid request body.".to_string())
}
