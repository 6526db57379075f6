use axum::extract::rejection::JsonRejection;
use axum::extract::Extension;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use log::debug;
use std::sync::Arc;

use super::{admit, body_rejected, rate_limit_headers};
use crate::auth::{Authenticated, Authenticator};
use crate::client::ClientAddr;
use crate::error::AppError;
use crate::models::{LoginRequest, LoginResponse};
use crate::rate_limit::{EndpointClass, RateLimiter};

/// Authenticate a customer (`POST /login`).
///
/// Rate limiting runs first, so an exhausted window rejects even correct
/// credentials.
pub async fn login(
    ClientAddr(client): ClientAddr,
    Extension(limiter): Extension<Arc<RateLimiter>>,
    Extension(authenticator): Extension<Arc<Authenticator>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<(StatusCode, HeaderMap, Json<LoginResponse>), AppError> {
    debug!("POST /login: client={}", client);
    let allowance = admit(&limiter, &client, EndpointClass::Login)?;
    let Json(payload) = payload.map_err(body_rejected)?;

    let Authenticated(profile) = authenticator.login(payload).await?;

    Ok((
        StatusCode::OK,
        rate_limit_headers(&allowance),
        Json(LoginResponse {
            message: "Login successful.".to_string(),
            user: profile,
        }),
    ))
}
