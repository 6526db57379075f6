use axum::extract::rejection::JsonRejection;
use axum::extract::Extension;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use log::{debug, info};
use std::sync::Arc;

use super::{admit, body_rejected, rate_limit_headers};
use crate::auth::Authenticator;
use crate::client::ClientAddr;
use crate::error::AppError;
use crate::models::{MessageResponse, RegisterRequest};
use crate::rate_limit::{EndpointClass, RateLimiter};

/// Register a new customer (`POST /register`).
pub async fn register(
    ClientAddr(client): ClientAddr,
    Extension(limiter): Extension<Arc<RateLimiter>>,
    Extension(authenticator): Extension<Arc<Authenticator>>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, HeaderMap, Json<MessageResponse>), AppError> {
    debug!("POST /register: client={}", client);
    let allowance = admit(&limiter, &client, EndpointClass::Register)?;
    let Json(payload) = payload.map_err(body_rejected)?;

    let created = authenticator.register(payload).await?;
    info!(
        "POST /register: customer id={} username={} registered from client={}",
        created.id, created.username, client
    );

    Ok((
        StatusCode::CREATED,
        rate_limit_headers(&allowance),
        Json(MessageResponse {
            message: "User registered successfully.".to_string(),
        }),
    ))
}
