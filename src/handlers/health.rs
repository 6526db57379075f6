use axum::extract::Extension;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use log::error;
use std::sync::Arc;

use super::{admit, rate_limit_headers};
use crate::client::ClientAddr;
use crate::constants::LIVENESS_MESSAGE;
use crate::error::AppError;
use crate::models::HealthResponse;
use crate::rate_limit::{EndpointClass, RateLimiter};
use crate::store::CustomerStore;

/// Liveness probe (`GET /get`). Shares the login allowance.
pub async fn liveness(
    ClientAddr(client): ClientAddr,
    Extension(limiter): Extension<Arc<RateLimiter>>,
) -> Result<(StatusCode, HeaderMap, &'static str), AppError> {
    let allowance = admit(&limiter, &client, EndpointClass::Login)?;
    Ok((StatusCode::OK, rate_limit_headers(&allowance), LIVENESS_MESSAGE))
}

/// Health check that verifies store connectivity (`GET /health`).
pub async fn health_check(
    Extension(store): Extension<Arc<dyn CustomerStore>>,
) -> Json<HealthResponse> {
    let database = match store.ping().await {
        Ok(()) => "ok",
        Err(e) => {
            error!("health_check: store error: {}", e);
            "error"
        }
    };

    let status = if database == "ok" { "healthy" } else { "degraded" };

    Json(HealthResponse {
        status: status.to_string(),
        database: database.to_string(),
    })
}
