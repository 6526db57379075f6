use axum::extract::Extension;
use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use log::warn;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::auth::Authenticator;
use crate::client::TrustForwardedFor;
use crate::handlers::{health, login, register};
use crate::rate_limit::RateLimiter;
use crate::store::CustomerStore;

/// Shared services handed to every request through extensions.
#[derive(Clone)]
pub struct Services {
    pub authenticator: Arc<Authenticator>,
    pub limiter: Arc<RateLimiter>,
    pub store: Arc<dyn CustomerStore>,
}

/// Build the HTTP router with its middleware stack.
pub fn build_router(services: Services, cors_origin: &str, trust_forwarded_for: bool) -> Router {
    Router::new()
        .route("/register", post(register::register))
        .route("/login", post(login::login))
        .route("/get", get(health::liveness))
        .route("/health", get(health::health_check))
        .layer(cors_layer(cors_origin))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("SAMEORIGIN"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::STRICT_TRANSPORT_SECURITY,
            HeaderValue::from_static("max-age=15552000; includeSubDomains"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::REFERRER_POLICY,
            HeaderValue::from_static("no-referrer"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::CONTENT_SECURITY_POLICY,
            HeaderValue::from_static("default-src 'self'"),
        ))
        .layer(TraceLayer::new_for_http())
        .layer(Extension(services.authenticator))
        .layer(Extension(services.limiter))
        .layer(Extension(services.store))
        .layer(Extension(TrustForwardedFor(trust_forwarded_for)))
}

/// Allow the web form's origin with credentials, or any origin without them
/// when configured as `*`.
fn cors_layer(origin: &str) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods(vec![Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(vec![header::CONTENT_TYPE]);

    if origin == "*" {
        return base.allow_origin(Any);
    }

    match HeaderValue::from_str(origin) {
        Ok(value) => base
            .allow_origin(AllowOrigin::exact(value))
            .allow_credentials(true),
        Err(e) => {
            warn!(
                "cors: ignoring invalid allowed origin {:?}: {}; cross-origin requests will be refused",
                origin, e
            );
            base
        }
    }
}
