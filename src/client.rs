use axum::extract::{ConnectInfo, FromRequest, RequestParts};
use std::convert::Infallible;
use std::net::SocketAddr;

use crate::constants::UNKNOWN_CLIENT;

/// Whether `X-Forwarded-For` may be used as the client address. Only enable
/// this behind a single trusted proxy. The rightmost hop is the one that
/// proxy appended; anything to its left is client-supplied.
#[derive(Debug, Clone, Copy)]
pub struct TrustForwardedFor(pub bool);

/// The identifier rate-limit windows are keyed by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientAddr(pub String);

#[axum::async_trait]
impl<B> FromRequest<B> for ClientAddr
where
    B: Send,
{
    type Rejection = Infallible;

    async fn from_request(req: &mut RequestParts<B>) -> Result<Self, Self::Rejection> {
        let trust_forwarded = req
            .extensions()
            .and_then(|ext| ext.get::<TrustForwardedFor>())
            .map(|t| t.0)
            .unwrap_or(false);

        if trust_forwarded {
            let forwarded = req
                .headers()
                .and_then(|headers| headers.get("x-forwarded-for"))
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.rsplit(',').next())
                .map(str::trim)
                .filter(|hop| !hop.is_empty());
            if let Some(hop) = forwarded {
                return Ok(ClientAddr(hop.to_string()));
            }
        }

        let peer = req
            .extensions()
            .and_then(|ext| ext.get::<ConnectInfo<SocketAddr>>())
            .map(|ConnectInfo(addr)| addr.ip().to_string());

        Ok(ClientAddr(
            peer.unwrap_or_else(|| UNKNOWN_CLIENT.to_string()),
        ))
    }
}
