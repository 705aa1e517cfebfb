use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};

use axum::extract::{ConnectInfo, FromRef, FromRequestParts};
use axum::http::HeaderMap;
use axum::http::request::Parts;
use ipnet::IpNet;

use crate::state::SharedState;

const UNKNOWN: &str = "unknown";

/// Client details attached to activity log entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub ip_address: String,
    pub user_agent: String,
}

impl Default for RequestContext {
    fn default() -> Self {
        Self {
            ip_address: UNKNOWN.to_string(),
            user_agent: UNKNOWN.to_string(),
        }
    }
}

impl RequestContext {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            ip_address: client_ip(headers),
            user_agent: header_str(headers, "user-agent")
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .unwrap_or(UNKNOWN)
                .to_string(),
        }
    }
}

/// First hop of `x-forwarded-for`, then `x-real-ip`, then "unknown".
fn client_ip(headers: &HeaderMap) -> String {
    let forwarded = header_str(headers, "x-forwarded-for")
        .and_then(|xff| xff.split(',').next())
        .map(str::trim)
        .filter(|s| !s.is_empty());

    forwarded
        .or_else(|| {
            header_str(headers, "x-real-ip")
                .map(str::trim)
                .filter(|s| !s.is_empty())
        })
        .unwrap_or(UNKNOWN)
        .to_string()
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(RequestContext::from_headers(&parts.headers))
    }
}

/// The address a request came from, for keying per-client limits.
///
/// Unlike [`RequestContext::ip_address`], forwarding headers are only honored
/// when the connecting peer is a configured trusted proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientAddr(pub IpAddr);

impl ClientAddr {
    pub fn resolve(headers: &HeaderMap, peer: Option<IpAddr>, trusted_proxies: &[IpNet]) -> Self {
        let peer = peer.unwrap_or(IpAddr::from([127, 0, 0, 1]));
        let is_trusted = |ip: &IpAddr| trusted_proxies.iter().any(|net| net.contains(ip));

        if !is_trusted(&peer) {
            return Self(peer);
        }

        let forwarded = header_str(headers, "x-forwarded-for")
            .into_iter()
            .flat_map(|xff| xff.split(','))
            .filter_map(|hop| hop.trim().parse::<IpAddr>().ok())
            .find(|ip| !is_trusted(ip));

        Self(forwarded.unwrap_or(peer))
    }
}

impl<S> FromRequestParts<S> for ClientAddr
where
    SharedState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = SharedState::from_ref(state);
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());
        Ok(ClientAddr::resolve(&parts.headers, peer, &state.config.trusted_proxies))
    }
}
