//! Client address extraction from HTTP requests.

use axum::http::HeaderMap;
use std::net::SocketAddr;

/// Resolves the client IP for visit logging.
///
/// When `behind_proxy` is set, the first entry of `X-Forwarded-For` wins, then
/// `X-Real-IP`. Otherwise, or when neither header is usable, the socket peer
/// address is used. Returns an empty string if nothing is known.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>, behind_proxy: bool) -> String {
    if behind_proxy {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty());

        let real_ip = || {
            headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
        };

        if let Some(ip) = forwarded.or_else(real_ip) {
            return ip.to_string();
        }
    }

    peer.map(|addr| addr.ip().to_string()).unwrap_or_default()
}

/// Reads a header as a string, treating missing or non-UTF-8 values as empty.
pub fn header_string(headers: &HeaderMap, name: impl axum::http::header::AsHeaderName) -> String {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}
