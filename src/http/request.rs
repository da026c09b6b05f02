//! Outbound request preparation.
//!
//! # Responsibilities
//! - Detect WebSocket upgrade requests
//! - Rewrite `host` and `x-forwarded-host` for the origin
//! - Recover `host` from the `:authority` of HTTP/2 requests
//!
//! # Design Decisions
//! - The forwarded-host chain appends the raw incoming `Host` header, not
//!   the resolved effective host
//! - A route's `overrideHost` replaces both headers outright

use axum::http::{header, HeaderMap, HeaderValue, Uri};

use crate::proxy::working::X_FORWARDED_HOST;

/// True when the request asks for a WebSocket upgrade.
pub fn is_websocket_upgrade(headers: &HeaderMap) -> bool {
    let upgrade = headers
        .get(header::UPGRADE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.eq_ignore_ascii_case("websocket"));

    let connection = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .any(|token| token.trim().eq_ignore_ascii_case("upgrade"));

    upgrade && connection
}

/// Insert the URI authority as `host` when the request carries none.
/// HTTP/2 clients send only `:authority`.
pub fn restore_host_header(headers: &mut HeaderMap, uri: &Uri) {
    if headers.contains_key(header::HOST) {
        return;
    }
    let authority = uri
        .authority()
        .and_then(|a| HeaderValue::from_str(a.as_str()).ok());
    if let Some(authority) = authority {
        headers.insert(header::HOST, authority);
    }
}

/// Drop the upgrade handshake from a request forwarded as plain HTTP.
pub fn strip_upgrade_headers(headers: &mut HeaderMap) {
    if headers.remove(header::UPGRADE).is_some() {
        headers.remove(header::CONNECTION);
    }
}

/// `x-forwarded-host` chain for the origin: the incoming chain with the
/// incoming `Host` appended, or just the incoming `Host`.
pub fn new_forwarded_host(headers: &HeaderMap) -> Option<String> {
    let host = headers.get(header::HOST).and_then(|v| v.to_str().ok())?;
    let forwarded = headers
        .get(X_FORWARDED_HOST)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty());

    Some(match forwarded {
        Some(forwarded) => format!("{forwarded},{host}"),
        None => host.to_string(),
    })
}

/// Apply the host rewrite to headers already copied from the client.
pub fn apply_forwarding_headers(headers: &mut HeaderMap, override_host: Option<&str>) {
    let override_host = override_host
        .filter(|h| !h.is_empty())
        .and_then(|h| HeaderValue::from_str(h).ok());

    match override_host {
        Some(value) => {
            headers.insert(header::HOST, value.clone());
            headers.insert(X_FORWARDED_HOST, value);
        }
        None => {
            let chain = new_forwarded_host(headers).and_then(|v| HeaderValue::from_str(&v).ok());
            if let Some(chain) = chain {
                headers.insert(X_FORWARDED_HOST, chain);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn test_forwarded_host_chain() {
        let mut h = headers(&[("host", "a"), ("x-forwarded-host", "b")]);
        apply_forwarding_headers(&mut h, None);
        assert_eq!(h[X_FORWARDED_HOST], "b,a");
        assert_eq!(h[header::HOST], "a");

        let mut h = headers(&[("host", "a")]);
        apply_forwarding_headers(&mut h, None);
        assert_eq!(h[X_FORWARDED_HOST], "a");
    }

    #[test]
    fn test_override_host_replaces_both() {
        let mut h = headers(&[("host", "a"), ("x-forwarded-host", "b")]);
        apply_forwarding_headers(&mut h, Some("c"));
        assert_eq!(h[header::HOST], "c");
        assert_eq!(h[X_FORWARDED_HOST], "c");
    }

    #[test]
    fn test_missing_host_leaves_headers_alone() {
        let mut h = HeaderMap::new();
        apply_forwarding_headers(&mut h, None);
        assert!(h.get(X_FORWARDED_HOST).is_none());
    }

    #[test]
    fn test_http2_authority_restores_host() {
        let uri: Uri = "https://example.test/x".parse().unwrap();
        let mut h = HeaderMap::new();
        restore_host_header(&mut h, &uri);
        apply_forwarding_headers(&mut h, None);
        assert_eq!(h[header::HOST], "example.test");
        assert_eq!(h[X_FORWARDED_HOST], "example.test");

        let mut h = headers(&[("host", "a")]);
        restore_host_header(&mut h, &uri);
        assert_eq!(h[header::HOST], "a");

        let mut h = HeaderMap::new();
        restore_host_header(&mut h, &"/x".parse().unwrap());
        assert!(h.get(header::HOST).is_none());
    }

    #[test]
    fn test_strip_upgrade_headers() {
        let mut h = headers(&[
            ("upgrade", "websocket"),
            ("connection", "Upgrade"),
            ("x-custom", "kept"),
        ]);
        strip_upgrade_headers(&mut h);
        assert!(h.get(header::UPGRADE).is_none());
        assert!(h.get(header::CONNECTION).is_none());
        assert_eq!(h["x-custom"], "kept");

        let mut h = headers(&[("connection", "keep-alive")]);
        strip_upgrade_headers(&mut h);
        assert_eq!(h[header::CONNECTION], "keep-alive");
    }

    #[test]
    fn test_websocket_upgrade_detection() {
        assert!(is_websocket_upgrade(&headers(&[
            ("upgrade", "WebSocket"),
            ("connection", "keep-alive, Upgrade"),
        ])));
        assert!(!is_websocket_upgrade(&headers(&[("upgrade", "websocket")])));
        assert!(!is_websocket_upgrade(&headers(&[("connection", "upgrade")])));
    }
}
