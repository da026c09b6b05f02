//! Request context ("working proxy") construction.
//!
//! # Responsibilities
//! - Resolve the effective host (`x-forwarded-host` first segment, else `Host`)
//! - Parse the incoming URL against that host
//! - Look up the destination route
//! - Expose route-over-config settings in one place

use std::sync::Arc;

use axum::http::{header, HeaderMap, Uri};
use url::Url;

use crate::config::schema::layered;
use crate::config::{Protocol, RedirectUrlParts, RuntimeConfig};
use crate::proxy::error::ProxyError;
use crate::routing::{Route, RoutingTable};

pub const X_FORWARDED_HOST: &str = "x-forwarded-host";

/// Per-request routing context. Only `end` changes after construction.
#[derive(Debug, Clone)]
pub struct WorkingProxy {
    pub protocol: Protocol,
    pub incoming_url: Url,
    pub host: String,
    pub destination: Option<Arc<Route>>,
    pub config: Arc<RuntimeConfig>,
    /// A terminal response has been produced; nothing further runs.
    pub end: bool,
}

impl WorkingProxy {
    /// Build the context for an inbound request or upgrade.
    pub fn build(
        uri: &Uri,
        headers: &HeaderMap,
        protocol: Protocol,
        config: Arc<RuntimeConfig>,
        routes: &RoutingTable,
    ) -> Result<Self, ProxyError> {
        let host = effective_host(uri, headers);
        let incoming_url = incoming_url(uri, &host)?;
        let destination = routes.lookup(&host);

        Ok(Self {
            protocol,
            incoming_url,
            host,
            destination,
            config,
            end: false,
        })
    }

    pub fn ended(self, end: bool) -> Self {
        Self { end, ..self }
    }

    /// `host[:port]` of the incoming URL, as a browser would print it.
    pub fn incoming_host(&self) -> Option<String> {
        url_host(&self.incoming_url)
    }

    pub fn redirect_host(&self) -> Option<&str> {
        layered(
            self.destination.as_ref().and_then(|d| d.redirect_host.as_ref()),
            self.config.redirect_host.as_ref(),
        )
        .map(String::as_str)
    }

    pub fn redirect_url_parts(&self) -> Option<RedirectUrlParts> {
        layered(
            self.destination.as_ref().and_then(|d| d.redirect_url_parts.as_ref()),
            self.config.redirect_url_parts.as_ref(),
        )
        .copied()
    }

    pub fn force_upgrade(&self) -> bool {
        layered(
            self.destination.as_ref().and_then(|d| d.force_upgrade_http_to_https.as_ref()),
            self.config.force_upgrade_http_to_https.as_ref(),
        )
        .is_some()
    }

    pub fn use_permanent_redirect(&self) -> bool {
        layered(
            self.destination.as_ref().and_then(|d| d.use_permanent_redirect.as_ref()),
            self.config.use_permanent_redirect.as_ref(),
        )
        .is_some()
    }

    pub fn force_redirect(&self) -> bool {
        self.destination
            .as_ref()
            .and_then(|d| d.force_redirect)
            .unwrap_or(false)
    }
}

/// The host a request is addressed to: the first `x-forwarded-host` entry
/// when present and non-empty, else the `Host` header, else the URI
/// authority, else empty.
pub fn effective_host(uri: &Uri, headers: &HeaderMap) -> String {
    let forwarded = headers
        .get(X_FORWARDED_HOST)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty());

    if let Some(forwarded) = forwarded {
        return match forwarded.split_once(',') {
            Some((first, _)) => first.to_string(),
            None => forwarded.to_string(),
        };
    }

    headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .or_else(|| uri.authority().map(|a| a.to_string()))
        .unwrap_or_default()
}

/// Resolve the request target against `http://{host}`.
pub fn incoming_url(uri: &Uri, host: &str) -> Result<Url, ProxyError> {
    let target = uri.to_string();
    let bad_request = || ProxyError::BadRequest {
        url: target.clone(),
        host: host.to_string(),
    };

    let base = Url::parse(&format!("http://{host}")).map_err(|_| bad_request())?;
    base.join(&target).map_err(|_| bad_request())
}

/// `host[:port]` of a URL; the port is omitted when it is the scheme default.
pub fn url_host(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    })
}
