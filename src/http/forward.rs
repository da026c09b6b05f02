//! HTTP forwarding to a route's origins.
//!
//! # Responsibilities
//! - Pick the next HTTP-family origin for the route
//! - Rebuild the request URI against that origin
//! - Stream request and response bodies without buffering
//!
//! # Data Flow
//! ```text
//! client body ──▶ hyper client ──▶ origin
//! client      ◀── axum Body    ◀── origin response (status/headers verbatim)
//! ```
//!
//! # Design Decisions
//! - One pooled client shared by every listener
//! - Origin failures are never retried

use std::net::SocketAddr;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Response, StatusCode, Uri, Version};
use http_body_util::BodyExt;
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;

use crate::config::{OriginConfig, ProtocolFamily};
use crate::http::request::{
    apply_forwarding_headers, restore_host_header, strip_upgrade_headers,
};
use crate::http::response::HttpResponder;
use crate::net::tls::install_crypto_provider;
use crate::proxy::error::{status_response, ProxyError};
use crate::proxy::policy::run_policy_chain;
use crate::proxy::working::WorkingProxy;

pub type ProxyClient = Client<HttpsConnector<HttpConnector>, Body>;

/// Pooled client able to reach both `http:` and `https:` origins.
pub fn build_client() -> ProxyClient {
    install_crypto_provider();

    let mut connector = HttpConnector::new();
    connector.set_nodelay(true);
    connector.enforce_http(false);
    connector.set_connect_timeout(Some(Duration::from_secs(10)));

    let connector = HttpsConnectorBuilder::new()
        .with_webpki_roots()
        .https_or_http()
        .enable_http1()
        .wrap_connector(connector);

    Client::builder(TokioExecutor::new())
        .pool_idle_timeout(Duration::from_secs(60))
        .build(connector)
}

/// Origin URI for the incoming URL. The fragment is never sent.
pub fn origin_uri(origin: &OriginConfig, incoming: &url::Url) -> Result<Uri, ProxyError> {
    let mut target = format!(
        "{}://{}:{}{}",
        origin.origin_protocol.scheme(),
        origin.origin_host,
        origin.origin_port,
        incoming.path()
    );
    if let Some(query) = incoming.query() {
        target.push('?');
        target.push_str(query);
    }

    target
        .parse()
        .map_err(|e| ProxyError::InvalidUrl(format!("{target}: {e}")))
}

/// Run the policy chain for an HTTP exchange and forward it when nothing
/// ended the exchange first.
pub async fn proxy_http_request(
    client: &ProxyClient,
    working: WorkingProxy,
    peer: SocketAddr,
    request: Request<Body>,
) -> Result<Response<Body>, ProxyError> {
    let mut responder = HttpResponder::new();
    let working = run_policy_chain(working, &mut responder)?;
    if let Some(response) = responder.take() {
        return Ok(response);
    }

    let Some(destination) = working.destination.as_ref().filter(|_| !working.end) else {
        return Ok(status_response(StatusCode::NOT_FOUND));
    };

    let Some(origin) = destination.select_origin(ProtocolFamily::Http) else {
        tracing::info!(host = %working.host, "no http origin for route");
        return Ok(status_response(StatusCode::NOT_FOUND));
    };

    tracing::info!("{} routed to {}", working.host, origin);

    let (mut parts, body) = request.into_parts();
    if working.config.debug {
        tracing::debug!(headers = ?parts.headers, "incoming headers");
    }

    restore_host_header(&mut parts.headers, &parts.uri);
    strip_upgrade_headers(&mut parts.headers);
    parts.uri = origin_uri(origin, &working.incoming_url)?;
    parts.version = Version::HTTP_11;
    apply_forwarding_headers(&mut parts.headers, destination.override_host.as_deref());

    if working.config.debug {
        tracing::debug!(uri = %parts.uri, headers = ?parts.headers, "outgoing headers");
    }

    let body = Body::new(body.map_err(move |e| {
        tracing::error!(peer = %peer, error = %e, "error reading client body");
        e
    }));

    let origin_desc = origin.to_string();
    match client.request(Request::from_parts(parts, body)).await {
        Ok(response) => {
            let (parts, body) = response.into_parts();
            let body = body.map_err(move |e| {
                tracing::error!(origin = %origin_desc, error = %e, "error reading origin body");
                e
            });
            Ok(Response::from_parts(parts, Body::new(body)))
        }
        Err(e) => {
            tracing::error!(
                peer = %peer,
                origin = %origin,
                error = %e,
                "error proxying request"
            );
            Ok(status_response(StatusCode::INTERNAL_SERVER_ERROR))
        }
    }
}
