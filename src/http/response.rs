//! Terminal responses produced before forwarding.
//!
//! # Responsibilities
//! - 404 for unknown hosts and missing origins
//! - 307/308 redirects with `Location`
//! - Replies to WebSocket upgrades that never reach the handshake
//!
//! # Design Decisions
//! - Responders only record the response; the handler returns it
//! - Upgrade replies carry `Connection: close` and no body

use axum::body::Body;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::proxy::error::{status_response, ProxyError};
use crate::proxy::policy::{redirect_target, Responder};
use crate::proxy::redirect::RedirectOverride;
use crate::proxy::working::WorkingProxy;

fn location(url: &url::Url) -> Result<HeaderValue, ProxyError> {
    HeaderValue::from_str(url.as_str()).map_err(|e| ProxyError::InvalidUrl(e.to_string()))
}

/// Responder for plain HTTP exchanges.
#[derive(Debug, Default)]
pub struct HttpResponder {
    response: Option<Response>,
}

impl HttpResponder {
    pub fn new() -> Self {
        Self::default()
    }

    /// The recorded response, if a policy produced one.
    pub fn take(&mut self) -> Option<Response> {
        self.response.take()
    }
}

impl Responder for HttpResponder {
    fn respond_not_found(&mut self) {
        if self.response.is_none() {
            self.response = Some(status_response(StatusCode::NOT_FOUND));
        }
    }

    fn respond_redirect(
        &mut self,
        working: &WorkingProxy,
        redirect_override: Option<&RedirectOverride>,
    ) -> Result<(), ProxyError> {
        if self.response.is_some() {
            return Ok(());
        }

        let (status, url) = redirect_target(working, redirect_override)?;
        let response = (
            status,
            [
                (header::LOCATION, location(&url)?),
                (header::CONTENT_TYPE, HeaderValue::from_static("text/plain")),
            ],
            format!("Redirecting to {url}"),
        )
            .into_response();

        self.response = Some(response);
        Ok(())
    }
}

/// Responder for WebSocket upgrade requests rejected before the handshake.
#[derive(Debug, Default)]
pub struct UpgradeResponder {
    response: Option<Response>,
}

impl UpgradeResponder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&mut self) -> Option<Response> {
        self.response.take()
    }

    fn reply(status: StatusCode, location: Option<HeaderValue>) -> Response {
        let mut builder = Response::builder()
            .status(status)
            .header(header::CONTENT_TYPE, "text/plain")
            .header(header::CONNECTION, "close");
        if let Some(location) = location {
            builder = builder.header(header::LOCATION, location);
        }
        builder
            .body(Body::empty())
            .unwrap_or_else(|_| status_response(StatusCode::INTERNAL_SERVER_ERROR))
    }
}

impl Responder for UpgradeResponder {
    fn respond_not_found(&mut self) {
        self.response = Some(Self::reply(StatusCode::NOT_FOUND, None));
    }

    fn respond_redirect(
        &mut self,
        working: &WorkingProxy,
        redirect_override: Option<&RedirectOverride>,
    ) -> Result<(), ProxyError> {
        let (status, url) = redirect_target(working, redirect_override)?;
        self.response = Some(Self::reply(status, Some(location(&url)?)));
        Ok(())
    }
}
