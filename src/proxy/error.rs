//! Errors raised while handling one proxied request.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// A failure on the request path that carries the status code to answer with.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    /// The incoming request target cannot be parsed into a URL.
    #[error("invalid url {url:?}, host {host}")]
    BadRequest { url: String, host: String },

    /// A redirect was requested but no redirect host could be resolved.
    #[error("no redirect URL found for {host}")]
    RedirectUnresolved { host: String },

    /// A URL could not be assembled from its parts.
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("{0}")]
    Internal(String),
}

impl ProxyError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ProxyError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ProxyError::RedirectUnresolved { .. }
            | ProxyError::InvalidUrl(_)
            | ProxyError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Plain-text response whose body is the reason phrase of `status`.
pub fn status_response(status: StatusCode) -> Response {
    let reason = status.canonical_reason().unwrap_or_default();
    (
        status,
        [(axum::http::header::CONTENT_TYPE, "text/plain")],
        reason,
    )
        .into_response()
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, status = status.as_u16(), "error proxying req");
        } else {
            tracing::info!(error = %self, status = status.as_u16(), "rejected req");
        }
        status_response(status)
    }
}
