//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! Field names follow the JSON config surface (camelCase), so an existing
//! config file deserializes without translation.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Root configuration for the proxy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RuntimeConfig {
    /// Expose the plain HTTP listener.
    pub expose_http_proxy: bool,

    /// Port for the HTTP listener.
    #[serde(deserialize_with = "deserialize_port")]
    pub http_port: Option<u16>,

    /// Expose the TLS listener.
    pub expose_https_proxy: bool,

    /// Port for the HTTPS listener.
    #[serde(deserialize_with = "deserialize_port")]
    pub https_port: Option<u16>,

    /// Accept WebSocket upgrades on the HTTP listener.
    pub expose_ws_proxy_for_http: bool,

    /// Accept WebSocket upgrades on the HTTPS listener.
    pub expose_ws_proxy_for_https: bool,

    /// Path to the certificate chain (PEM).
    pub https_public_key_filepath: Option<String>,

    /// Path to the private key (PEM).
    pub https_private_key_filepath: Option<String>,

    /// Inline certificate chain (PEM). Wins over the file path.
    pub https_public_key: Option<String>,

    /// Inline private key (PEM). Wins over the file path.
    pub https_private_key: Option<String>,

    /// Route definitions, keyed by incoming host and port.
    pub routes: Vec<RouteConfig>,

    /// Redirect `http:`/`ws:` traffic to `https:`/`wss:` for every route.
    pub force_upgrade_http_to_https: Option<bool>,

    /// Use 308 instead of 307 for redirects.
    pub use_permanent_redirect: Option<bool>,

    /// Host (and optional port) redirects point at.
    pub redirect_host: Option<String>,

    /// Which parts of the incoming URL survive a redirect.
    #[serde(rename = "redirectURLParts")]
    pub redirect_url_parts: Option<RedirectUrlParts>,

    /// Verbose logging of routing decisions and header sets.
    pub debug: bool,

    /// Interface the listeners bind to.
    pub bind_address: String,

    /// Drain deadline on shutdown. `None` waits for every connection.
    pub shutdown_timeout_secs: Option<u64>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            expose_http_proxy: false,
            http_port: None,
            expose_https_proxy: false,
            https_port: None,
            expose_ws_proxy_for_http: false,
            expose_ws_proxy_for_https: false,
            https_public_key_filepath: None,
            https_private_key_filepath: None,
            https_public_key: None,
            https_private_key: None,
            routes: Vec::new(),
            force_upgrade_http_to_https: None,
            use_permanent_redirect: None,
            redirect_host: None,
            redirect_url_parts: None,
            debug: false,
            bind_address: "0.0.0.0".to_string(),
            shutdown_timeout_secs: None,
        }
    }
}

/// One routing rule.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteConfig {
    /// Routing key, matched case-insensitively against the effective host.
    pub incoming_host_and_port: String,

    /// Candidate origins, in round-robin order.
    #[serde(default)]
    pub origin: Vec<OriginConfig>,

    #[serde(default)]
    pub force_upgrade_http_to_https: Option<bool>,

    #[serde(default)]
    pub force_redirect: Option<bool>,

    #[serde(default)]
    pub use_permanent_redirect: Option<bool>,

    #[serde(default)]
    pub redirect_host: Option<String>,

    #[serde(default, rename = "redirectURLParts")]
    pub redirect_url_parts: Option<RedirectUrlParts>,

    /// Replaces both `host` and `x-forwarded-host` on the outbound request.
    #[serde(default)]
    pub override_host: Option<String>,
}

/// One backend target.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OriginConfig {
    pub origin_host: String,
    pub origin_port: u16,
    pub origin_protocol: Protocol,
}

impl fmt::Display for OriginConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}//{}:{}", self.origin_protocol, self.origin_host, self.origin_port)
    }
}

/// Wire protocol of a listener, request or origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum Protocol {
    #[serde(rename = "http:", alias = "http")]
    Http,
    #[serde(rename = "https:", alias = "https")]
    Https,
    #[serde(rename = "ws:", alias = "ws")]
    Ws,
    #[serde(rename = "wss:", alias = "wss")]
    Wss,
}

/// Protocol class used to filter a route's origins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolFamily {
    Http,
    Ws,
}

impl Protocol {
    /// URL scheme without the trailing colon.
    pub fn scheme(self) -> &'static str {
        match self {
            Protocol::Http => "http",
            Protocol::Https => "https",
            Protocol::Ws => "ws",
            Protocol::Wss => "wss",
        }
    }

    pub fn family(self) -> ProtocolFamily {
        match self {
            Protocol::Http | Protocol::Https => ProtocolFamily::Http,
            Protocol::Ws | Protocol::Wss => ProtocolFamily::Ws,
        }
    }

    /// The encrypted counterpart for plaintext protocols.
    pub fn upgraded(self) -> Option<Protocol> {
        match self {
            Protocol::Http => Some(Protocol::Https),
            Protocol::Ws => Some(Protocol::Wss),
            Protocol::Https | Protocol::Wss => None,
        }
    }

    /// The WebSocket protocol carried over this HTTP protocol.
    pub fn websocket(self) -> Protocol {
        match self {
            Protocol::Http | Protocol::Ws => Protocol::Ws,
            Protocol::Https | Protocol::Wss => Protocol::Wss,
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.scheme())
    }
}

/// `redirectURLParts`: either a blanket boolean or per-part flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum RedirectUrlParts {
    All(bool),
    Specific(RedirectUrlSpecificParts),
}

/// Per-part redirect flags. `None` leaves the part at its fresh-URL default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct RedirectUrlSpecificParts {
    pub pathname: Option<bool>,
    pub search: Option<bool>,
    pub username: Option<bool>,
    pub password: Option<bool>,
}

impl RedirectUrlSpecificParts {
    pub const ALL: Self = Self {
        pathname: Some(true),
        search: Some(true),
        username: Some(true),
        password: Some(true),
    };

    /// Applied when neither the route nor the config says anything:
    /// keep path and query, drop credentials.
    pub const DEFAULT_POLICY: Self = Self {
        pathname: Some(true),
        search: Some(true),
        username: Some(false),
        password: Some(false),
    };
}

/// A setting that can be "unset" even when present, so that a route value
/// only overrides the server-wide value when it actually says something.
pub trait Setting {
    fn is_set(&self) -> bool;
}

impl Setting for bool {
    fn is_set(&self) -> bool {
        *self
    }
}

impl Setting for String {
    fn is_set(&self) -> bool {
        !self.is_empty()
    }
}

impl Setting for RedirectUrlParts {
    fn is_set(&self) -> bool {
        !matches!(self, RedirectUrlParts::All(false))
    }
}

/// Route-over-config precedence: the route value wins when set, then the
/// server-wide value when set, otherwise nothing.
pub fn layered<'a, T: Setting>(route: Option<&'a T>, server: Option<&'a T>) -> Option<&'a T> {
    route
        .filter(|v| v.is_set())
        .or_else(|| server.filter(|v| v.is_set()))
}

/// Accepts `"8080"` as well as `8080`.
fn deserialize_port<'de, D>(deserializer: D) -> Result<Option<u16>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Port {
        Number(u16),
        Text(String),
    }

    match Option::<Port>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Port::Number(port)) => Ok(Some(port)),
        Some(Port::Text(text)) if text.trim().is_empty() => Ok(None),
        Some(Port::Text(text)) => text
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("invalid port {text:?}"))),
    }
}
