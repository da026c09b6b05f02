//! Redirect target computation.
//!
//! The redirect host comes from the route, then the server config, and (for
//! protocol upgrades only) the incoming host. The incoming path, query and
//! credentials are carried over according to `redirectURLParts`.
//! Fragments never reach the server, so they are never part of the target.

use url::Url;

use crate::config::{Protocol, RedirectUrlParts, RedirectUrlSpecificParts};
use crate::proxy::error::ProxyError;
use crate::proxy::working::WorkingProxy;

/// Per-call adjustments made by a policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct RedirectOverride {
    /// Scheme of the target. Defaults to the request protocol.
    pub redirect_protocol: Option<Protocol>,
    /// Fall back to the incoming host when no redirect host is configured.
    pub allow_redirect_to_incoming_host: bool,
}

/// Compute the redirect target, or `None` when no host resolves.
pub fn get_redirect_url(
    working: &WorkingProxy,
    redirect_override: Option<&RedirectOverride>,
) -> Result<Option<Url>, ProxyError> {
    let allow_incoming = redirect_override.is_some_and(|o| o.allow_redirect_to_incoming_host);

    let redirect_host = match working.redirect_host() {
        Some(host) => host.to_string(),
        None if allow_incoming => match working.incoming_host() {
            Some(host) => host,
            None => return Ok(None),
        },
        None => return Ok(None),
    };

    let parts = match working.redirect_url_parts() {
        Some(RedirectUrlParts::All(_)) => RedirectUrlSpecificParts::ALL,
        Some(RedirectUrlParts::Specific(parts)) => parts,
        None => RedirectUrlSpecificParts::DEFAULT_POLICY,
    };

    let protocol = redirect_override
        .and_then(|o| o.redirect_protocol)
        .unwrap_or(working.protocol);

    let mut url = Url::parse(&format!("{protocol}//{redirect_host}"))
        .map_err(|e| ProxyError::InvalidUrl(format!("{protocol}//{redirect_host}: {e}")))?;
    let incoming = &working.incoming_url;

    if parts.pathname == Some(true) {
        url.set_path(incoming.path());
    }

    match parts.search {
        Some(true) => url.set_query(incoming.query().filter(|q| !q.is_empty())),
        Some(false) => url.set_query(None),
        None => {}
    }

    let credentials_error = || ProxyError::InvalidUrl(format!("cannot set credentials on {redirect_host}"));
    match parts.username {
        Some(true) => url.set_username(incoming.username()).map_err(|_| credentials_error())?,
        Some(false) => url.set_username("").map_err(|_| credentials_error())?,
        None => {}
    }

    match parts.password {
        Some(true) => url.set_password(incoming.password()).map_err(|_| credentials_error())?,
        Some(false) => url.set_password(None).map_err(|_| credentials_error())?,
        None => {}
    }

    Ok(Some(url))
}
