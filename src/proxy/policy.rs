//! Pre-forwarding policy chain.
//!
//! # Responsibilities
//! - Force redirect for routes configured with `forceRedirect`
//! - Reject hosts with no route (404)
//! - Redirect plaintext traffic to its encrypted counterpart
//!
//! # Data Flow
//! ```text
//! WorkingProxy ──▶ force_redirect ──▶ destination_not_found ──▶ force_upgrade ──▶ forwarder
//!                      │ end                 │ end                    │ end
//!                      ▼                     ▼                        ▼
//!                  Responder (HTTP response or pre-handshake upgrade reply)
//! ```
//!
//! # Design Decisions
//! - Policies are plain functions in a fixed-order array
//! - The responder is a trait object so HTTP and WebSocket upgrades share the chain

use axum::http::StatusCode;
use url::Url;

use crate::proxy::error::ProxyError;
use crate::proxy::redirect::{get_redirect_url, RedirectOverride};
use crate::proxy::working::WorkingProxy;

/// How a policy answers the client when it ends the exchange.
pub trait Responder {
    fn respond_not_found(&mut self);

    fn respond_redirect(
        &mut self,
        working: &WorkingProxy,
        redirect_override: Option<&RedirectOverride>,
    ) -> Result<(), ProxyError>;
}

/// Status and target of a redirect, shared by every [`Responder`].
pub fn redirect_target(
    working: &WorkingProxy,
    redirect_override: Option<&RedirectOverride>,
) -> Result<(StatusCode, Url), ProxyError> {
    let status = if working.use_permanent_redirect() {
        StatusCode::PERMANENT_REDIRECT
    } else {
        StatusCode::TEMPORARY_REDIRECT
    };

    let url = get_redirect_url(working, redirect_override)?.ok_or_else(|| {
        ProxyError::RedirectUnresolved {
            host: working.host.clone(),
        }
    })?;

    Ok((status, url))
}

pub type Policy = fn(WorkingProxy, &mut dyn Responder) -> Result<WorkingProxy, ProxyError>;

pub const POLICY_CHAIN: [Policy; 3] = [force_redirect, destination_not_found, force_upgrade];

/// Run every policy in order until one ends the exchange.
pub fn run_policy_chain(
    mut working: WorkingProxy,
    responder: &mut dyn Responder,
) -> Result<WorkingProxy, ProxyError> {
    for policy in POLICY_CHAIN {
        working = policy(working, responder)?;
        if working.end {
            break;
        }
    }
    Ok(working)
}

pub fn force_redirect(
    working: WorkingProxy,
    responder: &mut dyn Responder,
) -> Result<WorkingProxy, ProxyError> {
    if !working.force_redirect() {
        return Ok(working.ended(false));
    }

    if working.redirect_host().is_none() {
        if working.config.debug {
            tracing::debug!(host = %working.host, "No redirect host found");
        }
        return Ok(working.ended(false));
    }

    responder.respond_redirect(&working, None)?;
    Ok(working.ended(true))
}

pub fn destination_not_found(
    working: WorkingProxy,
    responder: &mut dyn Responder,
) -> Result<WorkingProxy, ProxyError> {
    if working.destination.is_none() {
        if working.config.debug {
            tracing::debug!(host = %working.host, "no route for host");
        }
        responder.respond_not_found();
        return Ok(working.ended(true));
    }

    Ok(working.ended(false))
}

pub fn force_upgrade(
    working: WorkingProxy,
    responder: &mut dyn Responder,
) -> Result<WorkingProxy, ProxyError> {
    let Some(redirect_protocol) = working.protocol.upgraded() else {
        return Ok(working.ended(false));
    };

    if !working.force_upgrade() {
        return Ok(working.ended(false));
    }

    let redirect_override = RedirectOverride {
        redirect_protocol: Some(redirect_protocol),
        allow_redirect_to_incoming_host: true,
    };
    responder.respond_redirect(&working, Some(&redirect_override))?;
    Ok(working.ended(true))
}
