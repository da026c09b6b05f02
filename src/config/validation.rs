//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Exposed listeners must have a port
//! - HTTPS must have a key and a certificate source
//! - Every route needs a non-empty routing key
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: RuntimeConfig → Result<(), Vec<ValidationError>>
//! - Duplicate routing keys are tolerated (last one wins) and only logged

use std::collections::HashSet;
use crate::config::schema::RuntimeConfig;

/// A single semantic problem with a config.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("exposeHttpProxy is true but httpPort not provided")]
    MissingHttpPort,
    #[error("exposeHttpsProxy is true but httpsPort not provided")]
    MissingHttpsPort,
    #[error("exposeHttpsProxy is true but httpsPrivateKeyFilepath or httpsPrivateKey not provided")]
    MissingPrivateKey,
    #[error("exposeHttpsProxy is true but httpsPublicKeyFilepath or httpsPublicKey not provided")]
    MissingCertificate,
    #[error("route {index} has an empty incomingHostAndPort")]
    EmptyIncomingHost { index: usize },
}

fn provided(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.is_empty())
}

/// Check a config for problems serde cannot catch.
pub fn validate_config(config: &RuntimeConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.expose_http_proxy && config.http_port.is_none() {
        errors.push(ValidationError::MissingHttpPort);
    }

    if config.expose_https_proxy {
        if config.https_port.is_none() {
            errors.push(ValidationError::MissingHttpsPort);
        }
        if !provided(&config.https_private_key) && !provided(&config.https_private_key_filepath) {
            errors.push(ValidationError::MissingPrivateKey);
        }
        if !provided(&config.https_public_key) && !provided(&config.https_public_key_filepath) {
            errors.push(ValidationError::MissingCertificate);
        }
    }

    if config.expose_ws_proxy_for_http && !config.expose_http_proxy {
        tracing::warn!("exposeWsProxyForHttp is set but the HTTP listener is not exposed");
    }
    if config.expose_ws_proxy_for_https && !config.expose_https_proxy {
        tracing::warn!("exposeWsProxyForHttps is set but the HTTPS listener is not exposed");
    }

    let mut seen = HashSet::new();
    for (index, route) in config.routes.iter().enumerate() {
        if route.incoming_host_and_port.is_empty() {
            errors.push(ValidationError::EmptyIncomingHost { index });
            continue;
        }
        if !seen.insert(route.incoming_host_and_port.to_lowercase()) {
            tracing::warn!(
                incoming_host_and_port = %route.incoming_host_and_port,
                "Duplicate route, the last definition wins"
            );
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
