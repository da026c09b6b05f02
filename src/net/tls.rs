//! TLS configuration and certificate loading.
//!
//! # Responsibilities
//! - Resolve the certificate chain and private key (inline PEM or file)
//! - Build the rustls server config for the HTTPS listener
//! - Install the process-wide crypto provider
//!
//! # Design Decisions
//! - Inline PEM wins over a file path
//! - Files are read asynchronously at startup only

use axum_server::tls_rustls::RustlsConfig;

use crate::config::RuntimeConfig;

/// Error type for TLS setup.
#[derive(Debug, thiserror::Error)]
pub enum TlsError {
    #[error("httpsPrivateKey or httpsPrivateKeyFilepath not provided")]
    MissingPrivateKey,
    #[error("httpsPublicKey or httpsPublicKeyFilepath not provided")]
    MissingCertificate,
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid TLS credentials: {0}")]
    Invalid(#[source] std::io::Error),
}

/// PEM material for the HTTPS listener.
#[derive(Clone)]
pub struct TlsCredentials {
    pub private_key_pem: String,
    pub certificate_pem: String,
}

impl std::fmt::Debug for TlsCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsCredentials")
            .field("certificate_pem", &self.certificate_pem)
            .field("private_key_pem", &"<redacted>")
            .finish()
    }
}

/// Install the aws-lc-rs provider as the rustls default. Later calls are no-ops.
pub fn install_crypto_provider() {
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
}

async fn resolve_pem(
    inline: Option<&String>,
    filepath: Option<&String>,
    missing: TlsError,
) -> Result<String, TlsError> {
    if let Some(pem) = inline.filter(|v| !v.is_empty()) {
        return Ok(pem.clone());
    }

    let Some(path) = filepath.filter(|v| !v.is_empty()) else {
        return Err(missing);
    };

    tokio::fs::read_to_string(path)
        .await
        .map_err(|source| TlsError::Read {
            path: path.clone(),
            source,
        })
}

/// Resolve the key and certificate configured for the HTTPS listener.
pub async fn prepare_https_credentials(config: &RuntimeConfig) -> Result<TlsCredentials, TlsError> {
    let private_key_pem = resolve_pem(
        config.https_private_key.as_ref(),
        config.https_private_key_filepath.as_ref(),
        TlsError::MissingPrivateKey,
    )
    .await?;
    let certificate_pem = resolve_pem(
        config.https_public_key.as_ref(),
        config.https_public_key_filepath.as_ref(),
        TlsError::MissingCertificate,
    )
    .await?;

    Ok(TlsCredentials {
        private_key_pem,
        certificate_pem,
    })
}

/// Build the rustls server config from PEM material.
pub async fn rustls_config(credentials: TlsCredentials) -> Result<RustlsConfig, TlsError> {
    install_crypto_provider();
    RustlsConfig::from_pem(
        credentials.certificate_pem.into_bytes(),
        credentials.private_key_pem.into_bytes(),
    )
    .await
    .map_err(TlsError::Invalid)
}
