//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! RuntimeConfig (inline PEM or file paths)
//!     → tls.rs (credential resolution, rustls server config)
//!     → HTTPS listener (http::server)
//! ```

pub mod tls;

pub use tls::{prepare_https_credentials, rustls_config, TlsCredentials, TlsError};
