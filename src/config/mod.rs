//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (JSON)
//!     → loader.rs (read & deserialize)
//!     → validation.rs (semantic checks)
//!     → RuntimeConfig (validated, immutable)
//!     → shared via Arc to every listener and request
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; routes can be swapped wholesale
//! - All fields have defaults to allow minimal configs
//! - Route-level settings override server-wide ones through one helper
//!   (`schema::layered`) instead of ad-hoc fallbacks at call sites

pub mod loader;
pub mod schema;
pub mod validation;

pub use schema::{
    OriginConfig, Protocol, ProtocolFamily, RedirectUrlParts, RedirectUrlSpecificParts,
    RouteConfig, RuntimeConfig,
};
