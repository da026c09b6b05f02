//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → tracing events with structured fields (host, origin, peer, error)
//!     → logging.rs (subscriber, level filter)
//!     → stdout
//! ```

pub mod logging;

pub use logging::init_logging;
