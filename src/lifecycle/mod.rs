//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Validate config → Build routes → Resolve TLS → Start listeners
//!
//! Shutdown (shutdown.rs):
//!     Signal or trigger → Cancel ws relays → Stop accepting → Drain connections
//!     → Wait for relays → Clear routes
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{Fimiproxy, StartupError};
