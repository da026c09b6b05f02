//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, upgrade detection)
//!     → proxy (context, policy chain)
//!     → forward.rs (plain HTTP) or websocket.rs (upgrades)
//!     → request.rs (host / x-forwarded-host rewrite)
//!     → response.rs (terminal responses from the policy chain)
//! ```

pub mod forward;
pub mod request;
pub mod response;
pub mod server;
pub mod websocket;

pub use server::{build_router, serve_listener, BoundListener, ListenerError, ListenerState, ProxyState};
