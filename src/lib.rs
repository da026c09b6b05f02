//! fimiproxy: HTTP, HTTPS, WS and WSS reverse proxy library.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http::server ──▶ proxy::working ──▶ proxy::policy ──┬──▶ redirect / 404
//!                     (axum, TLS)      (host, URL,        (force redirect,│
//!                                       destination)       not found,     │
//!                                                          force upgrade) ▼
//!     Client Response                                          http::forward / http::websocket
//!     ◀────────────────────────────────────────────────────────  (round-robin origin) ◀── Origin
//! ```

// Core subsystems
pub mod config;
pub mod http;
pub mod net;
pub mod proxy;
pub mod routing;

// Traffic management
pub mod load_balancer;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use config::schema::{RouteConfig, RuntimeConfig};
pub use lifecycle::{Fimiproxy, Shutdown, StartupError};
