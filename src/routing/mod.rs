//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (effective host)
//!     → router.rs (case-insensitive exact lookup)
//!     → Return: matched Route or None
//!
//! Route Compilation (at startup):
//!     RouteConfig[]
//!     → Lower-case routing keys
//!     → Attach a round-robin cursor per route
//!     → Freeze as immutable RoutingTable, swapped in atomically
//! ```
//!
//! # Design Decisions
//! - Tables are immutable after construction; only cursors move
//! - O(1) host lookup via HashMap, exact match only (no wildcards)
//! - Duplicate keys: last definition wins

pub mod router;

pub use router::{Route, RoutingError, RoutingTable};
