//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Route matched → inbound protocol family known (HTTP or WS)
//!     → filter the route's origins to that family
//!     → round_robin.rs (rotate through the filtered origins)
//!     → Return origin or explicit None
//! ```
//!
//! # Design Decisions
//! - One cursor per route, shared by both protocol families
//! - Cursor is an atomic; concurrent selections never corrupt it
//! - No health state: a failed origin is a failed client request

pub mod round_robin;

use crate::config::{OriginConfig, ProtocolFamily};

/// Origins of a route belonging to the requested protocol family, in list order.
pub fn origins_in_family(origins: &[OriginConfig], family: ProtocolFamily) -> Vec<&OriginConfig> {
    origins
        .iter()
        .filter(|origin| origin.origin_protocol.family() == family)
        .collect()
}
