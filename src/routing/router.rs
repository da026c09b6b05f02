//! Route lookup and origin selection.
//!
//! # Responsibilities
//! - Store routes keyed by lower-cased `incomingHostAndPort`
//! - Look up the route for an effective host
//! - Select the next origin of a protocol family for a route
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - Cursor is keyed by route, not by protocol family

use std::collections::HashMap;
use std::ops::Deref;
use std::sync::Arc;

use crate::config::{OriginConfig, ProtocolFamily, RouteConfig};
use crate::load_balancer::{origins_in_family, round_robin::RoundRobin};

/// Error building a routing table.
#[derive(Debug, thiserror::Error)]
pub enum RoutingError {
    #[error("route {index} has an empty incomingHostAndPort")]
    EmptyIncomingHost { index: usize },
}

/// A configured route plus its round-robin cursor.
#[derive(Debug)]
pub struct Route {
    config: RouteConfig,
    balancer: RoundRobin,
}

impl Route {
    pub fn new(config: RouteConfig) -> Self {
        Self {
            config,
            balancer: RoundRobin::new(),
        }
    }

    pub fn config(&self) -> &RouteConfig {
        &self.config
    }

    /// Next origin of `family`, or `None` when the route has no origin of that family.
    pub fn select_origin(&self, family: ProtocolFamily) -> Option<&OriginConfig> {
        let origins = origins_in_family(&self.config.origin, family);
        let index = self.balancer.next_index(origins.len())?;
        origins.get(index).copied()
    }
}

impl Deref for Route {
    type Target = RouteConfig;
    fn deref(&self) -> &Self::Target {
        &self.config
    }
}

/// Host → route mapping for one proxy generation.
#[derive(Debug, Default)]
pub struct RoutingTable {
    routes: HashMap<String, Arc<Route>>,
}

impl RoutingTable {
    /// Build a table from route configs. Keys are lower-cased; the last
    /// duplicate wins.
    pub fn build(routes: &[RouteConfig]) -> Result<Self, RoutingError> {
        let mut table = HashMap::with_capacity(routes.len());

        for (index, route) in routes.iter().enumerate() {
            if route.incoming_host_and_port.is_empty() {
                return Err(RoutingError::EmptyIncomingHost { index });
            }

            let key = route.incoming_host_and_port.to_lowercase();
            for origin in &route.origin {
                tracing::info!("route: {} > {}", key, origin);
            }
            table.insert(key, Arc::new(Route::new(route.clone())));
        }

        Ok(Self { routes: table })
    }

    /// Case-insensitive exact match.
    pub fn lookup(&self, host: &str) -> Option<Arc<Route>> {
        self.routes.get(&host.to_lowercase()).cloned()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
