//! Startup orchestration.
//!
//! # Responsibilities
//! - Validate configuration
//! - Build the routing table and shared proxy state
//! - Resolve TLS material for the HTTPS listener
//! - Bind listeners and begin accepting traffic
//! - Drain and stop everything on `end`
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal and releases what was bound
//! - Listeners start last (traffic only when ready)

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use crate::config::loader::ConfigError;
use crate::config::validation::validate_config;
use crate::config::{Protocol, RouteConfig, RuntimeConfig};
use crate::http::server::{
    build_router, serve_listener, BoundListener, ListenerError, ListenerState, ProxyState,
};
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::signals::wait_for_signal;
use crate::net::tls::{install_crypto_provider, prepare_https_credentials, rustls_config, TlsError};
use crate::routing::{RoutingError, RoutingTable};

/// Error starting a proxy instance.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Routing(#[from] RoutingError),
    #[error(transparent)]
    Tls(#[from] TlsError),
    #[error(transparent)]
    Listener(#[from] ListenerError),
    #[error("invalid bindAddress {address:?}: {source}")]
    BindAddress {
        address: String,
        #[source]
        source: std::net::AddrParseError,
    },
}

/// A running proxy: its shared state and bound listeners.
pub struct Fimiproxy {
    state: Arc<ProxyState>,
    listeners: Vec<BoundListener>,
}

impl Fimiproxy {
    /// Start every listener the config exposes.
    pub async fn start(config: RuntimeConfig) -> Result<Self, StartupError> {
        install_crypto_provider();
        validate_config(&config).map_err(ConfigError::Validation)?;

        let routes = RoutingTable::build(&config.routes)?;
        let ip: IpAddr = config
            .bind_address
            .parse()
            .map_err(|source| StartupError::BindAddress {
                address: config.bind_address.clone(),
                source,
            })?;

        let config = Arc::new(config);
        let state = Arc::new(ProxyState::new(config.clone(), routes));
        let mut proxy = Self {
            state,
            listeners: Vec::new(),
        };

        if let Err(e) = proxy.bind_listeners(ip).await {
            for listener in &proxy.listeners {
                listener.handle.shutdown();
            }
            return Err(e);
        }

        tracing::info!(pid = std::process::id(), "fimiproxy started");
        Ok(proxy)
    }

    async fn bind_listeners(&mut self, ip: IpAddr) -> Result<(), StartupError> {
        let config = self.state.config.clone();

        if let (true, Some(port)) = (config.expose_http_proxy, config.http_port) {
            let router = build_router(ListenerState {
                proxy: self.state.clone(),
                protocol: Protocol::Http,
                websocket: config.expose_ws_proxy_for_http,
            });
            let listener =
                serve_listener(SocketAddr::new(ip, port), router, Protocol::Http, None).await?;
            tracing::info!("http proxy listening on {}", listener.local_addr);
            self.listeners.push(listener);
        }

        if let (true, Some(port)) = (config.expose_https_proxy, config.https_port) {
            let credentials = prepare_https_credentials(&config).await?;
            let tls = rustls_config(credentials).await?;
            let router = build_router(ListenerState {
                proxy: self.state.clone(),
                protocol: Protocol::Https,
                websocket: config.expose_ws_proxy_for_https,
            });
            let listener =
                serve_listener(SocketAddr::new(ip, port), router, Protocol::Https, Some(tls))
                    .await?;
            tracing::info!("https proxy listening on {}", listener.local_addr);
            self.listeners.push(listener);
        }

        Ok(())
    }

    fn listener_addr(&self, protocol: Protocol) -> Option<SocketAddr> {
        self.listeners
            .iter()
            .find(|l| l.protocol == protocol)
            .map(|l| l.local_addr)
    }

    /// Bound address of the HTTP listener.
    pub fn http_addr(&self) -> Option<SocketAddr> {
        self.listener_addr(Protocol::Http)
    }

    /// Bound address of the HTTPS listener.
    pub fn https_addr(&self) -> Option<SocketAddr> {
        self.listener_addr(Protocol::Https)
    }

    pub fn state(&self) -> &Arc<ProxyState> {
        &self.state
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.state.config
    }

    /// Handle that makes `run_until_signal` return as if a signal arrived.
    pub fn shutdown_handle(&self) -> Shutdown {
        self.state.shutdown.clone()
    }

    /// Atomically replace the routing table. Round-robin cursors restart.
    pub fn replace_routes(&self, routes: &[RouteConfig]) -> Result<(), RoutingError> {
        let table = RoutingTable::build(routes)?;
        self.state.replace_routes(table);
        Ok(())
    }

    /// Stop accepting connections, drain the open ones, close WebSocket
    /// relays, and release state.
    pub async fn end(self) {
        let timeout = self.state.config.shutdown_timeout_secs.map(Duration::from_secs);
        let shutdown = &self.state.shutdown;
        shutdown.trigger();

        for listener in &self.listeners {
            listener.handle.graceful_shutdown(timeout);
        }

        for listener in self.listeners {
            match listener.task.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    tracing::error!(addr = %listener.local_addr, error = %e, "listener failed")
                }
                Err(e) => {
                    tracing::error!(addr = %listener.local_addr, error = %e, "listener task failed")
                }
            }
        }

        if !shutdown.drain(timeout).await {
            tracing::warn!(
                relays = shutdown.active_relays(),
                "ws relays still open after shutdown timeout"
            );
        }

        self.state.replace_routes(RoutingTable::default());
        tracing::info!("fimiproxy ended");
    }

    /// Serve until SIGINT/SIGTERM or a shutdown trigger, then end.
    pub async fn run_until_signal(self) {
        let shutdown = self.shutdown_handle();
        tokio::select! {
            _ = wait_for_signal() => {}
            _ = shutdown.triggered() => tracing::info!("shutdown requested"),
        }
        self.end().await;
    }
}
