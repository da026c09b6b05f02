//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router for one listener
//! - Wire up middleware (tracing, panic recovery)
//! - Dispatch plain requests and WebSocket upgrades
//! - Bind the listener and serve it until its handle shuts it down

use std::any::Any;
use std::net::SocketAddr;
use std::sync::Arc;

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    extract::{ws::WebSocketUpgrade, ConnectInfo, FromRequestParts, State},
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    Router,
};
use axum_server::{tls_rustls::RustlsConfig, Handle};
use tokio::task::JoinHandle;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};

use crate::config::{Protocol, RuntimeConfig};
use crate::http::forward::{build_client, proxy_http_request, ProxyClient};
use crate::http::request::is_websocket_upgrade;
use crate::http::websocket::proxy_ws_request;
use crate::lifecycle::shutdown::Shutdown;
use crate::proxy::error::status_response;
use crate::proxy::working::WorkingProxy;
use crate::routing::RoutingTable;

/// State shared by every listener of one proxy instance.
pub struct ProxyState {
    pub config: Arc<RuntimeConfig>,
    routes: ArcSwap<RoutingTable>,
    pub client: ProxyClient,
    /// Ends WebSocket relays on instance shutdown.
    pub shutdown: Shutdown,
}

impl ProxyState {
    pub fn new(config: Arc<RuntimeConfig>, routes: RoutingTable) -> Self {
        Self {
            config,
            routes: ArcSwap::from_pointee(routes),
            client: build_client(),
            shutdown: Shutdown::new(),
        }
    }

    /// Current routing table generation.
    pub fn routes(&self) -> Arc<RoutingTable> {
        self.routes.load_full()
    }

    /// Swap in a new table. In-flight requests keep the one they loaded.
    pub fn replace_routes(&self, routes: RoutingTable) {
        self.routes.store(Arc::new(routes));
    }
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct ListenerState {
    pub proxy: Arc<ProxyState>,
    /// `http:` or `https:`.
    pub protocol: Protocol,
    /// Accept WebSocket upgrades on this listener.
    pub websocket: bool,
}

/// Build the Axum router for one listener.
pub fn build_router(state: ListenerState) -> Router {
    Router::new()
        .fallback(proxy_handler)
        .with_state(state)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response<Body> {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };

    tracing::error!(panic = %detail, "error handling request");
    status_response(StatusCode::INTERNAL_SERVER_ERROR)
}

/// Main proxy handler.
async fn proxy_handler(
    State(state): State<ListenerState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let routes = state.proxy.routes();
    let config = state.proxy.config.clone();

    if state.websocket && is_websocket_upgrade(request.headers()) {
        let (mut parts, _body) = request.into_parts();
        let working = match WorkingProxy::build(
            &parts.uri,
            &parts.headers,
            state.protocol.websocket(),
            config,
            &routes,
        ) {
            Ok(working) => working,
            Err(e) => return e.into_response(),
        };

        let upgrade = match WebSocketUpgrade::from_request_parts(&mut parts, &()).await {
            Ok(upgrade) => upgrade,
            Err(rejection) => return rejection.into_response(),
        };

        return proxy_ws_request(working, peer, &parts, upgrade, &state.proxy.shutdown)
            .await
            .unwrap_or_else(IntoResponse::into_response);
    }

    let working = match WorkingProxy::build(
        request.uri(),
        request.headers(),
        state.protocol,
        config,
        &routes,
    ) {
        Ok(working) => working,
        Err(e) => return e.into_response(),
    };

    proxy_http_request(&state.proxy.client, working, peer, request)
        .await
        .unwrap_or_else(IntoResponse::into_response)
}

/// Error binding or running a listener.
#[derive(Debug, thiserror::Error)]
pub enum ListenerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

/// A listener that is accepting connections.
pub struct BoundListener {
    pub protocol: Protocol,
    pub local_addr: SocketAddr,
    pub handle: Handle,
    pub task: JoinHandle<std::io::Result<()>>,
}

/// Bind `addr` and serve `router` on it, over TLS when `tls` is given.
/// Returns once the socket is listening.
pub async fn serve_listener(
    addr: SocketAddr,
    router: Router,
    protocol: Protocol,
    tls: Option<RustlsConfig>,
) -> Result<BoundListener, ListenerError> {
    let handle = Handle::new();
    let app = router.into_make_service_with_connect_info::<SocketAddr>();

    let task = match tls {
        Some(tls) => tokio::spawn(
            axum_server::bind_rustls(addr, tls)
                .handle(handle.clone())
                .serve(app),
        ),
        None => tokio::spawn(axum_server::bind(addr).handle(handle.clone()).serve(app)),
    };

    match handle.listening().await {
        Some(local_addr) => Ok(BoundListener {
            protocol,
            local_addr,
            handle,
            task,
        }),
        None => {
            let source = match task.await {
                Ok(Err(e)) => e,
                Ok(Ok(())) => std::io::Error::other("listener exited before binding"),
                Err(e) => std::io::Error::other(e),
            };
            Err(ListenerError::Bind { addr, source })
        }
    }
}
