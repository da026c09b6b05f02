//! WebSocket proxy handling.
//!
//! # Responsibilities
//! - Run the policy chain before the client handshake completes
//! - Establish the origin connection before accepting the client
//! - Bidirectional message forwarding
//!
//! # Data Flow
//! ```text
//! Client ←──── WebSocket frames ────→ Proxy ←──── WebSocket frames ────→ Origin
//! ```
//!
//! # Design Decisions
//! - The client is upgraded only once the origin is open, so nothing the
//!   client sends can arrive before the upstream link exists
//! - The origin's chosen subprotocol is echoed to the client
//! - Close frames propagated in both directions
//! - Relays are tracked by the instance and closed on shutdown
//! - Ping/pong handled per hop

use std::net::SocketAddr;

use axum::extract::ws::{self, WebSocket, WebSocketUpgrade};
use axum::http::request::Parts;
use axum::http::{header, HeaderMap, HeaderName, Uri};
use axum::response::Response;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::config::{OriginConfig, ProtocolFamily};
use crate::http::request::{apply_forwarding_headers, restore_host_header};
use crate::http::response::UpgradeResponder;
use crate::lifecycle::shutdown::Shutdown;
use crate::proxy::error::ProxyError;
use crate::proxy::policy::run_policy_chain;
use crate::proxy::working::WorkingProxy;

type OriginSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Handshake headers regenerated for the origin connection.
const HANDSHAKE_HEADERS: [HeaderName; 5] = [
    header::SEC_WEBSOCKET_KEY,
    header::SEC_WEBSOCKET_VERSION,
    header::SEC_WEBSOCKET_EXTENSIONS,
    header::CONNECTION,
    header::UPGRADE,
];

/// Origin URL for the incoming URL.
pub fn origin_ws_url(origin: &OriginConfig, incoming: &url::Url) -> String {
    let mut target = format!(
        "{}://{}:{}{}",
        origin.origin_protocol.scheme(),
        origin.origin_host,
        origin.origin_port,
        incoming.path()
    );
    if let Some(query) = incoming.query() {
        target.push('?');
        target.push_str(query);
    }
    target
}

/// Client headers to send on the origin handshake.
pub fn origin_handshake_headers(
    incoming: &HeaderMap,
    uri: &Uri,
    override_host: Option<&str>,
) -> HeaderMap {
    let mut headers = incoming.clone();
    for name in &HANDSHAKE_HEADERS {
        headers.remove(name);
    }
    restore_host_header(&mut headers, uri);
    apply_forwarding_headers(&mut headers, override_host);
    headers
}

/// Run the policy chain for an upgrade request, then connect to the origin
/// and splice the two connections together.
pub async fn proxy_ws_request(
    working: WorkingProxy,
    peer: SocketAddr,
    parts: &Parts,
    upgrade: WebSocketUpgrade,
    shutdown: &Shutdown,
) -> Result<Response, ProxyError> {
    let mut responder = UpgradeResponder::new();
    let working = run_policy_chain(working, &mut responder)?;
    if let Some(response) = responder.take() {
        return Ok(response);
    }

    let destination = working.destination.as_ref().filter(|_| !working.end);
    let Some((destination, origin)) =
        destination.and_then(|d| d.select_origin(ProtocolFamily::Ws).map(|o| (d, o)))
    else {
        tracing::info!(host = %working.host, peer = %peer, "no ws origin for route");
        return Ok(upgrade.on_upgrade(close_client));
    };

    tracing::info!("{} routed to {}", working.host, origin);

    let target = origin_ws_url(origin, &working.incoming_url);
    let mut request = target
        .as_str()
        .into_client_request()
        .map_err(|e| ProxyError::InvalidUrl(format!("{target}: {e}")))?;
    let headers = origin_handshake_headers(
        &parts.headers,
        &parts.uri,
        destination.override_host.as_deref(),
    );
    request.headers_mut().extend(headers);

    if working.config.debug {
        tracing::debug!(incoming = ?parts.headers, outgoing = ?request.headers(), "ws headers");
    }

    let (upstream, response) = match connect_async(request).await {
        Ok(connected) => connected,
        Err(e) => {
            tracing::error!(peer = %peer, origin = %origin, error = %e, "error connecting to ws origin");
            return Ok(upgrade.on_upgrade(close_client));
        }
    };

    let protocol = response
        .headers()
        .get(header::SEC_WEBSOCKET_PROTOCOL)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let upgrade = match protocol {
        Some(protocol) => upgrade.protocols([protocol]),
        None => upgrade,
    };

    let origin_desc = origin.to_string();
    let shutdown = shutdown.clone();
    Ok(upgrade
        .on_failed_upgrade(move |e| tracing::error!(peer = %peer, error = %e, "ws upgrade failed"))
        .on_upgrade(move |client| {
            let relay = relay(client, upstream, peer, origin_desc, shutdown.clone());
            shutdown.track(relay)
        }))
}

async fn close_client(mut client: WebSocket) {
    let _ = SinkExt::close(&mut client).await;
}

/// Forward messages both ways until either side closes.
async fn relay(
    client: WebSocket,
    upstream: OriginSocket,
    peer: SocketAddr,
    origin: String,
    shutdown: Shutdown,
) {
    let (mut client_tx, mut client_rx) = client.split();
    let (mut origin_tx, mut origin_rx) = upstream.split();

    let client_to_origin = async {
        while let Some(msg) = client_rx.next().await {
            match msg {
                Ok(msg) => {
                    let Some(msg) = client_to_origin_message(msg) else {
                        continue;
                    };
                    let closing = msg.is_close();
                    if let Err(e) = origin_tx.send(msg).await {
                        tracing::error!(origin = %origin, error = %e, "error writing to ws origin");
                        break;
                    }
                    if closing {
                        break;
                    }
                }
                Err(e) => {
                    tracing::error!(peer = %peer, error = %e, "ws client error");
                    break;
                }
            }
        }
    };

    let origin_to_client = async {
        while let Some(msg) = origin_rx.next().await {
            match msg {
                Ok(msg) => {
                    let Some(msg) = origin_to_client_message(msg) else {
                        continue;
                    };
                    let closing = matches!(msg, ws::Message::Close(_));
                    if let Err(e) = client_tx.send(msg).await {
                        tracing::error!(peer = %peer, error = %e, "error writing to ws client");
                        break;
                    }
                    if closing {
                        break;
                    }
                }
                Err(e) => {
                    tracing::error!(origin = %origin, error = %e, "ws origin error");
                    break;
                }
            }
        }
    };

    tokio::select! {
        _ = client_to_origin => {},
        _ = origin_to_client => {},
        _ = shutdown.triggered() => {
            tracing::debug!(peer = %peer, origin = %origin, "closing ws relay for shutdown");
        }
    }

    let _ = origin_tx.close().await;
    let _ = client_tx.close().await;
    tracing::debug!(peer = %peer, origin = %origin, "ws connection closed");
}

fn close_code(code: u16) -> Option<CloseCode> {
    let code = CloseCode::from(code);
    code.is_allowed().then_some(code)
}

/// Data and close messages cross hops; ping/pong stay on their own hop.
pub fn client_to_origin_message(msg: ws::Message) -> Option<Message> {
    match msg {
        ws::Message::Text(text) => Some(Message::Text(text.as_str().to_owned().into())),
        ws::Message::Binary(data) => Some(Message::Binary(data)),
        ws::Message::Close(frame) => Some(Message::Close(frame.and_then(|f| {
            close_code(f.code).map(|code| CloseFrame {
                code,
                reason: f.reason.as_str().to_owned().into(),
            })
        }))),
        ws::Message::Ping(_) | ws::Message::Pong(_) => None,
    }
}

pub fn origin_to_client_message(msg: Message) -> Option<ws::Message> {
    match msg {
        Message::Text(text) => Some(ws::Message::Text(text.as_str().to_owned().into())),
        Message::Binary(data) => Some(ws::Message::Binary(data)),
        Message::Close(frame) => Some(ws::Message::Close(frame.and_then(|f| {
            f.code.is_allowed().then(|| ws::CloseFrame {
                code: u16::from(f.code),
                reason: f.reason.as_str().to_owned().into(),
            })
        }))),
        Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => None,
    }
}
