//! Shared utilities for integration testing.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue};
use axum::response::IntoResponse;
use axum::Router;
use fimiproxy::config::{OriginConfig, Protocol, RouteConfig, RuntimeConfig};
use fimiproxy::Fimiproxy;
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::Message;

pub const ROUTED_HOST: &str = "example.test";

/// An HTTP origin that echoes request bodies and records request headers.
pub struct EchoOrigin {
    pub addr: SocketAddr,
    pub seen: Arc<Mutex<Vec<HeaderMap>>>,
}

impl EchoOrigin {
    pub fn last_headers(&self) -> HeaderMap {
        self.seen.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

#[derive(Clone)]
struct EchoState {
    name: &'static str,
    seen: Arc<Mutex<Vec<HeaderMap>>>,
}

async fn echo(State(state): State<EchoState>, headers: HeaderMap, body: Bytes) -> impl IntoResponse {
    state.seen.lock().unwrap().push(headers);
    ([("x-origin", state.name)], body)
}

/// Start an echo origin on an ephemeral port. Responses carry `x-origin: {name}`.
pub async fn start_echo_origin(name: &'static str) -> EchoOrigin {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new().fallback(echo).with_state(EchoState {
        name,
        seen: seen.clone(),
    });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    EchoOrigin { addr, seen }
}

/// Text message that makes the WebSocket origin close its side.
pub const ORIGIN_CLOSE: &str = "close-from-origin";

/// A WebSocket origin that echoes data frames, records handshake `Host`
/// headers and counts connections that have ended.
pub struct WsOrigin {
    pub addr: SocketAddr,
    pub hosts: Arc<Mutex<Vec<String>>>,
    pub ended: Arc<AtomicUsize>,
}

impl WsOrigin {
    /// Wait until `count` connections have ended, or panic after 5s.
    pub async fn wait_for_ended(&self, count: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while self.ended.load(Ordering::SeqCst) < count {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("origin connection still open");
    }
}

pub async fn start_ws_echo_origin() -> WsOrigin {
    let hosts = Arc::new(Mutex::new(Vec::new()));
    let ended = Arc::new(AtomicUsize::new(0));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let seen = hosts.clone();
    let done = ended.clone();
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let seen = seen.clone();
            let done = done.clone();
            tokio::spawn(async move {
                let callback = move |req: &Request, mut resp: Response| -> Result<Response, ErrorResponse> {
                    if let Some(host) = req.headers().get("host").and_then(|h| h.to_str().ok()) {
                        seen.lock().unwrap().push(host.to_string());
                    }
                    let protocol = req
                        .headers()
                        .get("sec-websocket-protocol")
                        .and_then(|h| h.to_str().ok())
                        .and_then(|h| h.split(',').next())
                        .map(|p| p.trim().to_string());
                    if let Some(protocol) = protocol {
                        resp.headers_mut().insert(
                            "sec-websocket-protocol",
                            HeaderValue::from_str(&protocol).unwrap(),
                        );
                    }
                    Ok(resp)
                };

                let Ok(mut ws) = tokio_tungstenite::accept_hdr_async(stream, callback).await else {
                    return;
                };
                while let Some(Ok(msg)) = ws.next().await {
                    match msg {
                        Message::Text(ref text) if text.as_str() == ORIGIN_CLOSE => {
                            let _ = ws.close(None).await;
                            break;
                        }
                        Message::Text(_) | Message::Binary(_) => {
                            if ws.send(msg).await.is_err() {
                                break;
                            }
                        }
                        Message::Close(_) => break,
                        _ => {}
                    }
                }
                done.fetch_add(1, Ordering::SeqCst);
            });
        }
    });

    WsOrigin { addr, hosts, ended }
}

/// An address nothing listens on.
pub async fn closed_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

pub fn origin(addr: SocketAddr, protocol: Protocol) -> OriginConfig {
    OriginConfig {
        origin_host: addr.ip().to_string(),
        origin_port: addr.port(),
        origin_protocol: protocol,
    }
}

pub fn route(host: &str, origins: Vec<OriginConfig>) -> RouteConfig {
    RouteConfig {
        incoming_host_and_port: host.to_string(),
        origin: origins,
        ..RouteConfig::default()
    }
}

/// HTTP listener (with WebSocket upgrades) on an ephemeral loopback port.
pub fn proxy_config(routes: Vec<RouteConfig>) -> RuntimeConfig {
    RuntimeConfig {
        expose_http_proxy: true,
        http_port: Some(0),
        expose_ws_proxy_for_http: true,
        bind_address: "127.0.0.1".to_string(),
        routes,
        ..RuntimeConfig::default()
    }
}

pub async fn start_proxy(config: RuntimeConfig) -> Fimiproxy {
    Fimiproxy::start(config).await.unwrap()
}

pub fn http_url(proxy: &Fimiproxy, path: &str) -> String {
    format!("http://{}{}", proxy.http_addr().unwrap(), path)
}

pub fn ws_url(proxy: &Fimiproxy, path: &str) -> String {
    format!("ws://{}{}", proxy.http_addr().unwrap(), path)
}

/// Client that reports redirects instead of following them.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}

/// Self-signed certificate and key for `localhost`, as PEM.
pub fn self_signed_pem() -> (String, String) {
    let rcgen::CertifiedKey { cert, key_pair } =
        rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
    (cert.pem(), key_pair.serialize_pem())
}

/// Write a raw request and read the whole response (the request should ask
/// for `Connection: close`).
pub async fn raw_request(addr: SocketAddr, request: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut response = Vec::new();
    stream.read_to_end(&mut response).await.unwrap();
    String::from_utf8_lossy(&response).into_owned()
}
