//! Start, route replacement and shutdown of a proxy instance.

use std::time::Duration;

use fimiproxy::config::{Protocol, RuntimeConfig};
use fimiproxy::{Fimiproxy, StartupError};
use reqwest::StatusCode;

mod common;
use common::*;

#[tokio::test]
async fn test_end_stops_accepting() {
    let proxy = start_proxy(proxy_config(vec![])).await;
    let addr = proxy.http_addr().unwrap();

    proxy.end().await;
    assert!(tokio::net::TcpStream::connect(addr).await.is_err());
}

#[tokio::test]
async fn test_replace_routes() {
    let origin = start_echo_origin("one").await;
    let proxy = start_proxy(proxy_config(vec![])).await;

    let response = client()
        .get(http_url(&proxy, "/"))
        .header("host", ROUTED_HOST)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    proxy
        .replace_routes(&[route(
            ROUTED_HOST,
            vec![common::origin(origin.addr, Protocol::Http)],
        )])
        .unwrap();

    let response = client()
        .get(http_url(&proxy, "/"))
        .header("host", ROUTED_HOST)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    assert!(proxy.replace_routes(&[route("", vec![])]).is_err());
    proxy.end().await;
}

#[tokio::test]
async fn test_https_without_credentials_fails() {
    let config = RuntimeConfig {
        expose_https_proxy: true,
        https_port: Some(0),
        https_private_key_filepath: Some("/nonexistent/key.pem".into()),
        https_public_key_filepath: Some("/nonexistent/cert.pem".into()),
        ..proxy_config(vec![])
    };

    let err = Fimiproxy::start(config).await.err().unwrap();
    assert!(matches!(err, StartupError::Tls(_)), "{err}");
}

#[tokio::test]
async fn test_port_in_use_fails() {
    let taken = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let config = RuntimeConfig {
        http_port: Some(taken.local_addr().unwrap().port()),
        ..proxy_config(vec![])
    };

    let err = Fimiproxy::start(config).await.err().unwrap();
    assert!(matches!(err, StartupError::Listener(_)), "{err}");
}

#[tokio::test]
async fn test_trigger_before_run_still_ends() {
    let proxy = start_proxy(proxy_config(vec![])).await;
    let addr = proxy.http_addr().unwrap();

    proxy.shutdown_handle().trigger();
    tokio::time::timeout(Duration::from_secs(5), proxy.run_until_signal())
        .await
        .unwrap();

    assert!(tokio::net::TcpStream::connect(addr).await.is_err());
}

#[tokio::test]
async fn test_shutdown_handle_ends_run() {
    let proxy = start_proxy(proxy_config(vec![])).await;
    let addr = proxy.http_addr().unwrap();
    let shutdown = proxy.shutdown_handle();

    let running = tokio::spawn(proxy.run_until_signal());
    tokio::task::yield_now().await;
    shutdown.trigger();
    tokio::time::timeout(Duration::from_secs(5), running)
        .await
        .unwrap()
        .unwrap();

    assert!(tokio::net::TcpStream::connect(addr).await.is_err());
}
