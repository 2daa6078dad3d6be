//! Shared utilities for integration testing.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    http::Request,
    response::Response,
    Router,
};
use edge_gateway::config::{Environment, GatewayConfig};
use tempfile::TempDir;
use tokio::net::TcpStream;
use tower::ServiceExt;

pub const CLIENT_URL: &str = "https://app.example.com";
pub const SHELL: &str = "<!doctype html><html><body>shell</body></html>";

/// A public directory with the shell, one asset, and a file shadowed by an
/// API prefix.
pub fn public_dir() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("index.html"), SHELL).unwrap();
    std::fs::write(dir.path().join("app.js"), "console.log('app')").unwrap();
    std::fs::create_dir_all(dir.path().join("api/ai")).unwrap();
    std::fs::write(dir.path().join("api/ai/generate"), "static shadow").unwrap();
    dir
}

/// A public directory without an entry document.
pub fn empty_public_dir() -> TempDir {
    tempfile::tempdir().unwrap()
}

pub fn config(public_dir: &Path, environment: Environment) -> GatewayConfig {
    let mut config = GatewayConfig {
        environment,
        ..GatewayConfig::default()
    };
    config.origins.client_url = Some(CLIENT_URL.to_string());
    config.static_files.public_dir = public_dir.to_path_buf();
    config.session.secret = "integration-secret".to_string();
    config
}

pub async fn send(router: &Router, request: Request<Body>) -> Response {
    router.clone().oneshot(request).await.unwrap()
}

pub async fn body_string(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), 1 << 20).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub fn get(path: &str) -> Request<Body> {
    Request::builder().uri(path).body(Body::empty()).unwrap()
}

/// Poll until something accepts connections on `addr`.
pub async fn wait_for_listener(addr: SocketAddr, timeout: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if TcpStream::connect(addr).await.is_ok() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}
