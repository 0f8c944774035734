#![allow(dead_code)]

use axum::Router;
use backon::ExponentialBuilder;
use codemaster::SqlEngine;
use std::net::SocketAddr;
use std::time::Duration;
use tempfile::TempDir;
use url::Url;

/// Serve `router` on an ephemeral localhost port.
pub async fn serve(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind mock server");
    let addr = listener.local_addr().expect("mock server has no address");
    tokio::spawn(async move {
        axum::serve(listener, router)
            .await
            .expect("mock server stopped");
    });
    addr
}

pub fn base_url(addr: SocketAddr, path: &str) -> Url {
    Url::parse(&format!("http://{addr}{path}")).expect("invalid mock base url")
}

/// Retries without the production back-off delays.
pub fn fast_retry() -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_min_delay(Duration::from_millis(1))
        .with_max_delay(Duration::from_millis(5))
        .with_max_times(2)
}

pub async fn temp_engine() -> (TempDir, SqlEngine) {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let engine = SqlEngine::open(&dir.path().join("codemaster.db"))
        .await
        .expect("failed to open database");
    (dir, engine)
}
