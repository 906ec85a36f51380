//! Web API Health Tests
//!
//! Integration tests for the liveness and readiness probes.

mod common;

use axum::http::StatusCode;
use common::test_server;
use serde_json::Value;

#[tokio::test]
async fn test_healthz() {
    let (server, _media_root) = test_server().await;

    let response = server.get("/healthz").await;

    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["status"], "ok");
}

#[tokio::test]
async fn test_readyz_reports_all_checks_green() {
    let (server, _media_root) = test_server().await;

    let response = server.get("/readyz").await;

    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["checks"]["sqlite"]["ok"], true);
    assert_eq!(body["checks"]["media"]["ok"], true);
}

#[tokio::test]
async fn test_readyz_fails_without_the_media_root() {
    let (server, media_root) = test_server().await;

    // Tearing down the media root makes the disk probe fail
    drop(media_root);

    let response = server.get("/readyz").await;

    response.assert_status(StatusCode::SERVICE_UNAVAILABLE);

    let body: Value = response.json();
    assert_eq!(body["status"], "error");
    assert_eq!(body["checks"]["sqlite"]["ok"], true);
    assert_eq!(body["checks"]["media"]["ok"], false);
}
