//! # Tests for Handlers
//!
//! Unit tests for the unauthenticated handlers; the org-scoped surface is
//! covered by the integration suites under tests/.

use crate::handlers::root;
use axum::response::Json;

#[tokio::test]
async fn test_root_handler_returns_expected_service_info() {
    let Json(service_info) = root().await;

    assert_eq!(service_info.service, "fleetbook");
    assert_eq!(service_info.version, env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_service_info_serializes_to_json() {
    let Json(service_info) = root().await;
    let value = serde_json::to_value(&service_info).expect("serializes");

    assert_eq!(value["service"], "fleetbook");
    assert!(value["version"].is_string());
}
