//! Tests for the backend API client

use crate::client::*;
use medicopilot_core::{MediError, Medicine};
use std::path::Path;

#[test]
fn config_defaults_and_builders() {
    let config = ApiClientConfig::new("http://10.0.16.189:5002")
        .with_identity("some-token")
        .with_header("X-Custom-Header".to_string(), "test-value".to_string())
        .with_timeout(60);

    assert_eq!(config.base_url, "http://10.0.16.189:5002");
    assert_eq!(config.identity.as_deref(), Some("some-token"));
    assert_eq!(config.timeout_seconds, 60);
    assert_eq!(
        config.headers.get("X-Custom-Header"),
        Some(&"test-value".to_string())
    );
}

#[test]
fn login_response_prefers_token_over_user_id() {
    let both: LoginResponse = serde_json::from_str(
        r#"{"token": "aaa.bbb.ccc", "user_id": "67c9deadbeef5ca0"}"#,
    )
    .unwrap();
    assert_eq!(both.identity(), Some("aaa.bbb.ccc"));

    // Older backend revision: only a raw identifier
    let old: LoginResponse = serde_json::from_str(r#"{"user_id": "67c9deadbeef5ca0"}"#).unwrap();
    assert_eq!(old.identity(), Some("67c9deadbeef5ca0"));

    let empty: LoginResponse = serde_json::from_str(r#"{"message": "ok"}"#).unwrap();
    assert_eq!(empty.identity(), None);
}

#[test]
fn medicine_serializes_backend_fields() {
    let medicine = Medicine {
        id: None,
        name: "Paracetamol".to_string(),
        quantity: 20,
        expiry_date: "2026-12-31".to_string(),
    };
    let json = serde_json::to_value(&medicine).unwrap();
    assert_eq!(json["name"], "Paracetamol");
    assert_eq!(json["quantity"], 20);
    assert_eq!(json["expiry_date"], "2026-12-31");
    // Unsaved medicines must not send a null _id to the backend
    assert!(json.get("_id").is_none());
}

#[test]
fn medicine_deserializes_backend_id() {
    let medicine: Medicine = serde_json::from_str(
        r#"{"_id": "67c9deadbeef5ca0", "name": "Ibuprofen", "quantity": 10, "expiry_date": "2027-01-31"}"#,
    )
    .unwrap();
    assert_eq!(medicine.id.as_deref(), Some("67c9deadbeef5ca0"));
    assert_eq!(medicine.quantity, 10);
}

#[tokio::test]
async fn http_client_creation() {
    let config = ApiClientConfig::new("http://localhost:5002");
    assert!(MediApiClient::new(config).is_ok());
}

#[tokio::test]
async fn rejects_invalid_custom_header() {
    let config = ApiClientConfig::new("http://localhost:5002")
        .with_header("bad header name".to_string(), "v".to_string());
    assert!(MediApiClient::new(config).is_err());
}

fn fake_response(status: u16, body: &str) -> reqwest::Response {
    reqwest::Response::from(
        http::Response::builder()
            .status(status)
            .body(body.to_string())
            .unwrap(),
    )
}

#[tokio::test]
async fn unauthorized_response_maps_to_authentication_error() {
    let response = fake_response(401, r#"{"error": "Token expired"}"#);
    let err = handle_response_error(response, "get_treatments").await;
    assert!(!err.is_recoverable());
    match err {
        MediError::Authentication { message, .. } => assert_eq!(message, "Token expired"),
        other => panic!("expected Authentication error, got {:?}", other),
    }
}

#[tokio::test]
async fn missing_route_maps_to_not_found_error() {
    let response = fake_response(404, "");
    let err = handle_response_error(response, "extract_text").await;
    match err {
        MediError::NotFound { resource, .. } => assert!(!resource.is_empty()),
        other => panic!("expected NotFound error, got {:?}", other),
    }
}

#[tokio::test]
async fn server_error_keeps_backend_message_and_status() {
    let response = fake_response(500, r#"{"error": "db down"}"#);
    let err = handle_response_error(response, "login").await;
    assert!(err.is_recoverable());
    match err {
        MediError::Api { message, status, .. } => {
            assert_eq!(status, Some(500));
            assert!(message.contains("db down"));
        }
        other => panic!("expected Api error, got {:?}", other),
    }
}

#[tokio::test]
async fn extract_text_surfaces_missing_image_as_io_error() {
    let client = MediApiClient::new(ApiClientConfig::new("http://localhost:5002")).unwrap();
    let err = client
        .extract_text(Path::new("/nonexistent/medicine.jpg"))
        .await
        .unwrap_err();
    assert!(matches!(err, MediError::Io(_)));
}
