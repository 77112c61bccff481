//! Tests for the session manager against in-memory, failing, and file stores

use crate::identity::TokenClaims;
use crate::manager::{ReadOutcome, SessionManager, SessionStatus, AUTH_TOKEN_KEY};
use crate::store::{FileStore, MemoryStore, SessionStore};
use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::Utc;
use medicopilot_core::{ErrorContext, MediError, MediResult};
use std::sync::Arc;

/// Store whose every call fails, for exercising the fail-open path
struct FailingStore;

#[async_trait]
impl SessionStore for FailingStore {
    async fn get(&self, _key: &str) -> MediResult<Option<String>> {
        Err(storage_unavailable())
    }

    async fn set(&self, _key: &str, _value: &str) -> MediResult<()> {
        Err(storage_unavailable())
    }

    async fn delete(&self, _key: &str) -> MediResult<()> {
        Err(storage_unavailable())
    }
}

fn storage_unavailable() -> MediError {
    MediError::Storage {
        message: "store unavailable".to_string(),
        source: None,
        context: ErrorContext::new("failing_store"),
    }
}

fn manager() -> SessionManager {
    SessionManager::new(Arc::new(MemoryStore::new()))
}

fn token_with_exp(exp: i64) -> String {
    let claims = TokenClaims {
        sub: None,
        phone: Some("5550100".to_string()),
        iat: Some(exp - 86_400),
        exp: Some(exp),
    };
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims).unwrap());
    format!("{}.{}.signature", header, payload)
}

fn expired_token() -> String {
    token_with_exp(Utc::now().timestamp() - 3_600)
}

fn live_token() -> String {
    token_with_exp(Utc::now().timestamp() + 3_600)
}

#[tokio::test]
async fn save_then_read_returns_identity() {
    let sessions = manager();
    sessions.save("67c9deadbeef5ca0").await.unwrap();
    assert_eq!(sessions.read().await.as_deref(), Some("67c9deadbeef5ca0"));
}

#[tokio::test]
async fn save_overwrites_previous_identity() {
    let sessions = manager();
    sessions.save("first").await.unwrap();
    sessions.save("second").await.unwrap();
    assert_eq!(sessions.read().await.as_deref(), Some("second"));
}

#[tokio::test]
async fn clear_then_read_is_absent_and_idempotent() {
    let sessions = manager();
    sessions.save("67c9deadbeef5ca0").await.unwrap();
    sessions.clear().await.unwrap();
    assert_eq!(sessions.read().await, None);

    // Clearing an already-empty session is a no-op, not an error
    sessions.clear().await.unwrap();
    assert_eq!(sessions.read().await, None);
}

#[tokio::test]
async fn identifier_validity_is_presence() {
    let sessions = manager();
    sessions.save("67c9deadbeef5ca0").await.unwrap();
    assert!(sessions.is_valid().await);

    sessions.clear().await.unwrap();
    assert!(!sessions.is_valid().await);
}

#[tokio::test]
async fn live_token_is_valid_and_left_untouched() {
    let sessions = manager();
    let token = live_token();
    sessions.save(&token).await.unwrap();

    assert!(sessions.is_valid().await);
    assert_eq!(sessions.read().await.as_deref(), Some(token.as_str()));
}

#[tokio::test]
async fn expired_token_self_evicts_on_validity_check() {
    let sessions = manager();
    sessions.save(&expired_token()).await.unwrap();

    assert!(!sessions.is_valid().await);
    assert_eq!(sessions.read().await, None);
}

#[tokio::test]
async fn malformed_token_is_invalid_but_not_fatal() {
    let sessions = manager();
    // Token-shaped but with an undecodable payload
    sessions.save("aaa.!!!.ccc").await.unwrap();
    assert!(!sessions.is_valid().await);

    let err = sessions.decode("aaa.!!!.ccc").unwrap_err();
    assert!(matches!(err, MediError::Decode { .. }));
}

#[tokio::test]
async fn status_reports_authenticated_identity() {
    let sessions = manager();
    assert_eq!(sessions.status().await, SessionStatus::Unauthenticated);

    sessions.save("67c9deadbeef5ca0").await.unwrap();
    match sessions.status().await {
        SessionStatus::Authenticated(identity) => {
            assert_eq!(identity.as_str(), "67c9deadbeef5ca0")
        }
        other => panic!("expected authenticated, got {:?}", other),
    }

    sessions.clear().await.unwrap();
    assert_eq!(sessions.status().await, SessionStatus::Unauthenticated);
}

#[tokio::test]
async fn unknown_is_the_default_pre_check_state() {
    let status = SessionStatus::default();
    assert_eq!(status, SessionStatus::Unknown);
    assert!(!status.is_authenticated());
}

#[tokio::test]
async fn store_failure_reads_as_logged_out_but_stays_diagnosable() {
    let sessions = SessionManager::new(Arc::new(FailingStore));

    // Boundary view: logged out
    assert_eq!(sessions.read().await, None);
    assert!(!sessions.is_valid().await);

    // Internal view: the failure is preserved
    match sessions.read_outcome().await {
        ReadOutcome::Failed(reason) => assert!(reason.contains("store unavailable")),
        other => panic!("expected failed outcome, got {:?}", other),
    }
}

#[tokio::test]
async fn save_failure_is_surfaced_to_the_caller() {
    let sessions = SessionManager::new(Arc::new(FailingStore));
    let err = sessions.save("id").await.unwrap_err();
    assert!(matches!(err, MediError::Storage { .. }));
}

#[tokio::test]
async fn legacy_keys_are_read_and_migrated() {
    for legacy in ["token", "authToken", "userId"] {
        let store = Arc::new(MemoryStore::new());
        store.set(legacy, "legacy-session-value").await.unwrap();

        let sessions = SessionManager::new(store.clone());
        assert_eq!(
            sessions.read().await.as_deref(),
            Some("legacy-session-value")
        );

        // Migrated to the canonical key, legacy entry removed
        assert_eq!(
            store.get(AUTH_TOKEN_KEY).await.unwrap().as_deref(),
            Some("legacy-session-value")
        );
        assert_eq!(store.get(legacy).await.unwrap(), None);
    }
}

#[tokio::test]
async fn canonical_key_wins_over_legacy_keys() {
    let store = Arc::new(MemoryStore::new());
    store.set(AUTH_TOKEN_KEY, "canonical").await.unwrap();
    store.set("token", "stale-legacy").await.unwrap();

    let sessions = SessionManager::new(store);
    assert_eq!(sessions.read().await.as_deref(), Some("canonical"));
}

#[tokio::test]
async fn file_store_round_trips_across_instances() {
    let dir = tempfile::tempdir().unwrap();

    {
        let sessions = SessionManager::new(Arc::new(FileStore::new(dir.path()).unwrap()));
        sessions.save(&live_token()).await.unwrap();
        assert!(sessions.is_valid().await);
    }

    // A fresh store over the same directory sees the session (restart survival)
    let sessions = SessionManager::new(Arc::new(FileStore::new(dir.path()).unwrap()));
    assert!(sessions.is_valid().await);

    sessions.clear().await.unwrap();
    assert_eq!(sessions.read().await, None);
}

#[tokio::test]
async fn file_store_rejects_path_escaping_keys() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::new(dir.path()).unwrap();
    let err = store.get("../outside").await.unwrap_err();
    assert!(matches!(err, MediError::Storage { .. }));
    let err = store.set("bad/key", "v").await.unwrap_err();
    assert!(matches!(err, MediError::Storage { .. }));
}
