//! The session manager
//!
//! Owns the persisted identity value: writes it after login/registration,
//! reads it when screens mount, validates it, and removes it on logout or
//! expiry. No other component touches the underlying keys.

use crate::identity::{decode_claims, SessionIdentity, TokenClaims};
use crate::store::SessionStore;
use chrono::Utc;
use medicopilot_core::MediResult;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Canonical storage key for the session identity.
///
/// Earlier revisions disagreed on the key name; the legacy keys below stay
/// readable so sessions written by them remain valid.
pub const AUTH_TOKEN_KEY: &str = "auth_token";

const LEGACY_KEYS: &[&str] = &["token", "authToken", "userId"];

/// Result of reading the session, before the fail-open collapse.
///
/// `Failed` means the store itself misbehaved. Boundary callers treat it the
/// same as `Absent` (logged out), but the reason is kept so the downgrade is
/// diagnosable rather than silent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    Present(String),
    Absent,
    Failed(String),
}

impl ReadOutcome {
    /// Collapse to the boundary view: only a present value survives
    pub fn into_option(self) -> Option<String> {
        match self {
            ReadOutcome::Present(value) => Some(value),
            ReadOutcome::Absent | ReadOutcome::Failed(_) => None,
        }
    }
}

/// Authentication state as seen by a screen.
///
/// `Unknown` is the state before the first check completes; protected content
/// must not render while it holds. [`SessionManager::status`] never returns
/// it, but callers start from it (it is the `Default`).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionStatus {
    #[default]
    Unknown,
    Authenticated(SessionIdentity),
    Unauthenticated,
}

impl SessionStatus {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionStatus::Authenticated(_))
    }
}

/// Persisted-session owner. All operations are async and none spawns
/// background work; expired sessions are evicted lazily on the next check.
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
}

impl SessionManager {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    /// Persist an identity, replacing any existing one.
    ///
    /// A store failure is surfaced to the caller unchanged; it is not retried
    /// here.
    pub async fn save(&self, identity: &str) -> MediResult<()> {
        self.store.set(AUTH_TOKEN_KEY, identity).await?;
        info!("Session identity saved");
        Ok(())
    }

    /// Read the stored identity, keeping failures distinguishable from
    /// absence.
    ///
    /// Checks the canonical key first, then the legacy keys; a legacy hit is
    /// migrated to the canonical key so the old entry does not linger.
    pub async fn read_outcome(&self) -> ReadOutcome {
        match self.store.get(AUTH_TOKEN_KEY).await {
            Ok(Some(value)) => return ReadOutcome::Present(value),
            Ok(None) => {}
            Err(e) => {
                warn!(error = %e, "Session store read failed; treating as logged out");
                return ReadOutcome::Failed(e.to_string());
            }
        }

        for key in LEGACY_KEYS {
            match self.store.get(key).await {
                Ok(Some(value)) => {
                    info!(key, "Migrating session from legacy storage key");
                    // Best effort: a failed migration still yields the value.
                    if let Err(e) = self.store.set(AUTH_TOKEN_KEY, &value).await {
                        warn!(error = %e, "Failed to migrate session to canonical key");
                    } else if let Err(e) = self.store.delete(key).await {
                        warn!(error = %e, key, "Failed to remove legacy session key");
                    }
                    return ReadOutcome::Present(value);
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(error = %e, key, "Session store read failed; treating as logged out");
                    return ReadOutcome::Failed(e.to_string());
                }
            }
        }

        ReadOutcome::Absent
    }

    /// Read the stored identity, treating store failures as absence
    pub async fn read(&self) -> Option<String> {
        self.read_outcome().await.into_option()
    }

    /// Remove the stored identity. Idempotent: clearing an empty session
    /// succeeds.
    pub async fn clear(&self) -> MediResult<()> {
        self.store.delete(AUTH_TOKEN_KEY).await?;
        for key in LEGACY_KEYS {
            self.store.delete(key).await?;
        }
        info!("Session cleared");
        Ok(())
    }

    /// Whether a usable session exists right now.
    ///
    /// Identifier-shaped identities are valid by presence. Token-shaped
    /// identities must also carry an unexpired `exp` claim; an expired token
    /// is cleared here so the dead session does not survive the check. A
    /// malformed token counts as not authenticated, never as a fault.
    pub async fn is_valid(&self) -> bool {
        let Some(raw) = self.read().await else {
            return false;
        };

        match SessionIdentity::classify(&raw) {
            SessionIdentity::UserId(_) => true,
            SessionIdentity::Token(token) => match decode_claims(&token) {
                Ok(claims) if claims.is_expired_at(Utc::now()) => {
                    info!("Stored token expired; evicting session");
                    if let Err(e) = self.clear().await {
                        warn!(error = %e, "Failed to evict expired session");
                    }
                    false
                }
                Ok(_) => true,
                Err(e) => {
                    debug!(error = %e, "Stored token is malformed; treating as logged out");
                    false
                }
            },
        }
    }

    /// Decode a token-shaped identity's claims
    pub fn decode(&self, identity: &str) -> MediResult<TokenClaims> {
        decode_claims(identity)
    }

    /// Resolve the current authentication state for gating.
    ///
    /// Never returns [`SessionStatus::Unknown`]; that state belongs to the
    /// caller before this call completes.
    pub async fn status(&self) -> SessionStatus {
        if self.is_valid().await {
            match self.read().await {
                Some(raw) => SessionStatus::Authenticated(SessionIdentity::classify(&raw)),
                // save/clear racing between the two reads; resolve as logged out
                None => SessionStatus::Unauthenticated,
            }
        } else {
            SessionStatus::Unauthenticated
        }
    }
}
