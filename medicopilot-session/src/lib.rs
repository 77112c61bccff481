//! Medi-CoPilot Session - persisted authentication state
//!
//! This crate owns the one piece of durable client state: the user's session
//! identity. The identity is either a signed token with an embedded expiry
//! claim or an opaque user identifier (the older scheme, with no expiry).
//! It is written on successful login or registration, read when a screen
//! mounts, and removed on logout or once a token is found expired.
//!
//! Per app run the authentication state moves from `Unknown` (no check has
//! completed yet) to either `Authenticated` or `Unauthenticated`. Expiry is
//! terminal: there is no refresh, only a new `save` after the next login.
//!
//! Storage is an injected dependency ([`SessionStore`]) so tests can swap in
//! an in-memory fake. Store and decode faults never escape `read`/`is_valid`;
//! they are logged and reported as "no session" so callers always get a
//! deterministic answer. [`SessionManager::read_outcome`] preserves the
//! distinction for callers that care.

pub mod identity;
pub mod manager;
pub mod store;

#[cfg(test)]
mod tests;

pub use identity::{decode_claims, SessionIdentity, TokenClaims};
pub use manager::{ReadOutcome, SessionManager, SessionStatus, AUTH_TOKEN_KEY};
pub use store::{FileStore, MemoryStore, SessionStore};
