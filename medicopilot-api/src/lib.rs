//! Medi-CoPilot API - HTTP client for the medication-tracking backend
//!
//! Thin JSON-over-HTTP wrapper around the remote backend. On successful login
//! or registration the returned identity value is handed to the session
//! manager by the caller; this crate does not touch session storage itself.

pub mod client;

#[cfg(test)]
mod tests;

pub use client::{ApiClientConfig, LoginResponse, MediApiClient, RegisterResponse};
