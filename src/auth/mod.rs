//! Authentication module for managing the user session and its credential.
//!
//! This module provides:
//! - `SessionManager`: the session lifecycle (bootstrap, login, register, logout)
//! - `TokenStore`: durable storage for the bearer token pair
//!
//! Tokens are persisted to a JSON file in the platform data directory and
//! re-validated against the backend on every start.

pub mod session;
pub mod store;

pub use session::{SessionManager, SessionState};
pub use store::{StoredTokens, TokenStore};
