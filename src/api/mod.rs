//! REST API client module for the news service backend.
//!
//! This module provides the `ApiClient` for communicating with the
//! news aggregation API: authentication, profile, article listings,
//! like/save interactions, and the sentiment analyzer.
//!
//! The API uses JWT bearer token authentication; the token is attached
//! per request from the client's current credential.

pub mod client;
pub mod error;

pub use client::ApiClient;
pub use error::ApiError;
