//! Data models for the news service.
//!
//! This module contains the data structures exchanged with the backend:
//!
//! - `Identity`, `UserProfile`: the authenticated user and their preferences
//! - `TokenPair`, `AuthSession`: credentials returned by login/register
//! - `NewsArticle`, `NewsPage`, `NewsQuery`: article listings and filters
//! - `Category`, `SentimentVerdict`: catalog and analyzer types

pub mod article;
pub mod identity;
pub mod sentiment;

pub use article::{Category, NewsArticle, NewsPage, NewsQuery, Pagination, SortField};
pub use identity::{AuthSession, Identity, ProfileUpdate, TokenPair, UserProfile};
pub use sentiment::SentimentVerdict;
