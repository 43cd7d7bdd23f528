//! API client for communicating with the news service REST API.
//!
//! This module provides the `ApiClient` struct for making authenticated
//! requests: login/registration, profile, article listings, like/save
//! toggles, and the sentiment analyzer demo endpoint.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{header, Client};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, warn};

use crate::models::{
    AuthSession, Category, Identity, NewsArticle, NewsPage, NewsQuery, ProfileUpdate,
    SentimentVerdict, TokenPair, UserProfile,
};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds.
/// 30s allows for slow API responses while failing fast enough for good UX.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Maximum number of retries for rate-limited (429) data requests.
/// Auth endpoints are never retried.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

// Wire envelopes returned by the backend

#[derive(Debug, Deserialize)]
struct AuthEnvelope {
    user: Identity,
    tokens: TokenPair,
}

#[derive(Debug, Deserialize)]
struct ProfileEnvelope {
    user: Identity,
    #[serde(default)]
    profile: Option<UserProfile>,
}

#[derive(Debug, Deserialize)]
struct ProfileUpdateEnvelope {
    profile: UserProfile,
}

#[derive(Debug, Deserialize)]
struct LikeEnvelope {
    liked: bool,
}

#[derive(Debug, Deserialize)]
struct SaveEnvelope {
    saved: bool,
}

#[derive(Debug, Deserialize)]
struct SavedListEnvelope {
    results: Vec<NewsArticle>,
}

#[derive(Debug, Deserialize)]
struct CategoriesEnvelope {
    categories: Vec<Category>,
}

/// API client for the news service.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    /// Create a new API client against the given base URL (no trailing slash)
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            token: None,
        })
    }

    /// Set the bearer token attached to subsequent requests
    pub fn set_token(&mut self, token: String) {
        self.token = Some(token);
    }

    /// Drop the bearer token; subsequent requests go out anonymous
    pub fn clear_token(&mut self) {
        self.token = None;
    }

    /// The current bearer token, if any
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn auth_headers(&self) -> Result<header::HeaderMap> {
        let mut headers = header::HeaderMap::new();
        if let Some(ref token) = self.token {
            headers.insert(
                header::AUTHORIZATION,
                header::HeaderValue::from_str(&format!("Bearer {}", token))?,
            );
        }
        Ok(headers)
    }

    // ===== Authentication =====
    // No retries here: a failed login/register is reported once.

    /// Exchange email + password for an identity and token pair
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthSession, ApiError> {
        let body = serde_json::json!({ "email": email, "password": password });
        let response = self
            .client
            .post(self.url("/auth/login/"))
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::login_failure(&body));
        }

        let envelope: AuthEnvelope = response.json().await?;
        Ok(AuthSession {
            identity: envelope.user,
            tokens: envelope.tokens,
        })
    }

    /// Register a new account; returns tokens just like a login
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
        password2: &str,
    ) -> Result<AuthSession, ApiError> {
        let body = serde_json::json!({
            "username": username,
            "email": email,
            "password": password,
            "password2": password2,
        });
        let response = self
            .client
            .post(self.url("/auth/register/"))
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::registration_failure(&body));
        }

        let envelope: AuthEnvelope = response.json().await?;
        Ok(AuthSession {
            identity: envelope.user,
            tokens: envelope.tokens,
        })
    }

    /// Fetch the authenticated user's identity and profile.
    /// Any failure here means the current token is unusable.
    pub async fn fetch_profile(&self) -> Result<(Identity, Option<UserProfile>), ApiError> {
        let response = self
            .client
            .get(self.url("/auth/profile/"))
            .headers(self.auth_headers().map_err(|e| {
                ApiError::InvalidResponse(format!("Invalid token header: {}", e))
            })?)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::from_status(status, &body));
        }

        let envelope: ProfileEnvelope = response.json().await?;
        Ok((envelope.user, envelope.profile))
    }

    /// Update profile preferences (favorite categories, notifications)
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<UserProfile> {
        let response = self
            .client
            .put(self.url("/auth/profile/"))
            .headers(self.auth_headers()?)
            .json(update)
            .send()
            .await
            .context("Failed to send profile update")?;

        let response = Self::check_response(response).await?;
        let envelope: ProfileUpdateEnvelope = response
            .json()
            .await
            .context("Failed to parse profile update response")?;
        Ok(envelope.profile)
    }

    /// Request a password reset email for the given address
    pub async fn request_password_reset(&self, email: &str) -> Result<()> {
        let body = serde_json::json!({ "email": email });
        let response = self
            .client
            .post(self.url("/auth/password-reset/request/"))
            .json(&body)
            .send()
            .await
            .context("Failed to send password reset request")?;

        Self::check_response(response).await?;
        Ok(())
    }

    /// Set a new password using an emailed reset token
    pub async fn confirm_password_reset(&self, token: &str, password: &str) -> Result<()> {
        let body = serde_json::json!({ "token": token, "password": password });
        let response = self
            .client
            .post(self.url("/auth/password-reset/confirm/"))
            .json(&body)
            .send()
            .await
            .context("Failed to send password reset confirmation")?;

        Self::check_response(response).await?;
        Ok(())
    }

    // ===== News =====

    /// Fetch a filtered, paginated page of articles
    pub async fn fetch_news(&self, query: &NewsQuery) -> Result<NewsPage> {
        self.get_with_params(&self.url("/news/"), &query.to_params())
            .await
    }

    /// Fetch a single article by id (records a view when authenticated)
    pub async fn fetch_article(&self, article_id: &str) -> Result<NewsArticle> {
        self.get(&self.url(&format!("/news/{}/", article_id))).await
    }

    /// Toggle a like on an article; returns the new liked state
    pub async fn toggle_like(&self, article_id: &str) -> Result<bool> {
        let envelope: LikeEnvelope = self
            .post(&self.url(&format!("/news/{}/like/", article_id)), &serde_json::json!({}))
            .await?;
        Ok(envelope.liked)
    }

    /// Toggle a save on an article; returns the new saved state
    pub async fn toggle_save(&self, article_id: &str) -> Result<bool> {
        let envelope: SaveEnvelope = self
            .post(&self.url(&format!("/news/{}/save/", article_id)), &serde_json::json!({}))
            .await?;
        Ok(envelope.saved)
    }

    /// Fetch the authenticated user's saved articles
    pub async fn fetch_saved(&self, page: u32, page_size: u32) -> Result<Vec<NewsArticle>> {
        let url = format!(
            "{}?page={}&page_size={}",
            self.url("/news/saved/"),
            page,
            page_size
        );
        let envelope: SavedListEnvelope = self.get(&url).await?;
        Ok(envelope.results)
    }

    /// Fetch the category catalog
    pub async fn fetch_categories(&self) -> Result<Vec<Category>> {
        let envelope: CategoriesEnvelope = self.get(&self.url("/news/categories/")).await?;
        Ok(envelope.categories)
    }

    // ===== Analyzer =====

    /// Run the sentiment analyzer over a piece of text
    pub async fn analyze(&self, text: &str) -> Result<SentimentVerdict> {
        let body = serde_json::json!({ "text": text });
        self.post(&self.url("/analyze/"), &body).await
    }

    // ===== Request plumbing =====

    /// Check if response is successful, returning an error with body if not.
    /// Returns Ok(Some(response)) for success, Ok(None) for rate limit (should retry),
    /// or Err for other errors.
    async fn check_response_for_retry(
        response: reqwest::Response,
    ) -> Result<Option<reqwest::Response>> {
        if response.status().is_success() {
            Ok(Some(response))
        } else if response.status().as_u16() == 429 {
            Ok(None)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body).into())
        }
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body).into())
        }
    }

    async fn get<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        self.get_with_params(url, &[]).await
    }

    async fn get_with_params<T: DeserializeOwned>(
        &self,
        url: &str,
        params: &[(&'static str, String)],
    ) -> Result<T> {
        let mut retries = 0;
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        loop {
            let mut request = self.client.get(url).headers(self.auth_headers()?);
            if !params.is_empty() {
                request = request.query(params);
            }
            let response = request
                .send()
                .await
                .with_context(|| format!("Failed to send GET request to {}", url))?;

            match Self::check_response_for_retry(response).await? {
                Some(response) => {
                    return response
                        .json()
                        .await
                        .with_context(|| format!("Failed to parse JSON response from {}", url));
                }
                None => {
                    retries += 1;
                    if retries > MAX_RATE_LIMIT_RETRIES {
                        return Err(ApiError::RateLimited.into());
                    }
                    warn!(url, retry = retries, backoff_ms, "Rate limited, backing off");
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    backoff_ms *= 2;
                }
            }
        }
    }

    async fn post<T: DeserializeOwned, B: Serialize>(&self, url: &str, body: &B) -> Result<T> {
        let mut retries = 0;
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        loop {
            let response = self
                .client
                .post(url)
                .headers(self.auth_headers()?)
                .json(body)
                .send()
                .await
                .with_context(|| format!("Failed to send POST request to {}", url))?;

            match Self::check_response_for_retry(response).await? {
                Some(response) => {
                    return response
                        .json()
                        .await
                        .with_context(|| format!("Failed to parse JSON response from {}", url));
                }
                None => {
                    retries += 1;
                    if retries > MAX_RATE_LIMIT_RETRIES {
                        return Err(ApiError::RateLimited.into());
                    }
                    warn!(url, retry = retries, backoff_ms, "Rate limited, backing off");
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    backoff_ms *= 2;
                }
            }
        }
    }
}
