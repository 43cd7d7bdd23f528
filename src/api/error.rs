use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    /// Backend rejected the request with a human-readable reason.
    #[error("{0}")]
    Rejected(String),

    #[error("Unauthorized - session may be expired")]
    Unauthorized,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Generic reasons used when the backend body carries no usable message
const GENERIC_LOGIN_FAILURE: &str = "Login failed";
const GENERIC_REGISTRATION_FAILURE: &str = "Registration failed";

/// Error body shape shared by most backend endpoints.
/// Registration failures may instead carry a `password` validation array.
#[derive(Debug, Deserialize, Default)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    password: Option<Vec<String>>,
}

impl ApiError {
    /// Truncate a response body to avoid logging excessive data.
    /// Cuts on a character boundary so multi-byte bodies cannot panic.
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            return body.to_string();
        }
        let cut = body
            .char_indices()
            .map(|(i, _)| i)
            .take_while(|i| *i <= MAX_ERROR_BODY_LENGTH)
            .last()
            .unwrap_or(0);
        format!(
            "{}... (truncated, {} total bytes)",
            &body[..cut],
            body.len()
        )
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let truncated = Self::truncate_body(body);
        match status.as_u16() {
            401 => ApiError::Unauthorized,
            404 => ApiError::NotFound(truncated),
            429 => ApiError::RateLimited,
            500..=599 => ApiError::ServerError(truncated),
            _ => match parse_error_body(body).error {
                Some(reason) => ApiError::Rejected(reason),
                None => ApiError::InvalidResponse(format!("Status {}: {}", status, truncated)),
            },
        }
    }

    /// Failed login: use the backend's `error` string, else a generic reason.
    pub fn login_failure(body: &str) -> Self {
        let reason = parse_error_body(body)
            .error
            .unwrap_or_else(|| GENERIC_LOGIN_FAILURE.to_string());
        ApiError::Rejected(reason)
    }

    /// Failed registration: prefer the first `password` validation message,
    /// then the `error` string, then a generic reason.
    pub fn registration_failure(body: &str) -> Self {
        let parsed = parse_error_body(body);
        let reason = parsed
            .password
            .and_then(|messages| messages.into_iter().next())
            .or(parsed.error)
            .unwrap_or_else(|| GENERIC_REGISTRATION_FAILURE.to_string());
        ApiError::Rejected(reason)
    }
}

fn parse_error_body(body: &str) -> ErrorBody {
    serde_json::from_str(body).unwrap_or_default()
}
