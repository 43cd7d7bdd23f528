use serde::{Deserialize, Serialize};

/// The authenticated user as returned by the backend.
/// Never constructed locally - always deserialized from an auth or profile response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub id: Option<i64>,
    pub username: String,
    pub email: Option<String>,
}

/// Per-user preferences stored alongside the account.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UserProfile {
    #[serde(default)]
    pub favorite_categories: Vec<String>,
    #[serde(default = "default_notification_enabled")]
    pub notification_enabled: bool,
    pub notification_frequency: Option<String>,
    pub theme: Option<String>,
}

fn default_notification_enabled() -> bool {
    true
}

/// Partial profile update sent to `PUT /auth/profile/`.
/// `None` fields are omitted so the backend leaves them untouched.
#[derive(Debug, Clone, Serialize, Default)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub favorite_categories: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification_enabled: Option<bool>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.favorite_categories.is_none() && self.notification_enabled.is_none()
    }
}

/// Bearer token pair issued on login/registration.
/// The refresh token is persisted but not used for renewal; a rejected
/// access token forces a fresh login instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// A successful authentication: who the user is plus the tokens to act as them.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub identity: Identity,
    pub tokens: TokenPair,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_identity() {
        let json = r#"{"id": 7, "username": "ada", "email": "ada@example.com"}"#;
        let identity: Identity = serde_json::from_str(json).unwrap();
        assert_eq!(identity.id, Some(7));
        assert_eq!(identity.username, "ada");
        assert_eq!(identity.email.as_deref(), Some("ada@example.com"));
    }

    #[test]
    fn test_parse_profile_defaults() {
        // A freshly created profile may carry only the user_id
        let profile: UserProfile = serde_json::from_str(r#"{"user_id": 7}"#).unwrap();
        assert!(profile.favorite_categories.is_empty());
        assert!(profile.notification_enabled);
        assert!(profile.theme.is_none());
    }

    #[test]
    fn test_profile_update_omits_unset_fields() {
        let update = ProfileUpdate {
            notification_enabled: Some(false),
            ..Default::default()
        };
        let json = serde_json::to_string(&update).unwrap();
        assert_eq!(json, r#"{"notification_enabled":false}"#);
    }
}
