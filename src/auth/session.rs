//! The session manager: owns the credential pair, the authenticated
//! identity, and the transitions between logged-out and logged-in.
//!
//! State machine:
//!
//! - boot: no stored credential -> `Unauthenticated` (no backend call);
//!   stored credential -> `Loading` -> one profile fetch -> `Authenticated`
//!   on success, or demotion to `Unauthenticated` with storage cleared.
//! - `login`/`register`: one backend call; on success the credential is
//!   persisted and attached to the API client before returning.
//! - `logout`: synchronous, local-only, idempotent.
//!
//! The manager owns the `ApiClient`, so the bearer decoration can never
//! drift from the credential: every transition updates the client token
//! in the same call.

use tracing::{debug, info, warn};

use crate::api::{ApiClient, ApiError};
use crate::auth::store::{StoredTokens, TokenStore};
use crate::models::{AuthSession, Identity, TokenPair, UserProfile};

/// Where the session is in its lifecycle. Exactly one is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    /// A credential exists but the identity has not been confirmed yet.
    Loading,
    Authenticated,
}

pub struct SessionManager {
    api: ApiClient,
    store: TokenStore,
    tokens: Option<TokenPair>,
    identity: Option<Identity>,
    profile: Option<UserProfile>,
    state: SessionState,
    /// Bumped on every state transition. An async operation that observes
    /// a stale epoch when it completes discards its result instead of
    /// clobbering a newer transition.
    epoch: u64,
}

impl SessionManager {
    pub fn new(api: ApiClient, store: TokenStore) -> Self {
        Self {
            api,
            store,
            tokens: None,
            identity: None,
            profile: None,
            state: SessionState::Unauthenticated,
            epoch: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_authenticated(&self) -> bool {
        self.state == SessionState::Authenticated
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn profile(&self) -> Option<&UserProfile> {
        self.profile.as_ref()
    }

    /// The credential pair currently held, if any
    #[cfg(test)]
    fn tokens(&self) -> Option<&TokenPair> {
        self.tokens.as_ref()
    }

    /// Cache the profile fetched or updated outside of bootstrap
    pub fn set_profile(&mut self, profile: UserProfile) {
        self.profile = Some(profile);
    }

    /// The API client carrying the session's current bearer decoration
    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Restore a session from durable storage.
    ///
    /// With no stored credential this resolves immediately without any
    /// backend call. With one, exactly one profile fetch decides between
    /// `Authenticated` and demotion: any failure - network, 401, malformed
    /// body - clears the credential from memory and storage. No retries.
    pub async fn bootstrap(&mut self) -> Result<(), ApiError> {
        let Some(stored) = self.store.load() else {
            debug!("No stored credential, starting logged out");
            self.state = SessionState::Unauthenticated;
            return Ok(());
        };

        self.state = SessionState::Loading;
        self.api.set_token(stored.access_token.clone());
        self.tokens = Some(TokenPair {
            access: stored.access_token,
            refresh: stored.refresh_token,
        });

        let epoch = self.epoch;
        match self.api.fetch_profile().await {
            Ok((identity, profile)) => {
                if epoch != self.epoch {
                    debug!("Discarding stale bootstrap result");
                    return Ok(());
                }
                info!(username = %identity.username, "Session restored");
                self.identity = Some(identity);
                self.profile = profile;
                self.state = SessionState::Authenticated;
                Ok(())
            }
            Err(err) => {
                if epoch != self.epoch {
                    debug!("Discarding stale bootstrap failure");
                    return Ok(());
                }
                warn!(error = %err, "Stored credential rejected, logging out");
                self.clear_session();
                Err(err)
            }
        }
    }

    /// Authenticate with email + password.
    /// On failure the session state is unchanged and the error carries a
    /// human-readable reason from the backend.
    pub async fn login(&mut self, email: &str, password: &str) -> Result<(), ApiError> {
        let auth = self.api.login(email, password).await?;
        info!(username = %auth.identity.username, "Logged in");
        self.install(auth);
        Ok(())
    }

    /// Create an account; a successful registration is also a login.
    pub async fn register(
        &mut self,
        username: &str,
        email: &str,
        password: &str,
        password2: &str,
    ) -> Result<(), ApiError> {
        let auth = self.api.register(username, email, password, password2).await?;
        info!(username = %auth.identity.username, "Registered and logged in");
        self.install(auth);
        Ok(())
    }

    /// Drop the session: credential and identity are cleared from memory
    /// and durable storage, and the bearer decoration is removed. Local
    /// only - no backend call - and safe to call repeatedly.
    pub fn logout(&mut self) {
        self.clear_session();
    }

    fn install(&mut self, auth: AuthSession) {
        self.epoch += 1;
        self.api.set_token(auth.tokens.access.clone());
        self.tokens = Some(auth.tokens);
        self.identity = Some(auth.identity);
        self.profile = None;
        self.state = SessionState::Authenticated;
        self.persist();
    }

    /// Mirror the in-memory credential to durable storage. A write failure
    /// leaves the in-process session intact; the next boot starts logged out.
    fn persist(&self) {
        let Some(ref tokens) = self.tokens else {
            return;
        };
        if let Err(err) = self.store.save(&StoredTokens {
            access_token: tokens.access.clone(),
            refresh_token: tokens.refresh.clone(),
        }) {
            warn!(error = %err, "Failed to persist tokens");
        }
    }

    fn clear_session(&mut self) {
        self.epoch += 1;
        self.tokens = None;
        self.identity = None;
        self.profile = None;
        self.api.clear_token();
        if let Err(err) = self.store.clear() {
            warn!(error = %err, "Failed to clear stored tokens");
        }
        self.state = SessionState::Unauthenticated;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn manager_for(server: &MockServer, dir: &tempfile::TempDir) -> SessionManager {
        let api = ApiClient::new(server.uri()).unwrap();
        let store = TokenStore::new(dir.path().to_path_buf());
        SessionManager::new(api, store)
    }

    fn seed_tokens(dir: &tempfile::TempDir, access: &str, refresh: &str) {
        TokenStore::new(dir.path().to_path_buf())
            .save(&StoredTokens {
                access_token: access.into(),
                refresh_token: refresh.into(),
            })
            .unwrap();
    }

    fn profile_body(username: &str) -> serde_json::Value {
        serde_json::json!({
            "user": {"id": 1, "username": username, "email": "a@b.com"},
            "profile": {"favorite_categories": [], "notification_enabled": true}
        })
    }

    fn login_body(username: &str, access: &str, refresh: &str) -> serde_json::Value {
        serde_json::json!({
            "user": {"id": 1, "username": username, "email": "a@b.com"},
            "tokens": {"access": access, "refresh": refresh},
            "message": "Login successful"
        })
    }

    #[tokio::test]
    async fn bootstrap_without_stored_tokens_makes_no_backend_call() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/auth/profile/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(profile_body("a")))
            .expect(0)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let mut session = manager_for(&server, &dir);
        session.bootstrap().await.unwrap();

        assert_eq!(session.state(), SessionState::Unauthenticated);
        assert!(session.identity().is_none());
        assert!(session.api().token().is_none());
    }

    #[tokio::test]
    async fn bootstrap_with_stored_tokens_fetches_profile_exactly_once() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/auth/profile/"))
            .and(header("authorization", "Bearer T1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(profile_body("ada")))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        seed_tokens(&dir, "T1", "R1");
        let mut session = manager_for(&server, &dir);
        session.bootstrap().await.unwrap();

        assert_eq!(session.state(), SessionState::Authenticated);
        assert_eq!(session.identity().unwrap().username, "ada");
        assert!(session.profile().is_some());
        assert_eq!(session.api().token(), Some("T1"));
    }

    #[tokio::test]
    async fn bootstrap_with_rejected_token_clears_storage() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/auth/profile/"))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_json(serde_json::json!({"error": "Token is invalid or expired"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        seed_tokens(&dir, "stale", "stale-r");
        let mut session = manager_for(&server, &dir);

        let err = session.bootstrap().await.unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized));
        assert_eq!(session.state(), SessionState::Unauthenticated);
        assert!(session.identity().is_none());
        assert!(session.api().token().is_none());
        assert!(TokenStore::new(dir.path().to_path_buf()).load().is_none());
    }

    #[tokio::test]
    async fn login_success_persists_tokens_and_sets_identity() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/login/"))
            .and(body_json(serde_json::json!({
                "email": "a@b.com",
                "password": "secret123"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(login_body("a", "T1", "R1")))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let mut session = manager_for(&server, &dir);
        session.login("a@b.com", "secret123").await.unwrap();

        assert_eq!(session.state(), SessionState::Authenticated);
        assert_eq!(session.identity().unwrap().username, "a");
        assert_eq!(session.api().token(), Some("T1"));

        let stored = TokenStore::new(dir.path().to_path_buf()).load().unwrap();
        assert_eq!(stored.access_token, "T1");
        assert_eq!(stored.refresh_token, "R1");
    }

    #[tokio::test]
    async fn failed_login_leaves_state_unchanged_with_reason() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/login/"))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_json(serde_json::json!({"error": "Invalid email or password"})),
            )
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let mut session = manager_for(&server, &dir);
        let err = session.login("a@b.com", "wrong").await.unwrap_err();

        assert_eq!(err.to_string(), "Invalid email or password");
        assert_eq!(session.state(), SessionState::Unauthenticated);
        assert!(session.api().token().is_none());
        assert!(TokenStore::new(dir.path().to_path_buf()).load().is_none());
    }

    #[tokio::test]
    async fn failed_login_without_body_uses_generic_reason() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/login/"))
            .respond_with(ResponseTemplate::new(400))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let mut session = manager_for(&server, &dir);
        let err = session.login("a@b.com", "x").await.unwrap_err();
        assert_eq!(err.to_string(), "Login failed");
    }

    #[tokio::test]
    async fn register_surfaces_password_validation_reason() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/register/"))
            .respond_with(ResponseTemplate::new(400).set_body_json(
                serde_json::json!({"password": ["This password is too short."]}),
            ))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let mut session = manager_for(&server, &dir);
        let err = session
            .register("ada", "a@b.com", "pw", "pw")
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "This password is too short.");
        assert_eq!(session.state(), SessionState::Unauthenticated);
    }

    #[tokio::test]
    async fn register_success_behaves_like_login() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/register/"))
            .respond_with(ResponseTemplate::new(201).set_body_json(login_body("new", "T2", "R2")))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let mut session = manager_for(&server, &dir);
        session
            .register("new", "n@b.com", "secret123", "secret123")
            .await
            .unwrap();

        assert_eq!(session.state(), SessionState::Authenticated);
        assert_eq!(session.api().token(), Some("T2"));
        assert!(TokenStore::new(dir.path().to_path_buf()).load().is_some());
    }

    #[tokio::test]
    async fn logout_clears_everything_without_backend_call() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/login/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(login_body("a", "T1", "R1")))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let mut session = manager_for(&server, &dir);
        session.login("a@b.com", "secret123").await.unwrap();
        assert!(session.tokens().is_some());
        session.logout();

        assert_eq!(session.state(), SessionState::Unauthenticated);
        assert!(session.identity().is_none());
        assert!(session.tokens().is_none());
        assert!(session.api().token().is_none());
        assert!(TokenStore::new(dir.path().to_path_buf()).load().is_none());

        // Idempotent: a second logout observes the same end state
        session.logout();
        assert_eq!(session.state(), SessionState::Unauthenticated);
        assert!(TokenStore::new(dir.path().to_path_buf()).load().is_none());

        // The only request the backend ever saw was the login itself
        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].url.path(), "/auth/login/");
    }

    #[tokio::test]
    async fn requests_after_logout_are_anonymous() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/login/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(login_body("a", "T1", "R1")))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/news/categories/"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"categories": []})),
            )
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let mut session = manager_for(&server, &dir);
        session.login("a@b.com", "secret123").await.unwrap();
        session.logout();

        session.api().fetch_categories().await.unwrap();

        let requests = server.received_requests().await.unwrap();
        let catalog_request = requests
            .iter()
            .find(|r| r.url.path() == "/news/categories/")
            .unwrap();
        assert!(!catalog_request.headers.contains_key("authorization"));
    }

    #[tokio::test]
    async fn bootstrap_tolerates_never_confirmed_stored_value() {
        // Simulates a crash between a storage write and backend confirmation:
        // the stored value exists but the backend has never seen it.
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/auth/profile/"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        seed_tokens(&dir, "never-confirmed", "never-confirmed-r");
        let mut session = manager_for(&server, &dir);

        assert!(session.bootstrap().await.is_err());
        assert_eq!(session.state(), SessionState::Unauthenticated);
        assert!(TokenStore::new(dir.path().to_path_buf()).load().is_none());
    }
}
