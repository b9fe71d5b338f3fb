//! The single process-wide session.
//!
//! [`SessionManager`] owns the session state and is the only place it changes:
//! startup restore, `login`, `logout` and revalidation. Everyone else reads the
//! state through [`SessionManager::current`] or a [`watch::Receiver`] from
//! [`SessionManager::subscribe`].

use crate::errors::SessionError;
use crate::handlers::auth::TokenCodec;
use crate::handlers::token_store::TokenStore;
use crate::middleware::auth_middleware::Bearer;
use crate::models::all_models::{LoginRequest, UserProfile};
use crate::routes::user_auth::AuthApi;
use chrono::{DateTime, Utc};
use log::{error, info, warn};
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;

/// An authenticated session. Only the session manager can create one.
pub struct Session {
    token: String,
    profile: UserProfile,
    expires_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn profile(&self) -> &UserProfile {
        &self.profile
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("profile", &self.profile)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub enum SessionState {
    /// Persisted token not checked yet.
    Initializing,
    Anonymous,
    Authenticated(Arc<Session>),
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated(_))
    }

    pub fn profile(&self) -> Option<&UserProfile> {
        match self {
            SessionState::Authenticated(session) => Some(session.profile()),
            _ => None,
        }
    }
}

pub struct SessionManager {
    store: Arc<dyn TokenStore>,
    auth_api: Arc<dyn AuthApi>,
    codec: TokenCodec,
    state: watch::Sender<SessionState>,
}

impl SessionManager {
    /// Creates a manager in the `Initializing` state; call [`restore`](Self::restore)
    /// to read the persisted token.
    pub fn new(store: Arc<dyn TokenStore>, auth_api: Arc<dyn AuthApi>, codec: TokenCodec) -> Self {
        let (state, _) = watch::channel(SessionState::Initializing);
        Self {
            store,
            auth_api,
            codec,
            state,
        }
    }

    /// Startup check: adopt the persisted token if it is still valid and
    /// decodes, otherwise clear storage and become anonymous.
    pub fn restore(&self) -> SessionState {
        let token = match self.store.load() {
            Ok(token) => token,
            Err(e) => {
                error!("Auth check failed: {}", e);
                None
            }
        };

        match token.and_then(|token| self.open_session(token)) {
            Some(session) => {
                info!(
                    "Restored session for user {} ({})",
                    session.profile.user_id, session.profile.role
                );
                self.state.send_replace(SessionState::Authenticated(Arc::new(session)));
            }
            None => self.become_anonymous(),
        }
        self.current()
    }

    pub fn current(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn profile(&self) -> Option<UserProfile> {
        self.state.borrow().profile().cloned()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    /// Signs in against the API.
    ///
    /// The returned token is checked before it is persisted, so a token the
    /// client cannot decode never reaches storage.
    pub async fn login(&self, email: &str, password: &str) -> Result<UserProfile, SessionError> {
        let request = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };

        let response = self.auth_api.login(&request).await.map_err(|e| {
            warn!("Login call failed: {}", e);
            SessionError::Authentication(e.to_string())
        })?;

        if !response.is_success {
            let message = response.message.unwrap_or_else(|| "Login failed".to_string());
            return Err(SessionError::Authentication(message));
        }

        let token = match response.data {
            Some(data) if data.user_dto.is_some() => data.token.filter(|t| !t.trim().is_empty()),
            _ => None,
        }
        .ok_or_else(|| SessionError::Authentication("Login failed".to_string()))?;

        self.codec.check(&token).map_err(SessionError::InvalidToken)?;
        let profile = self
            .codec
            .try_decode_profile(&token)
            .map_err(SessionError::InvalidToken)?;

        self.store.save(&token)?;

        let session = Session {
            expires_at: self.codec.expires_at(&token),
            token,
            profile: profile.clone(),
        };
        info!("Signed in as user {} ({})", profile.user_id, profile.role);
        self.state.send_replace(SessionState::Authenticated(Arc::new(session)));

        Ok(profile)
    }

    /// Clears the persisted token and the session. Safe to call repeatedly.
    pub fn logout(&self) {
        if self.is_authenticated() {
            info!("Signing out");
        }
        self.become_anonymous();
    }

    /// Re-checks the held token; an expired or undecodable token ends the
    /// session. Returns whether a session is still active.
    pub fn revalidate(&self) -> bool {
        let token = match &*self.state.borrow() {
            SessionState::Authenticated(session) => session.token.clone(),
            _ => return false,
        };

        match self.codec.check(&token) {
            Ok(()) => true,
            Err(e) => {
                warn!("Session token no longer usable: {}", e);
                self.become_anonymous();
                false
            }
        }
    }

    /// Credential for an authorized API call.
    pub fn bearer(&self) -> Result<Bearer, SessionError> {
        if !self.revalidate() {
            return Err(SessionError::NotAuthenticated);
        }
        match &*self.state.borrow() {
            SessionState::Authenticated(session) => Ok(Bearer::new(session.token.as_str())),
            _ => Err(SessionError::NotAuthenticated),
        }
    }

    fn open_session(&self, token: String) -> Option<Session> {
        if !self.codec.is_valid(&token) {
            info!("Persisted token is expired or invalid");
            return None;
        }
        let profile = self.codec.decode_profile(&token)?;
        Some(Session {
            expires_at: self.codec.expires_at(&token),
            token,
            profile,
        })
    }

    fn become_anonymous(&self) {
        if let Err(e) = self.store.clear() {
            error!("Failed to clear persisted token: {}", e);
        }
        self.state.send_replace(SessionState::Anonymous);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::errors::{ApiError, DecodeError};
    use crate::handlers::token_store::MemoryTokenStore;
    use crate::models::all_models::{ApiResponse, LoginData, UserRole};
    use async_trait::async_trait;
    use chrono::Duration;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::{json, Value};
    use std::sync::Mutex;

    pub(crate) fn mint(claims: Value) -> String {
        encode(&Header::default(), &claims, &EncodingKey::from_secret(b"test")).unwrap()
    }

    pub(crate) fn employee_token(valid_for: Duration) -> String {
        mint(json!({
            "exp": (Utc::now() + valid_for).timestamp(),
            "sub": "41",
            "email": "eve@acme.test",
            "role": "Employee",
            "employee": "{\"employeeID\":5}",
        }))
    }

    pub(crate) fn company_token(company_id: i64) -> String {
        mint(json!({
            "exp": (Utc::now() + Duration::minutes(10)).timestamp(),
            "sub": 2,
            "email": "boss@acme.test",
            "role": "Company",
            "corporateCompany": json!({"companyID": company_id}).to_string(),
        }))
    }

    pub(crate) enum LoginReply {
        Response(Value),
        Unreachable,
    }

    pub(crate) struct FakeAuthApi {
        reply: LoginReply,
        pub(crate) calls: Mutex<Vec<String>>,
    }

    impl FakeAuthApi {
        pub(crate) fn replying(body: Value) -> Arc<Self> {
            Arc::new(Self {
                reply: LoginReply::Response(body),
                calls: Mutex::new(Vec::new()),
            })
        }

        pub(crate) fn unreachable() -> Arc<Self> {
            Arc::new(Self {
                reply: LoginReply::Unreachable,
                calls: Mutex::new(Vec::new()),
            })
        }

        pub(crate) fn issuing(token: &str) -> Arc<Self> {
            Self::replying(json!({
                "isSuccess": true,
                "message": "ok",
                "data": {"token": token, "userDto": {"email": "eve@acme.test"}},
            }))
        }
    }

    #[async_trait]
    impl AuthApi for FakeAuthApi {
        async fn login(&self, request: &LoginRequest) -> Result<ApiResponse<LoginData>, ApiError> {
            self.calls.lock().unwrap().push(request.email.clone());
            match &self.reply {
                LoginReply::Response(body) => Ok(serde_json::from_value(body.clone())?),
                LoginReply::Unreachable => Err(ApiError::Rejected("connection refused".into())),
            }
        }
    }

    fn manager(store: Arc<MemoryTokenStore>, api: Arc<FakeAuthApi>) -> SessionManager {
        SessionManager::new(store, api, TokenCodec::new())
    }

    #[test]
    fn starts_initializing_then_restores_valid_token() {
        let token = employee_token(Duration::minutes(10));
        let store = Arc::new(MemoryTokenStore::with_token(&token));
        let session = manager(store.clone(), FakeAuthApi::unreachable());

        assert!(matches!(session.current(), SessionState::Initializing));
        assert!(!session.is_authenticated());

        let state = session.restore();
        assert!(state.is_authenticated());
        let profile = session.profile().unwrap();
        assert_eq!(profile.role, UserRole::Employee);
        assert_eq!(profile.employee().unwrap().employee_id, Some(5));
        assert_eq!(store.load().unwrap(), Some(token));
    }

    #[test]
    fn expired_token_at_startup_clears_storage() {
        let token = employee_token(Duration::seconds(-1));
        let store = Arc::new(MemoryTokenStore::with_token(token));
        let session = manager(store.clone(), FakeAuthApi::unreachable());

        assert!(matches!(session.restore(), SessionState::Anonymous));
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn undecodable_token_at_startup_clears_storage() {
        let token = mint(json!({
            "exp": (Utc::now() + Duration::minutes(5)).timestamp(),
            "role": "Admin",
        }));
        let store = Arc::new(MemoryTokenStore::with_token(token));
        let session = manager(store.clone(), FakeAuthApi::unreachable());

        assert!(matches!(session.restore(), SessionState::Anonymous));
        assert_eq!(store.load().unwrap(), None);
    }

    #[tokio::test]
    async fn login_persists_token_and_authenticates() {
        let token = employee_token(Duration::minutes(10));
        let store = Arc::new(MemoryTokenStore::new());
        let api = FakeAuthApi::issuing(&token);
        let session = manager(store.clone(), api.clone());
        session.restore();
        let mut changes = session.subscribe();

        let profile = session.login("eve@acme.test", "hunter2").await.unwrap();

        assert_eq!(profile.user_id, 41);
        assert!(session.is_authenticated());
        assert_eq!(store.load().unwrap(), Some(token));
        assert_eq!(*api.calls.lock().unwrap(), vec!["eve@acme.test".to_string()]);
        assert!(changes.has_changed().unwrap());
        assert!(changes.borrow_and_update().is_authenticated());
    }

    #[tokio::test]
    async fn rejected_credentials_are_an_authentication_error() {
        let store = Arc::new(MemoryTokenStore::new());
        let session = manager(store.clone(), FakeAuthApi::replying(json!({"isSuccess": false})));
        session.restore();

        let err = session.login("a@b.com", "wrong").await.unwrap_err();

        assert!(matches!(err, SessionError::Authentication(_)));
        assert!(matches!(session.current(), SessionState::Anonymous));
        assert_eq!(store.load().unwrap(), None);
    }

    #[tokio::test]
    async fn failed_login_call_is_an_authentication_error() {
        let session = manager(Arc::new(MemoryTokenStore::new()), FakeAuthApi::unreachable());
        session.restore();

        let err = session.login("a@b.com", "pw").await.unwrap_err();
        assert!(matches!(err, SessionError::Authentication(_)));
    }

    #[tokio::test]
    async fn success_without_token_or_user_is_an_authentication_error() {
        let token = employee_token(Duration::minutes(10));
        for body in [
            json!({"isSuccess": true}),
            json!({"isSuccess": true, "data": {"userDto": {"id": 1}}}),
            json!({"isSuccess": true, "data": {"token": token}}),
        ] {
            let session = manager(Arc::new(MemoryTokenStore::new()), FakeAuthApi::replying(body));
            let err = session.login("a@b.com", "pw").await.unwrap_err();
            assert!(matches!(err, SessionError::Authentication(_)), "{err:?}");
            assert!(!session.is_authenticated());
        }
    }

    #[tokio::test]
    async fn undecodable_issued_token_is_an_invalid_token_error() {
        let store = Arc::new(MemoryTokenStore::new());
        let session = manager(store.clone(), FakeAuthApi::issuing("not-a-token"));
        session.restore();

        let err = session.login("eve@acme.test", "hunter2").await.unwrap_err();

        assert!(matches!(err, SessionError::InvalidToken(DecodeError::Malformed)));
        assert!(!session.is_authenticated());
        assert!(session.profile().is_none());
        // validated before persisting
        assert_eq!(store.load().unwrap(), None);
    }

    #[tokio::test]
    async fn expired_issued_token_is_an_invalid_token_error() {
        let token = employee_token(Duration::seconds(-5));
        let session = manager(Arc::new(MemoryTokenStore::new()), FakeAuthApi::issuing(&token));

        let err = session.login("eve@acme.test", "hunter2").await.unwrap_err();
        assert!(matches!(err, SessionError::InvalidToken(DecodeError::Expired)));
    }

    #[tokio::test]
    async fn logout_is_idempotent_and_survives_restart() {
        let token = employee_token(Duration::minutes(10));
        let store = Arc::new(MemoryTokenStore::new());
        let session = manager(store.clone(), FakeAuthApi::issuing(&token));
        session.login("eve@acme.test", "hunter2").await.unwrap();

        session.logout();
        assert!(matches!(session.current(), SessionState::Anonymous));
        assert_eq!(store.load().unwrap(), None);

        session.logout();
        assert!(matches!(session.current(), SessionState::Anonymous));
        assert_eq!(store.load().unwrap(), None);

        let restarted = manager(store, FakeAuthApi::unreachable());
        assert!(matches!(restarted.restore(), SessionState::Anonymous));
    }

    #[tokio::test]
    async fn bearer_requires_a_live_session() {
        let token = employee_token(Duration::minutes(10));
        let session = manager(Arc::new(MemoryTokenStore::new()), FakeAuthApi::issuing(&token));
        session.restore();
        assert!(matches!(session.bearer(), Err(SessionError::NotAuthenticated)));

        session.login("eve@acme.test", "hunter2").await.unwrap();
        assert_eq!(session.bearer().unwrap().token(), token);
    }

    #[tokio::test]
    async fn revalidation_ends_an_expired_session() {
        let token = employee_token(Duration::seconds(1));
        let store = Arc::new(MemoryTokenStore::new());
        let session = manager(store.clone(), FakeAuthApi::issuing(&token));
        session.login("eve@acme.test", "hunter2").await.unwrap();
        assert!(session.revalidate());

        tokio::time::sleep(std::time::Duration::from_millis(2100)).await;

        assert!(!session.revalidate());
        assert!(matches!(session.current(), SessionState::Anonymous));
        assert_eq!(store.load().unwrap(), None);
        assert!(matches!(session.bearer(), Err(SessionError::NotAuthenticated)));
    }
}
