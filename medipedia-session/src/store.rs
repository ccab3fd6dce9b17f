//! Session store
//!
//! Holds at most one [`Session`] and keeps it in step with the persisted copy
//! under the session key.
//!
//! ```text
//! Anonymous --login ok--> Authenticated --logout--> Anonymous
//!           <--restore-->
//! ```

use medipedia_core::{
    AuthAction, CredentialValidator, Credentials, Failure, FailureReason, KeyValueStore,
    RequestOutcome, Session, DEFAULT_ADMIN_EMAIL, DEFAULT_SESSION_KEY,
};
use std::sync::Arc;

use crate::identity::derive_role;
use tracing::{debug, info, warn};

pub const AUTH_FAILED_MESSAGE: &str =
    "Authentication failed. Please check your credentials and try again.";
pub const SESSION_SAVE_FAILED_MESSAGE: &str = "Could not save your session. Please try again.";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Anonymous,
    Authenticated(Session),
}

/// Explicit session owner, built once at start-up and lent to controllers
pub struct SessionStore {
    storage: Arc<dyn KeyValueStore>,
    validator: Arc<dyn CredentialValidator>,
    key: String,
    admin_email: String,
    state: SessionState,
}

impl SessionStore {
    /// New store in the `Anonymous` state; call [`restore`](Self::restore) to
    /// pick up a persisted session
    pub fn new(storage: Arc<dyn KeyValueStore>, validator: Arc<dyn CredentialValidator>) -> Self {
        Self {
            storage,
            validator,
            key: DEFAULT_SESSION_KEY.to_string(),
            admin_email: DEFAULT_ADMIN_EMAIL.to_string(),
            state: SessionState::Anonymous,
        }
    }

    /// Persist under a different key
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    /// Reserved administrator address used to re-derive restored roles
    pub fn with_admin_email(mut self, admin_email: impl Into<String>) -> Self {
        self.admin_email = admin_email.into();
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn current(&self) -> Option<&Session> {
        match &self.state {
            SessionState::Authenticated(session) => Some(session),
            SessionState::Anonymous => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.current().is_some()
    }

    /// Load the persisted session.
    ///
    /// A corrupt value is removed and the store ends `Anonymous`. The role is
    /// never taken on trust: it is derived again from the email, and a
    /// mismatching copy is rewritten. Calling this again yields the same state.
    pub fn restore(&mut self) -> Option<&Session> {
        self.state = match self.storage.get(&self.key) {
            Ok(Some(raw)) => match serde_json::from_str::<Session>(&raw) {
                Ok(session) => self.adopt_restored(session),
                Err(e) => {
                    warn!(key = %self.key, error = %e, "Discarding corrupt persisted session");
                    if let Err(error) = self.storage.remove(&self.key) {
                        error.log();
                    }
                    SessionState::Anonymous
                }
            },
            Ok(None) => {
                debug!(key = %self.key, "No persisted session");
                SessionState::Anonymous
            }
            Err(error) => {
                error.log();
                SessionState::Anonymous
            }
        };

        self.current()
    }

    /// Validate credentials and, on success, persist then adopt the session.
    ///
    /// A successful login while authenticated replaces the current session.
    /// On any failure the previous state is left untouched.
    pub async fn login(
        &mut self,
        email: &str,
        password: &str,
        action: AuthAction,
    ) -> RequestOutcome<Session> {
        let credentials = Credentials::new(email, password);
        info!(email = %email, %action, "Login attempt");

        let session = match self.validator.validate(&credentials, action).await {
            RequestOutcome::Ok(session) => session,
            RequestOutcome::Failed(failure) => {
                warn!(email = %email, reason = %failure.reason, "Login failed");
                let reason = match failure.reason {
                    FailureReason::Timeout | FailureReason::NetworkError => failure.reason,
                    _ => FailureReason::InvalidCredentials,
                };
                return RequestOutcome::Failed(Failure {
                    reason,
                    message: AUTH_FAILED_MESSAGE.to_string(),
                    detail: failure.detail,
                });
            }
        };

        if let Err(error) = self.persist(&session) {
            error.log();
            return RequestOutcome::Failed(error.into_failure(SESSION_SAVE_FAILED_MESSAGE));
        }

        info!(email = %session.email, role = %session.role, "Logged in");
        self.state = SessionState::Authenticated(session.clone());
        RequestOutcome::Ok(session)
    }

    /// Forget the session. Always ends `Anonymous`; a failure to remove the
    /// persisted copy is logged only.
    pub fn logout(&mut self) {
        if let Err(error) = self.storage.remove(&self.key) {
            error.log();
        }
        if let SessionState::Authenticated(session) = &self.state {
            info!(email = %session.email, "Logged out");
        }
        self.state = SessionState::Anonymous;
    }

    fn adopt_restored(&self, mut session: Session) -> SessionState {
        let role = derive_role(&session.email, &self.admin_email);
        if role != session.role {
            warn!(
                email = %session.email,
                stored = %session.role,
                derived = %role,
                "Persisted role does not match the account; correcting"
            );
            session.role = role;
            if let Err(error) = self.persist(&session) {
                // The stored copy still claims the old role; don't diverge from it
                error.log();
                return SessionState::Anonymous;
            }
        }

        info!(email = %session.email, role = %session.role, "Restored session");
        SessionState::Authenticated(session)
    }

    fn persist(&self, session: &Session) -> medipedia_core::MedipediaResult<()> {
        let raw = serde_json::to_string(session).map_err(|e| {
            medipedia_core::storage_error!("Cannot serialize session", "session_store", e)
        })?;
        self.storage.set(&self.key, &raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::MockCredentialValidator;
    use crate::storage::MemoryStore;
    use medipedia_core::{storage_error, MedipediaResult, Role};

    fn store_with(storage: Arc<dyn KeyValueStore>) -> SessionStore {
        SessionStore::new(storage, Arc::new(MockCredentialValidator::default()))
    }

    /// Accepts reads, fails every write
    struct ReadOnlyStore;

    impl KeyValueStore for ReadOnlyStore {
        fn get(&self, _key: &str) -> MedipediaResult<Option<String>> {
            Ok(None)
        }

        fn set(&self, _key: &str, _value: &str) -> MedipediaResult<()> {
            Err(storage_error!("read-only", "test"))
        }

        fn remove(&self, _key: &str) -> MedipediaResult<()> {
            Err(storage_error!("read-only", "test"))
        }
    }

    #[tokio::test]
    async fn admin_login_yields_admin_session() {
        let storage = Arc::new(MemoryStore::new());
        let mut store = store_with(storage.clone());

        let session = store
            .login("admin@uol.edu.pk", "admin123", AuthAction::SignIn)
            .await
            .ok()
            .unwrap();

        assert_eq!(session.role, Role::Admin);
        assert_eq!(store.current(), Some(&session));
        assert_eq!(
            storage.get(DEFAULT_SESSION_KEY).unwrap().as_deref(),
            Some(r#"{"id":"admin@uol.edu.pk","email":"admin@uol.edu.pk","role":"admin"}"#)
        );
    }

    #[tokio::test]
    async fn short_password_is_rejected_and_nothing_persisted() {
        let storage = Arc::new(MemoryStore::new());
        let mut store = store_with(storage.clone());

        let outcome = store.login("a@b.com", "short", AuthAction::SignIn).await;

        let failure = outcome.failure().unwrap();
        assert_eq!(failure.reason, FailureReason::InvalidCredentials);
        assert_eq!(failure.message, AUTH_FAILED_MESSAGE);
        assert_eq!(store.state(), &SessionState::Anonymous);
        assert_eq!(storage.get(DEFAULT_SESSION_KEY).unwrap(), None);
    }

    #[tokio::test]
    async fn signup_yields_user_session() {
        let mut store = store_with(Arc::new(MemoryStore::new()));
        let session = store
            .login("a@b.com", "longenough", AuthAction::SignUp)
            .await
            .ok()
            .unwrap();
        assert_eq!(session.role, Role::User);
        assert_eq!(session.id, "a@b.com");
    }

    #[tokio::test]
    async fn persist_failure_keeps_store_anonymous() {
        let mut store = store_with(Arc::new(ReadOnlyStore));
        let outcome = store.login("a@b.com", "longenough", AuthAction::SignIn).await;

        assert_eq!(
            outcome.failure().map(|f| f.reason),
            Some(FailureReason::Storage)
        );
        assert!(!store.is_authenticated());
    }

    #[tokio::test]
    async fn logout_ends_anonymous_even_when_removal_fails() {
        let mut store = store_with(Arc::new(ReadOnlyStore));
        store.state = SessionState::Authenticated(Session {
            id: "a@b.com".to_string(),
            email: "a@b.com".to_string(),
            role: Role::User,
        });

        store.logout();
        assert_eq!(store.state(), &SessionState::Anonymous);
    }

    #[tokio::test]
    async fn second_login_replaces_the_session() {
        let storage = Arc::new(MemoryStore::new());
        let mut store = store_with(storage.clone());

        assert!(store
            .login("first@b.com", "longenough", AuthAction::SignIn)
            .await
            .is_ok());
        assert!(store
            .login("second@b.com", "longenough", AuthAction::SignIn)
            .await
            .is_ok());

        assert_eq!(store.current().map(|s| s.email.as_str()), Some("second@b.com"));
        let persisted: Session =
            serde_json::from_str(&storage.get(DEFAULT_SESSION_KEY).unwrap().unwrap()).unwrap();
        assert_eq!(persisted.email, "second@b.com");
    }

    #[tokio::test]
    async fn failed_login_keeps_previous_session() {
        let mut store = store_with(Arc::new(MemoryStore::new()));
        assert!(store
            .login("first@b.com", "longenough", AuthAction::SignIn)
            .await
            .is_ok());

        assert!(store
            .login("second@b.com", "short", AuthAction::SignIn)
            .await
            .is_failed());
        assert_eq!(store.current().map(|s| s.email.as_str()), Some("first@b.com"));
    }

    #[test]
    fn corrupt_value_is_cleared_and_restore_is_idempotent() {
        let storage = Arc::new(MemoryStore::new().with_entry(DEFAULT_SESSION_KEY, "{not json"));
        let mut store = store_with(storage.clone());

        assert!(store.restore().is_none());
        assert_eq!(storage.get(DEFAULT_SESSION_KEY).unwrap(), None);

        assert!(store.restore().is_none());
        assert_eq!(store.state(), &SessionState::Anonymous);
    }

    #[test]
    fn restore_picks_up_persisted_session() {
        let storage = Arc::new(MemoryStore::new().with_entry(
            "custom_key",
            r#"{"id":"7","email":"doc@uol.edu.pk","role":"user"}"#,
        ));
        let mut store = store_with(storage).with_key("custom_key");

        let restored = store.restore().cloned().unwrap();
        assert_eq!(restored.id, "7");
        assert_eq!(store.restore().cloned(), Some(restored));
    }

    const PROMOTED: &str = r#"{"id":"7","email":"doc@uol.edu.pk","role":"admin"}"#;

    #[test]
    fn edited_role_is_derived_again_and_rewritten() {
        let storage = Arc::new(MemoryStore::new().with_entry(DEFAULT_SESSION_KEY, PROMOTED));
        let mut store = store_with(storage.clone());

        let restored = store.restore().cloned().unwrap();
        assert_eq!(restored.role, Role::User);
        assert_eq!(restored.id, "7");

        let persisted: Session =
            serde_json::from_str(&storage.get(DEFAULT_SESSION_KEY).unwrap().unwrap()).unwrap();
        assert_eq!(persisted.role, Role::User);
    }

    #[test]
    fn configured_admin_email_is_honoured_on_restore() {
        let storage = Arc::new(MemoryStore::new().with_entry(DEFAULT_SESSION_KEY, PROMOTED));
        let mut store = store_with(storage).with_admin_email("Doc@uol.edu.pk");

        assert_eq!(store.restore().map(|s| s.role), Some(Role::Admin));
    }

    /// Serves an edited session but refuses to rewrite it
    struct FrozenStore;

    impl KeyValueStore for FrozenStore {
        fn get(&self, _key: &str) -> MedipediaResult<Option<String>> {
            Ok(Some(PROMOTED.to_string()))
        }

        fn set(&self, _key: &str, _value: &str) -> MedipediaResult<()> {
            Err(storage_error!("frozen", "test"))
        }

        fn remove(&self, _key: &str) -> MedipediaResult<()> {
            Err(storage_error!("frozen", "test"))
        }
    }

    #[test]
    fn uncorrectable_role_is_not_adopted() {
        let mut store = store_with(Arc::new(FrozenStore));
        assert!(store.restore().is_none());
        assert_eq!(store.state(), &SessionState::Anonymous);
    }

    /// Backend that never answers in time
    struct UnreachableValidator;

    #[async_trait::async_trait]
    impl CredentialValidator for UnreachableValidator {
        async fn validate(
            &self,
            _credentials: &Credentials,
            _action: AuthAction,
        ) -> RequestOutcome<Session> {
            RequestOutcome::Failed(Failure::new(FailureReason::Timeout, "timed out"))
        }
    }

    #[tokio::test]
    async fn timeout_is_not_reported_as_bad_credentials() {
        let mut store = SessionStore::new(
            Arc::new(MemoryStore::new()),
            Arc::new(UnreachableValidator),
        );

        let outcome = store.login("a@b.com", "longenough", AuthAction::SignIn).await;

        let failure = outcome.failure().unwrap();
        assert_eq!(failure.reason, FailureReason::Timeout);
        assert_eq!(failure.message, AUTH_FAILED_MESSAGE);
        assert!(!store.is_authenticated());
    }
}
