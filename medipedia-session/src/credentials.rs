//! Credential authorities
//!
//! [`MockCredentialValidator`] applies a local rule set and is the default;
//! [`RemoteCredentialValidator`] asks the backend through an [`AccountGateway`].

use async_trait::async_trait;
use medipedia_core::{
    AccountGateway, AuthAction, AuthConfig, AuthMode, CredentialValidator, Credentials, Failure,
    FailureReason, RequestOutcome, Session,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::identity::{derive_role, is_plausible_email, session_for};
use crate::store::AUTH_FAILED_MESSAGE;

/// Local rule set:
///
/// - the email must contain `@`
/// - the password must have at least `min_password_len` characters
/// - the reserved administrator address only accepts the reserved password,
///   for sign-in and sign-up alike
///
/// The session id is the email.
#[derive(Debug, Clone)]
pub struct MockCredentialValidator {
    config: AuthConfig,
    latency: Option<Duration>,
}

impl MockCredentialValidator {
    pub fn new(config: AuthConfig) -> Self {
        Self {
            config,
            latency: None,
        }
    }

    /// Delay every validation, to exercise loading states
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    fn rejection(&self, credentials: &Credentials) -> Option<&'static str> {
        if !is_plausible_email(&credentials.email) {
            return Some("email is missing '@'");
        }
        if credentials.password.chars().count() < self.config.min_password_len {
            return Some("password too short");
        }
        let is_admin =
            derive_role(&credentials.email, &self.config.admin_email) == medipedia_core::Role::Admin;
        if is_admin && credentials.password != self.config.admin_password {
            return Some("administrator password mismatch");
        }
        None
    }
}

impl Default for MockCredentialValidator {
    fn default() -> Self {
        Self::new(AuthConfig::default())
    }
}

#[async_trait]
impl CredentialValidator for MockCredentialValidator {
    async fn validate(
        &self,
        credentials: &Credentials,
        action: AuthAction,
    ) -> RequestOutcome<Session> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        match self.rejection(credentials) {
            Some(rule) => {
                debug!(email = %credentials.email, %action, rule, "Mock validator rejected login");
                RequestOutcome::failed(FailureReason::InvalidCredentials, AUTH_FAILED_MESSAGE)
            }
            None => RequestOutcome::Ok(session_for(
                credentials.email.clone(),
                &credentials.email,
                &self.config.admin_email,
            )),
        }
    }
}

/// Validator backed by the `/signin` and `/signup` endpoints
pub struct RemoteCredentialValidator {
    accounts: Arc<dyn AccountGateway>,
    admin_email: String,
}

impl RemoteCredentialValidator {
    pub fn new(accounts: Arc<dyn AccountGateway>, admin_email: impl Into<String>) -> Self {
        Self {
            accounts,
            admin_email: admin_email.into(),
        }
    }
}

#[async_trait]
impl CredentialValidator for RemoteCredentialValidator {
    async fn validate(
        &self,
        credentials: &Credentials,
        action: AuthAction,
    ) -> RequestOutcome<Session> {
        match self.accounts.authenticate(credentials, action).await {
            RequestOutcome::Ok(record) => {
                let id = record.id.unwrap_or_else(|| credentials.email.clone());
                RequestOutcome::Ok(session_for(id, &credentials.email, &self.admin_email))
            }
            RequestOutcome::Failed(failure) => {
                warn!(
                    email = %credentials.email,
                    %action,
                    reason = %failure.reason,
                    "Backend rejected login"
                );
                RequestOutcome::Failed(rejected(failure))
            }
        }
    }
}

/// A non-2xx answer means the backend rejected the credentials; transport
/// failures keep their reason so callers can tell the backend is down.
fn rejected(failure: Failure) -> Failure {
    let reason = match failure.reason {
        FailureReason::HttpStatus(_) | FailureReason::InvalidCredentials => {
            FailureReason::InvalidCredentials
        }
        other => other,
    };
    Failure {
        reason,
        message: AUTH_FAILED_MESSAGE.to_string(),
        detail: failure.backend_detail().or(failure.detail),
    }
}

/// Pick the validator configured by `auth.mode`
pub fn build_validator(
    config: &AuthConfig,
    accounts: Arc<dyn AccountGateway>,
) -> Arc<dyn CredentialValidator> {
    info!(mode = ?config.mode, "Using credential validator");
    match config.mode {
        AuthMode::Mock => Arc::new(MockCredentialValidator::new(config.clone())),
        AuthMode::Remote => Arc::new(RemoteCredentialValidator::new(
            accounts,
            config.admin_email.clone(),
        )),
    }
}
