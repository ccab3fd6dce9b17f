//! Account endpoints: `/signup` and `/signin`

use async_trait::async_trait;
use medipedia_core::{
    AccountGateway, AccountRecord, ActionMessage, AuthAction, Credentials, FailureReason,
    RequestOutcome,
};
use reqwest::Method;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, warn};

use crate::http::HttpClient;

pub const SIGNUP_SUCCESS_MESSAGE: &str = "User added successfully!";
pub const SIGNUP_FAILURE_MESSAGE: &str = "Failed to add user";
pub const SIGNUP_NETWORK_MESSAGE: &str = "Network error while adding user";
pub const AUTHENTICATE_FAILURE_MESSAGE: &str =
    "Authentication failed. Please check your credentials and try again.";

/// Pull the account id out of a `/signin` or `/signup` reply
fn account_id(body: &Value) -> Option<String> {
    ["user_id", "id"]
        .iter()
        .find_map(|key| match body.get(key)? {
            Value::String(id) if !id.is_empty() => Some(id.clone()),
            Value::Number(id) => Some(id.to_string()),
            _ => None,
        })
}

/// [`AccountGateway`] over the backend's account endpoints
pub struct HttpAccountGateway {
    http: Arc<HttpClient>,
}

impl HttpAccountGateway {
    pub fn new(http: Arc<HttpClient>) -> Self {
        Self { http }
    }

    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    fn credentials_request(&self, path: &str, credentials: &Credentials) -> crate::HttpRequest {
        self.http
            .request(Method::POST, path)
            .header("Content-Type", "application/json")
            .header("accept", "application/json")
            .json(json!({
                "email": credentials.email,
                "password": credentials.password,
            }))
    }
}

#[async_trait]
impl AccountGateway for HttpAccountGateway {
    async fn signup(&self, credentials: &Credentials) -> RequestOutcome<ActionMessage> {
        info!(email = %credentials.email, "Adding user");

        let request = self.credentials_request(AuthAction::SignUp.as_path(), credentials);
        match self.http.execute(request).await {
            RequestOutcome::Ok(response) => {
                let message = response
                    .json::<Value>()
                    .ok()
                    .and_then(|body| body.get("message").and_then(Value::as_str).map(str::to_string))
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| SIGNUP_SUCCESS_MESSAGE.to_string());
                RequestOutcome::Ok(ActionMessage::new(message))
            }
            RequestOutcome::Failed(failure) => {
                let message = match failure.reason {
                    FailureReason::NetworkError | FailureReason::Timeout => {
                        SIGNUP_NETWORK_MESSAGE.to_string()
                    }
                    _ => failure
                        .backend_detail()
                        .unwrap_or_else(|| SIGNUP_FAILURE_MESSAGE.to_string()),
                };
                warn!(email = %credentials.email, reason = %failure.reason, "Error adding user");
                RequestOutcome::Failed(failure.with_message(message))
            }
        }
    }

    async fn authenticate(
        &self,
        credentials: &Credentials,
        action: AuthAction,
    ) -> RequestOutcome<AccountRecord> {
        let request = self.credentials_request(action.as_path(), credentials);
        match self.http.execute(request).await {
            RequestOutcome::Ok(response) => {
                let id = response.json::<Value>().ok().as_ref().and_then(account_id);
                RequestOutcome::Ok(AccountRecord { id })
            }
            RequestOutcome::Failed(failure) => {
                RequestOutcome::Failed(failure.with_message(AUTHENTICATE_FAILURE_MESSAGE))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_id_prefers_user_id_and_accepts_numbers() {
        assert_eq!(
            account_id(&json!({"user_id": "u-1", "id": "other"})).as_deref(),
            Some("u-1")
        );
        assert_eq!(account_id(&json!({"id": 42})).as_deref(), Some("42"));
        assert_eq!(account_id(&json!({"message": "ok"})), None);
    }
}
