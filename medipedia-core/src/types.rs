//! Core data type definitions

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// Role held by an authenticated user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            _ => Err(format!("Unknown role: {}", s)),
        }
    }
}

/// Authenticated identity held by the client.
///
/// Serialized as `{"id", "email", "role"}`; this is the persisted shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub email: String,
    pub role: Role,
}

impl Session {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Whether a login attempt signs in to an existing account or creates one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthAction {
    #[serde(rename = "signin")]
    SignIn,
    #[serde(rename = "signup")]
    SignUp,
}

impl AuthAction {
    /// Backend path segment for this action
    pub fn as_path(&self) -> &'static str {
        match self {
            AuthAction::SignIn => "signin",
            AuthAction::SignUp => "signup",
        }
    }
}

impl fmt::Display for AuthAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_path())
    }
}

/// Email/password pair submitted by a login form
#[derive(Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

// Keep passwords out of logs and panics.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Category given to documents the backend leaves unlabelled
pub const DEFAULT_DOCUMENT_CATEGORY: &str = "general";

/// A document in the remote collection.
///
/// Decoding never fails on a missing, `null` or oddly typed optional field:
/// one legacy entry must not empty the whole listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Unique name within the collection
    pub name: String,
    /// Size in bytes (0 when the backend does not report it)
    #[serde(default, deserialize_with = "lenient_size")]
    pub size: u64,
    /// Upload time, if the backend reported a parseable timestamp
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub uploaded_at: Option<DateTime<Utc>>,
    #[serde(default = "default_category", deserialize_with = "lenient_category")]
    pub category: String,
}

fn default_category() -> String {
    DEFAULT_DOCUMENT_CATEGORY.to_string()
}

/// Integer, float or numeric string; negatives and anything else become 0
fn lenient_size<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let positive = |f: f64| (f.is_finite() && f > 0.0).then_some(f as u64);
    let size = match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().and_then(positive)),
        Value::String(s) => s.trim().parse::<f64>().ok().and_then(positive),
        _ => None,
    };
    Ok(size.unwrap_or(0))
}

/// `null`, blank or non-string categories fall back to `general`
fn lenient_category<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) if !s.trim().is_empty() => s,
        _ => default_category(),
    })
}

/// Accepts RFC 3339 or naive ISO-8601 (taken as UTC); anything else is dropped.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(value) => parse_timestamp(&value),
        _ => None,
    })
}

pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .map(|naive| naive.and_utc())
}

/// File selected for upload
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_empty() || self.bytes.is_empty()
    }
}

/// Body of a query submitted to the inference endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    pub user_id: String,
    pub query: String,
}

/// Normalized answer returned by the query gateway
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub response: String,
    pub references: Vec<String>,
    /// Always within `[0, 1]`
    pub confidence: f64,
}

/// Confirmation returned by upload, delete and signup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionMessage {
    pub message: String,
}

impl ActionMessage {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Why a request did not succeed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureReason {
    Timeout,
    NetworkError,
    HttpStatus(u16),
    InvalidCredentials,
    ParseError,
    InvalidRequest,
    Storage,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::Timeout => write!(f, "timeout"),
            FailureReason::NetworkError => write!(f, "network error"),
            FailureReason::HttpStatus(code) => write!(f, "http status {}", code),
            FailureReason::InvalidCredentials => write!(f, "invalid credentials"),
            FailureReason::ParseError => write!(f, "parse error"),
            FailureReason::InvalidRequest => write!(f, "invalid request"),
            FailureReason::Storage => write!(f, "storage error"),
        }
    }
}

/// Typed failure handed back to callers instead of a raw error
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    pub reason: FailureReason,
    /// One-line message suitable for the active view
    pub message: String,
    /// Backend response body for non-2xx responses
    pub detail: Option<String>,
}

impl Failure {
    pub fn new(reason: FailureReason, message: impl Into<String>) -> Self {
        Self {
            reason,
            message: message.into(),
            detail: None,
        }
    }

    /// Replace the message, keeping reason and detail
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// The backend's `detail` hint from a failed response body.
    ///
    /// FastAPI-style backends answer `{"detail": "..."}`; validation errors
    /// carry a list of `{msg}` objects, in which case the first `msg` is taken.
    pub fn backend_detail(&self) -> Option<String> {
        let body: serde_json::Value = serde_json::from_str(self.detail.as_deref()?).ok()?;
        match body.get("detail")? {
            serde_json::Value::String(detail) if !detail.is_empty() => Some(detail.clone()),
            serde_json::Value::Array(items) => items
                .iter()
                .find_map(|item| item.get("msg").and_then(serde_json::Value::as_str))
                .map(str::to_string),
            _ => None,
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.reason)
    }
}

impl std::error::Error for Failure {}

/// Uniform result of every gateway call
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub enum RequestOutcome<T> {
    Ok(T),
    Failed(Failure),
}

impl<T> RequestOutcome<T> {
    pub fn failed(reason: FailureReason, message: impl Into<String>) -> Self {
        RequestOutcome::Failed(Failure::new(reason, message))
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, RequestOutcome::Ok(_))
    }

    pub fn is_failed(&self) -> bool {
        !self.is_ok()
    }

    pub fn ok(self) -> Option<T> {
        match self {
            RequestOutcome::Ok(value) => Some(value),
            RequestOutcome::Failed(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&Failure> {
        match self {
            RequestOutcome::Ok(_) => None,
            RequestOutcome::Failed(failure) => Some(failure),
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> RequestOutcome<U> {
        match self {
            RequestOutcome::Ok(value) => RequestOutcome::Ok(f(value)),
            RequestOutcome::Failed(failure) => RequestOutcome::Failed(failure),
        }
    }

    pub fn map_failure<F: FnOnce(Failure) -> Failure>(self, f: F) -> RequestOutcome<T> {
        match self {
            RequestOutcome::Ok(value) => RequestOutcome::Ok(value),
            RequestOutcome::Failed(failure) => RequestOutcome::Failed(f(failure)),
        }
    }

    pub fn into_result(self) -> Result<T, Failure> {
        self.into()
    }
}

impl<T> From<Result<T, Failure>> for RequestOutcome<T> {
    fn from(result: Result<T, Failure>) -> Self {
        match result {
            Ok(value) => RequestOutcome::Ok(value),
            Err(failure) => RequestOutcome::Failed(failure),
        }
    }
}

impl<T> From<RequestOutcome<T>> for Result<T, Failure> {
    fn from(outcome: RequestOutcome<T>) -> Self {
        match outcome {
            RequestOutcome::Ok(value) => Ok(value),
            RequestOutcome::Failed(failure) => Err(failure),
        }
    }
}
