//! API clients for the MediPedia backend
//!
//! This crate turns domain-level requests into HTTP calls against the backend
//! REST surface and back into typed [`RequestOutcome`]s:
//!
//! | Method | Path | Gateway |
//! |--------|------|---------|
//! | POST | `/query` | [`HttpQueryGateway`] |
//! | GET | `/documents` | [`HttpDocumentRepository`] |
//! | POST | `/upload` | [`HttpDocumentRepository`] |
//! | DELETE | `/documents/{name}` | [`HttpDocumentRepository`] |
//! | POST | `/signup`, `/signin` | [`HttpAccountGateway`] |
//!
//! [`RequestOutcome`]: medipedia_core::RequestOutcome

use medipedia_core::{MedipediaConfig, MedipediaResult, RetryConfig, DEFAULT_TIMEOUT_MS};
use std::collections::HashMap;
use std::sync::Arc;

pub mod accounts;
pub mod documents;
pub mod http;
pub mod query;

pub use accounts::HttpAccountGateway;
pub use documents::HttpDocumentRepository;
pub use http::{FormPart, HttpClient, HttpRequest, RawResponse, RequestBody};
pub use query::{normalize_query_response, HttpQueryGateway};

/// Configuration for API clients
#[derive(Debug, Clone)]
pub struct ApiClientConfig {
    /// Base URL for the API
    pub base_url: String,
    /// Request timeout in milliseconds
    pub timeout_ms: u64,
    /// User agent string
    pub user_agent: String,
    /// Additional headers sent with every request
    pub headers: HashMap<String, String>,
    /// Retry policy for transport failures
    pub retry: RetryConfig,
}

impl Default for ApiClientConfig {
    fn default() -> Self {
        Self {
            base_url: medipedia_core::DEFAULT_API_BASE_URL.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            user_agent: format!("medipedia/{}", env!("CARGO_PKG_VERSION")),
            headers: HashMap::new(),
            retry: RetryConfig::none(),
        }
    }
}

impl ApiClientConfig {
    /// Create a configuration for a backend at `base_url`
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Build from the application configuration
    pub fn from_config(config: &MedipediaConfig) -> Self {
        Self {
            base_url: config.api.base_url.clone(),
            timeout_ms: config.api.timeout_ms,
            user_agent: config.api.user_agent.clone(),
            headers: HashMap::new(),
            retry: config.api.retry.clone(),
        }
    }

    /// Set additional header
    pub fn with_header(mut self, key: String, value: String) -> Self {
        self.headers.insert(key, value);
        self
    }

    /// Set timeout
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Absolute URL for a backend path
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// All gateways sharing one HTTP client
#[derive(Clone)]
pub struct ApiClients {
    pub documents: Arc<HttpDocumentRepository>,
    pub queries: Arc<HttpQueryGateway>,
    pub accounts: Arc<HttpAccountGateway>,
}

impl ApiClients {
    pub fn new(config: ApiClientConfig) -> MedipediaResult<Self> {
        let http = Arc::new(HttpClient::new(config)?);

        Ok(Self {
            documents: Arc::new(HttpDocumentRepository::new(http.clone())),
            queries: Arc::new(HttpQueryGateway::new(http.clone())),
            accounts: Arc::new(HttpAccountGateway::new(http)),
        })
    }
}
