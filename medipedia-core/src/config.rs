//! Configuration management

use crate::error::{ErrorContext, MedipediaError, MedipediaResult};
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable overriding the backend base URL
pub const API_BASE_URL_ENV: &str = "MEDIPEDIA_API_BASE_URL";

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_SESSION_KEY: &str = "medipedia_user";
pub const DEFAULT_ADMIN_EMAIL: &str = "admin@uol.edu.pk";
pub const DEFAULT_ADMIN_PASSWORD: &str = "admin123";

/// Top-level client configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MedipediaConfig {
    pub api: ApiConfig,
    pub auth: AuthConfig,
    pub session: SessionConfig,
    pub logging: LoggingConfig,
}

/// Backend connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the MediPedia backend
    pub base_url: String,
    /// Per-request timeout in milliseconds
    pub timeout_ms: u64,
    pub user_agent: String,
    pub retry: RetryConfig,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            user_agent: format!("medipedia/{}", env!("CARGO_PKG_VERSION")),
            retry: RetryConfig::default(),
        }
    }
}

/// Retry configuration for outbound requests.
///
/// `max_attempts = 1` means a single attempt with no retry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first one
    pub max_attempts: usize,
    /// Initial delay between retries in milliseconds
    pub initial_delay_ms: u64,
    /// Maximum delay between retries in milliseconds
    pub max_delay_ms: u64,
    /// Backoff multiplier (exponential backoff)
    pub backoff_multiplier: f64,
    /// Whether to add jitter to delays
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            initial_delay_ms: 500,
            max_delay_ms: 5000,
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Single attempt, no retry
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts;
        self
    }
}

/// Which credential authority validates logins
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// Client-side rule set (reserved admin pair, plausible email + password length)
    Mock,
    /// Server-side verification through `/signin` and `/signup`
    Remote,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub mode: AuthMode,
    /// The one address that maps to the admin role
    pub admin_email: String,
    /// Password accepted for the admin address in mock mode
    pub admin_password: String,
    pub min_password_len: usize,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            mode: AuthMode::Mock,
            admin_email: DEFAULT_ADMIN_EMAIL.to_string(),
            admin_password: DEFAULT_ADMIN_PASSWORD.to_string(),
            min_password_len: 6,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Key under which the session is persisted
    pub storage_key: String,
    /// Directory of the file-backed store (defaults to the platform data dir)
    pub storage_dir: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_SESSION_KEY.to_string(),
            storage_dir: None,
        }
    }
}

impl MedipediaConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> MedipediaResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| MedipediaError::Config {
            message: format!("Failed to read config file: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config")
                .with_operation("read_file")
                .with_suggestion("Check if the config file exists and is readable"),
        })?;

        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> MedipediaResult<Self> {
        toml::from_str(content).map_err(|e| MedipediaError::Config {
            message: format!("Failed to parse config: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config")
                .with_operation("parse_toml")
                .with_suggestion("Check TOML syntax in config file"),
        })
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> MedipediaResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| MedipediaError::Config {
            message: format!("Failed to serialize config: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config").with_operation("serialize_toml"),
        })?;

        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        std::fs::write(path, content).map_err(|e| MedipediaError::Config {
            message: format!("Failed to write config file: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("config")
                .with_operation("write_file")
                .with_suggestion("Check if the directory exists and is writable"),
        })?;

        Ok(())
    }

    /// Apply environment overrides on top of file or default values
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides using an arbitrary variable lookup
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(base_url) = lookup(API_BASE_URL_ENV).filter(|v| !v.trim().is_empty()) {
            self.api.base_url = base_url.trim().to_string();
        }
    }

    /// Reject settings the client cannot run with
    pub fn validate(&self) -> MedipediaResult<()> {
        if let Err(message) = validate_absolute_url(&self.api.base_url) {
            return Err(crate::config_error!(
                message,
                "config",
                format!(
                    "Set api.base_url to an absolute http(s) URL or export {}",
                    API_BASE_URL_ENV
                )
            ));
        }

        if self.api.timeout_ms == 0 {
            return Err(crate::config_error!(
                "api.timeout_ms must be greater than 0",
                "config",
                "Set api.timeout_ms to a positive value"
            ));
        }

        if self.api.retry.max_attempts == 0 {
            return Err(crate::config_error!(
                "api.retry.max_attempts must be at least 1",
                "config",
                "Use 1 to disable retries"
            ));
        }

        if !self.auth.admin_email.contains('@') {
            return Err(crate::config_error!(
                "auth.admin_email must be an email address",
                "config"
            ));
        }

        if self.session.storage_key.trim().is_empty() {
            return Err(crate::config_error!(
                "session.storage_key must not be empty",
                "config"
            ));
        }

        Ok(())
    }
}

/// Check that `raw` is an absolute http(s) URL with a host
pub fn validate_absolute_url(raw: &str) -> Result<url::Url, String> {
    let parsed = url::Url::parse(raw).map_err(|e| format!("Invalid URL '{}': {}", raw, e))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(format!("Unsupported URL scheme '{}'", parsed.scheme()));
    }
    if parsed.host_str().is_none() {
        return Err(format!("URL '{}' has no host", raw));
    }

    Ok(parsed)
}
