//! Internal error taxonomy
//!
//! Gateways and stores work with [`MedipediaError`] and convert to the
//! user-facing [`Failure`] at the edge.

use crate::types::{Failure, FailureReason};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, warn};

pub type MedipediaResult<T> = Result<T, MedipediaError>;

/// Where and when an error happened, and what the user might try next
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorContext {
    /// Correlates a logged error with the failure shown to the user
    pub error_id: String,
    pub timestamp: DateTime<Utc>,
    /// e.g. `http_client`, `session_store`
    pub component: String,
    pub operation: Option<String>,
    pub metadata: std::collections::HashMap<String, String>,
    pub recovery_suggestions: Vec<String>,
}

impl ErrorContext {
    pub fn new(component: &str) -> Self {
        Self {
            error_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            component: component.to_string(),
            operation: None,
            metadata: std::collections::HashMap::new(),
            recovery_suggestions: Vec::new(),
        }
    }

    pub fn with_operation(mut self, operation: &str) -> Self {
        self.operation = Some(operation.to_string());
        self
    }

    pub fn with_metadata(mut self, key: &str, value: &str) -> Self {
        self.metadata.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_suggestion(mut self, suggestion: &str) -> Self {
        self.recovery_suggestions.push(suggestion.to_string());
        self
    }
}

/// Every internal failure of the client layer
#[derive(Error, Debug)]
pub enum MedipediaError {
    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: ErrorContext,
    },

    #[error("Operation timeout: {operation} after {duration_ms}ms")]
    Timeout {
        operation: String,
        duration_ms: u64,
        context: ErrorContext,
    },

    #[error("HTTP error! status: {status}")]
    HttpStatus {
        status: u16,
        url: String,
        body: String,
        context: ErrorContext,
    },

    #[error("Invalid credentials: {message}")]
    InvalidCredentials {
        message: String,
        context: ErrorContext,
    },

    #[error("Parse error: {message}")]
    Parse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: ErrorContext,
    },

    #[error("Invalid request: {message}")]
    InvalidRequest {
        message: String,
        field: Option<String>,
        context: ErrorContext,
    },

    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: ErrorContext,
    },

    #[error("Storage error: {message}")]
    Storage {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: ErrorContext,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl MedipediaError {
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            MedipediaError::Network { context, .. } => Some(context),
            MedipediaError::Timeout { context, .. } => Some(context),
            MedipediaError::HttpStatus { context, .. } => Some(context),
            MedipediaError::InvalidCredentials { context, .. } => Some(context),
            MedipediaError::Parse { context, .. } => Some(context),
            MedipediaError::InvalidRequest { context, .. } => Some(context),
            MedipediaError::Config { context, .. } => Some(context),
            MedipediaError::Storage { context, .. } => Some(context),
            _ => None,
        }
    }

    /// Check if error is recoverable by retrying the same request
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            MedipediaError::Network { .. } | MedipediaError::Timeout { .. }
        )
    }

    /// Classify the error into the user-facing failure taxonomy
    pub fn failure_reason(&self) -> FailureReason {
        match self {
            MedipediaError::Network { .. } => FailureReason::NetworkError,
            MedipediaError::Timeout { .. } => FailureReason::Timeout,
            MedipediaError::HttpStatus { status, .. } => FailureReason::HttpStatus(*status),
            MedipediaError::InvalidCredentials { .. } => FailureReason::InvalidCredentials,
            MedipediaError::Parse { .. } | MedipediaError::Serialization(_) => {
                FailureReason::ParseError
            }
            MedipediaError::InvalidRequest { .. } | MedipediaError::Config { .. } => {
                FailureReason::InvalidRequest
            }
            MedipediaError::Storage { .. } | MedipediaError::Io(_) => FailureReason::Storage,
        }
    }

    /// Convert into a [`Failure`] carrying a fixed user-facing message.
    ///
    /// The raw error text never reaches the message; for HTTP status errors the
    /// response body is kept in `detail` so callers can surface backend hints.
    pub fn into_failure(self, message: impl Into<String>) -> Failure {
        let reason = self.failure_reason();
        let detail = match self {
            MedipediaError::HttpStatus { body, .. } if !body.is_empty() => Some(body),
            _ => None,
        };

        Failure {
            reason,
            message: message.into(),
            detail,
        }
    }

    /// Log the error with appropriate level
    pub fn log(&self) {
        match self {
            MedipediaError::Config { .. } | MedipediaError::InvalidRequest { .. } => {
                error!(
                    error_id = ?self.context().map(|c| &c.error_id),
                    error = %self,
                    "Configuration or validation error"
                );
            }
            MedipediaError::Network { .. }
            | MedipediaError::Timeout { .. }
            | MedipediaError::HttpStatus { .. } => {
                warn!(
                    error_id = ?self.context().map(|c| &c.error_id),
                    error = %self,
                    "Request failed (may be recoverable)"
                );
            }
            MedipediaError::InvalidCredentials { .. } => {
                warn!(
                    error_id = ?self.context().map(|c| &c.error_id),
                    "Authentication rejected"
                );
            }
            _ => {
                error!(
                    error_id = ?self.context().map(|c| &c.error_id),
                    error = %self,
                    "Error occurred"
                );
            }
        }
    }
}

/// Convenience macros for creating errors with context
#[macro_export]
macro_rules! config_error {
    ($msg:expr, $component:expr) => {
        $crate::MedipediaError::Config {
            message: ($msg).to_string(),
            source: None,
            context: $crate::ErrorContext::new($component)
                .with_suggestion("Check your configuration file")
                .with_suggestion("Run 'medipedia config --init' to create default config"),
        }
    };
    ($msg:expr, $component:expr, $suggestion:expr) => {
        $crate::MedipediaError::Config {
            message: ($msg).to_string(),
            source: None,
            context: $crate::ErrorContext::new($component)
                .with_suggestion(&($suggestion).to_string())
                .with_suggestion("Check your configuration file"),
        }
    };
}

#[macro_export]
macro_rules! validation_error {
    ($msg:expr, $field:expr, $component:expr) => {
        $crate::MedipediaError::InvalidRequest {
            message: $msg.to_string(),
            field: Some($field.to_string()),
            context: $crate::ErrorContext::new($component)
                .with_suggestion("Check the field value and format"),
        }
    };
}

#[macro_export]
macro_rules! storage_error {
    ($msg:expr, $component:expr) => {
        $crate::MedipediaError::Storage {
            message: $msg.to_string(),
            source: None,
            context: $crate::ErrorContext::new($component),
        }
    };
    ($msg:expr, $component:expr, $source:expr) => {
        $crate::MedipediaError::Storage {
            message: $msg.to_string(),
            source: Some(Box::new($source)),
            context: $crate::ErrorContext::new($component),
        }
    };
}
