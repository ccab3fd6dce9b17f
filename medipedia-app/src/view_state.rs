//! Request lifecycle as seen by a view

use medipedia_core::{Failure, RequestOutcome};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of the request a view is waiting on
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestState {
    #[default]
    Idle,
    Loading,
    Succeeded,
    /// One-line message for the active view
    Failed(String),
}

impl RequestState {
    pub fn is_loading(&self) -> bool {
        matches!(self, RequestState::Loading)
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            RequestState::Failed(message) => Some(message),
            _ => None,
        }
    }

    /// Settle from an outcome, showing `failure.message` on failure
    pub fn settle<T>(outcome: &RequestOutcome<T>) -> Self {
        match outcome {
            RequestOutcome::Ok(_) => RequestState::Succeeded,
            RequestOutcome::Failed(failure) => RequestState::Failed(failure.message.clone()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashKind {
    Success,
    Error,
}

/// Transient banner shown after an action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub kind: FlashKind,
    pub text: String,
}

impl Flash {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Success,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Error,
            text: text.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.kind == FlashKind::Error
    }
}

impl From<&Failure> for Flash {
    fn from(failure: &Failure) -> Self {
        Flash::error(failure.message.clone())
    }
}

impl fmt::Display for Flash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}
