//! Notification error types.

use herald_core::{ConfigError, NotificationChannel};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while dispatching a notification.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// Payload is malformed. Never retried.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Adapter cannot reach its channel. Never retried by the executor.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Channel-reported send failure, subject to classification.
    #[error("{0}")]
    Provider(ProviderError),

    /// All allowed attempts were consumed.
    #[error("Retry attempts exhausted after {attempts} attempts: {last}")]
    RetryExhausted {
        /// Number of attempts made.
        attempts: u32,
        /// Error from the final attempt.
        last: Box<NotifyError>,
    },

    /// The overall time budget ran out.
    #[error("Operation timed out after {}ms ({attempts} attempts)", .timeout.as_millis())]
    Timeout {
        /// The exceeded budget.
        timeout: Duration,
        /// Attempts started before the budget ran out.
        attempts: u32,
    },

    /// The registry was used before `initialize`.
    #[error("Notifier registry not initialized. Call initialize() first.")]
    NotInitialized,

    /// The channel has no configuration section.
    #[error("{0} configuration not provided")]
    MissingConfiguration(NotificationChannel),

    /// No adapter is implemented for the channel.
    #[error("{0} notifications not yet implemented")]
    UnsupportedChannel(NotificationChannel),

    /// Invalid settings.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl NotifyError {
    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    /// The provider error behind this failure, if any.
    pub fn provider_error(&self) -> Option<&ProviderError> {
        match self {
            Self::Provider(e) => Some(e),
            Self::RetryExhausted { last, .. } => last.provider_error(),
            _ => None,
        }
    }
}

impl From<ProviderError> for NotifyError {
    fn from(e: ProviderError) -> Self {
        Self::Provider(e)
    }
}

impl From<ConfigError> for NotifyError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e.to_string())
    }
}

/// Provider error code: a transport-level string (`ECONNRESET`) or a
/// provider-specific number (`20429`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ErrorCode {
    Numeric(i64),
    Text(String),
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(n) => write!(f, "{}", n),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for ErrorCode {
    fn from(n: i64) -> Self {
        Self::Numeric(n)
    }
}

impl From<&str> for ErrorCode {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for ErrorCode {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

/// A failure reported by an external channel, normalized for classification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ProviderError {
    /// Human-readable message.
    pub message: String,

    /// Provider or transport error code.
    pub code: Option<ErrorCode>,

    /// Status-like code (SMTP reply code or HTTP status).
    pub status: Option<u16>,
}

impl ProviderError {
    /// Create a provider error with only a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
            status: None,
        }
    }

    /// Attach an error code.
    pub fn with_code(mut self, code: impl Into<ErrorCode>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Attach a status-like code.
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }
}
