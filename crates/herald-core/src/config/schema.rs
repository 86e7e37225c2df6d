//! Configuration schema definitions.

use crate::secret::SecretString;
use crate::types::NotificationChannel;
use serde::{Deserialize, Serialize};

/// Main Herald configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Retry options applied to every channel without its own `retry` section.
    #[serde(default)]
    pub retry: RetryOptions,

    /// Per-channel connection settings.
    #[serde(default)]
    pub channels: ChannelsConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Retry options for a channel: its own section if present, else the
    /// global one.
    pub fn retry_for(&self, channel: NotificationChannel) -> &RetryOptions {
        let own = match channel {
            NotificationChannel::Email => self.channels.email.as_ref().and_then(|c| c.retry.as_ref()),
            NotificationChannel::Sms => self.channels.sms.as_ref().and_then(|c| c.retry.as_ref()),
            NotificationChannel::Push | NotificationChannel::Chat => None,
        };
        own.unwrap_or(&self.retry)
    }
}

/// Recognized retry options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryOptions {
    /// Total number of attempts, the first try included.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base delay between attempts, in milliseconds.
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,

    /// Overall time budget for one send, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Shape of the delay between attempts.
    #[serde(default)]
    pub backoff: BackoffStrategy,

    /// Growth factor for exponential backoff.
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,

    /// Upper bound on a single delay for exponential and jittered backoff.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

fn default_max_retries() -> u32 {
    3
}

fn default_delay_ms() -> u64 {
    1000
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_multiplier() -> f64 {
    2.0
}

fn default_max_delay_ms() -> u64 {
    10_000
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            delay_ms: default_delay_ms(),
            timeout_ms: default_timeout_ms(),
            backoff: BackoffStrategy::default(),
            multiplier: default_multiplier(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

/// Delay shape between attempts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffStrategy {
    #[default]
    Constant,
    Exponential,
    Jittered,
}

/// Channels configuration section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChannelsConfig {
    /// Email (mail relay) configuration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<EmailConfig>,

    /// SMS gateway configuration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sms: Option<SmsConfig>,
}

/// Email channel configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    /// Named relay service, informational.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,

    /// Relay host.
    pub host: String,

    /// Relay port.
    #[serde(default = "default_email_port")]
    pub port: u16,

    /// Use TLS.
    #[serde(default = "default_true")]
    pub secure: bool,

    /// Relay username.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Relay password.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<SecretString>,

    /// Per-request timeout for a single relay call, in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Channel-specific retry options.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry: Option<RetryOptions>,

    /// Failure classification overrides.
    #[serde(default)]
    pub classifier: ClassifierConfig,
}

fn default_email_port() -> u16 {
    587
}

fn default_true() -> bool {
    true
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

impl EmailConfig {
    /// Base URL of the relay API.
    pub fn base_url(&self) -> String {
        let scheme = if self.secure { "https" } else { "http" };
        format!("{}://{}:{}", scheme, self.host, self.port)
    }
}

/// SMS channel configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmsConfig {
    /// Gateway account identifier.
    pub account_sid: String,

    /// Gateway auth token.
    pub auth_token: SecretString,

    /// Default sender number (E.164).
    pub from_number: String,

    /// Gateway REST API base URL.
    #[serde(default = "default_sms_api_base")]
    pub api_base: String,

    /// Per-request timeout for a single gateway call, in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Channel-specific retry options.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry: Option<RetryOptions>,

    /// Failure classification overrides.
    #[serde(default)]
    pub classifier: ClassifierConfig,
}

fn default_sms_api_base() -> String {
    "https://api.twilio.com/2010-04-01".to_string()
}

/// Overrides for a channel's failure classification rules.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Status ranges for the status-code rule. Replaces the channel default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<StatusRanges>,

    /// Provider error codes treated as transient. Replaces the channel default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_codes: Option<Vec<i64>>,
}

/// Half-open `[start, end)` status ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRanges {
    /// Statuses treated as temporary.
    pub retry: [u16; 2],

    /// Statuses treated as permanent.
    pub permanent: [u16; 2],
}

/// Logging configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level.
    #[serde(default)]
    pub level: LogLevel,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

/// Log level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Directive string for an `EnvFilter`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}
