//! Failure classification: decides whether a failed send is worth another attempt.
//!
//! Rules are evaluated in a fixed order and the first match wins:
//! network codes, provider codes, status ranges, retryable message patterns,
//! permanent message patterns. Anything left over is not retried.

use crate::error::{ErrorCode, ProviderError};
use aho_corasick::AhoCorasick;
use herald_core::config::{ClassifierConfig, StatusRanges};
use once_cell::sync::Lazy;
use std::fmt;
use std::ops::Range;
use tracing::{error, warn};

/// Transport-level error codes that always indicate a transient failure.
pub const NETWORK_ERROR_CODES: &[&str] = &[
    "ETIMEDOUT",
    "ECONNRESET",
    "ENOTFOUND",
    "ESOCKET",
    "ECONNREFUSED",
    "EPIPE",
    "EAI_AGAIN",
];

/// Message fragments that mark a failure as transient.
pub const RETRYABLE_PATTERNS: &[&str] = &[
    "timeout",
    "rate limit",
    "too many",
    "temporarily unavailable",
    "try again",
    "busy",
];

/// Message fragments that mark a failure as permanent.
pub const PERMANENT_PATTERNS: &[&str] = &[
    "auth",
    "credentials",
    "invalid recipient",
    "does not exist",
    "rejected",
];

/// Twilio error codes worth retrying (rate limiting, gateway and carrier
/// hiccups).
pub const SMS_RETRYABLE_CODES: &[i64] = &[20429, 20500, 20503, 30001, 30003, 30005];

static RETRYABLE_MATCHER: Lazy<AhoCorasick> = Lazy::new(|| build_matcher(RETRYABLE_PATTERNS));
static PERMANENT_MATCHER: Lazy<AhoCorasick> = Lazy::new(|| build_matcher(PERMANENT_PATTERNS));

fn build_matcher(patterns: &[&str]) -> AhoCorasick {
    AhoCorasick::builder()
        .ascii_case_insensitive(true)
        .build(patterns)
        .expect("Failed to build Aho-Corasick automaton")
}

fn find_pattern(
    matcher: &AhoCorasick,
    patterns: &[&'static str],
    text: &str,
) -> Option<&'static str> {
    matcher
        .find(text)
        .map(|m| patterns[m.pattern().as_usize()])
}

/// Why a decision was reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecisionReason {
    /// Transport-level network code.
    NetworkCode(String),
    /// Provider-specific numeric code from the channel's retryable set.
    ProviderCode(i64),
    /// Status inside the retryable range.
    TemporaryStatus(u16),
    /// Status inside the permanent range.
    PermanentStatus(u16),
    /// Message matched a retryable pattern.
    RetryablePattern(&'static str),
    /// Message matched a permanent pattern.
    PermanentPattern(&'static str),
    /// No rule matched.
    Unknown,
}

impl fmt::Display for DecisionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NetworkCode(code) => write!(f, "network error {}", code),
            Self::ProviderCode(code) => write!(f, "retryable provider code {}", code),
            Self::TemporaryStatus(status) => write!(f, "temporary status {}", status),
            Self::PermanentStatus(status) => write!(f, "permanent status {}", status),
            Self::RetryablePattern(p) => write!(f, "retryable pattern '{}'", p),
            Self::PermanentPattern(p) => write!(f, "permanent pattern '{}'", p),
            Self::Unknown => f.write_str("unknown error"),
        }
    }
}

/// Outcome of classifying one failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryDecision {
    /// Whether another attempt should be made.
    pub retry: bool,
    /// The rule that produced the decision.
    pub reason: DecisionReason,
}

impl RetryDecision {
    fn retry(reason: DecisionReason) -> Self {
        Self { retry: true, reason }
    }

    fn stop(reason: DecisionReason) -> Self {
        Self {
            retry: false,
            reason,
        }
    }
}

/// Half-open status ranges for retryable and permanent failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusThresholds {
    /// Statuses treated as temporary.
    pub retry: Range<u16>,
    /// Statuses treated as permanent.
    pub permanent: Range<u16>,
}

impl Default for StatusThresholds {
    fn default() -> Self {
        Self {
            retry: 400..500,
            permanent: 500..600,
        }
    }
}

impl From<&StatusRanges> for StatusThresholds {
    fn from(ranges: &StatusRanges) -> Self {
        Self {
            retry: ranges.retry[0]..ranges.retry[1],
            permanent: ranges.permanent[0]..ranges.permanent[1],
        }
    }
}

/// One channel's classification rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifierRules {
    provider_codes: Vec<i64>,
    status: Option<StatusThresholds>,
}

impl ClassifierRules {
    /// Rules with only the shared network codes and message patterns.
    pub fn new() -> Self {
        Self {
            provider_codes: Vec::new(),
            status: None,
        }
    }

    /// Email rules: SMTP-style reply codes, 4xx transient and 5xx permanent.
    pub fn email() -> Self {
        Self::new().with_status(StatusThresholds::default())
    }

    /// SMS rules: Twilio retryable codes, no status rule.
    pub fn sms() -> Self {
        Self::new().with_provider_codes(SMS_RETRYABLE_CODES.to_vec())
    }

    pub fn with_provider_codes(mut self, codes: Vec<i64>) -> Self {
        self.provider_codes = codes;
        self
    }

    pub fn with_status(mut self, thresholds: StatusThresholds) -> Self {
        self.status = Some(thresholds);
        self
    }

    /// Apply the overrides from a channel's `classifier` config section.
    pub fn with_overrides(mut self, config: &ClassifierConfig) -> Self {
        if let Some(ranges) = &config.status {
            self.status = Some(StatusThresholds::from(ranges));
        }
        if let Some(codes) = &config.provider_codes {
            self.provider_codes = codes.clone();
        }
        self
    }

    pub fn provider_codes(&self) -> &[i64] {
        &self.provider_codes
    }

    pub fn status(&self) -> Option<&StatusThresholds> {
        self.status.as_ref()
    }

    /// Evaluate the rules against an error. Pure; does not log.
    pub fn classify(&self, err: &ProviderError) -> RetryDecision {
        match &err.code {
            Some(ErrorCode::Text(code)) if NETWORK_ERROR_CODES.contains(&code.as_str()) => {
                return RetryDecision::retry(DecisionReason::NetworkCode(code.clone()));
            }
            Some(ErrorCode::Numeric(code)) if self.provider_codes.contains(code) => {
                return RetryDecision::retry(DecisionReason::ProviderCode(*code));
            }
            _ => {}
        }

        if let (Some(thresholds), Some(status)) = (&self.status, err.status) {
            if thresholds.retry.contains(&status) {
                return RetryDecision::retry(DecisionReason::TemporaryStatus(status));
            }
            if thresholds.permanent.contains(&status) {
                return RetryDecision::stop(DecisionReason::PermanentStatus(status));
            }
        }

        if let Some(pattern) = find_pattern(&RETRYABLE_MATCHER, RETRYABLE_PATTERNS, &err.message) {
            return RetryDecision::retry(DecisionReason::RetryablePattern(pattern));
        }

        if let Some(pattern) = find_pattern(&PERMANENT_MATCHER, PERMANENT_PATTERNS, &err.message) {
            return RetryDecision::stop(DecisionReason::PermanentPattern(pattern));
        }

        RetryDecision::stop(DecisionReason::Unknown)
    }

    /// Classify and log the decision.
    pub fn should_retry(&self, err: &ProviderError) -> bool {
        let decision = self.classify(err);
        match &decision.reason {
            DecisionReason::PermanentStatus(_) | DecisionReason::PermanentPattern(_) => {
                error!(
                    reason = %decision.reason,
                    error = %err.message,
                    "Permanent failure detected, not retrying"
                );
            }
            DecisionReason::Unknown => {
                warn!(error = %err.message, "Unknown error, not retrying");
            }
            reason => {
                warn!(reason = %reason, error = %err.message, "Transient failure, will retry");
            }
        }
        decision.retry
    }
}

impl Default for ClassifierRules {
    fn default() -> Self {
        Self::new()
    }
}
