//! Notification channels for Herald.
//!
//! This crate turns a payload into a delivered notification: provider
//! adapters for each channel, failure classification, bounded retry, and the
//! registry and dispatcher that tie them together.

pub mod classifier;
pub mod dispatch;
pub mod email;
pub mod error;
pub mod notifier;
pub mod payload;
pub mod registry;
pub mod retry;
pub mod sanitize;
pub mod sms;
pub mod traits;
pub mod transport;

#[cfg(test)]
mod testing;

pub use classifier::{ClassifierRules, DecisionReason, RetryDecision, StatusThresholds};
pub use dispatch::{DispatchRequest, Dispatcher};
pub use email::EmailAdapter;
pub use error::{ErrorCode, NotifyError, ProviderError};
pub use notifier::Notifier;
pub use payload::{
    ChatPayload, EmailAttachment, EmailPayload, Payload, PushPayload, Recipients, SmsPayload,
};
pub use registry::{HttpAdapterFactory, NotifierRegistry};
pub use retry::{Backoff, RetryExecutor, RetryPolicy};
pub use sms::SmsAdapter;
pub use traits::{AdapterFactory, ProviderAdapter, ProviderResponse, SendOutcome};
pub use transport::{HttpMailTransport, HttpSmsGateway, MailTransport, SmsGateway};

/// Result type for notification operations.
pub type Result<T> = std::result::Result<T, NotifyError>;
