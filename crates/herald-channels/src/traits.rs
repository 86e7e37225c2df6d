//! Core adapter traits and the uniform send outcome.

use crate::error::{NotifyError, ProviderError};
use crate::payload::Payload;
use crate::Result;
use async_trait::async_trait;
use herald_core::{Config, NotificationChannel};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt::Debug;
use std::sync::Arc;

/// Raw JSON object returned by one provider attempt.
pub type ProviderResponse = Map<String, Value>;

/// Response keys searched for a message id, in order.
const MESSAGE_ID_KEYS: &[&str] = &["messageId", "sid", "id"];

/// A delivery provider for one channel.
///
/// Adapters perform exactly one external call per `attempt_send`; retrying,
/// logging, and outcome building belong to [`Notifier`](crate::Notifier).
#[async_trait]
pub trait ProviderAdapter: Send + Sync + Debug {
    /// Provider name reported in outcomes.
    fn name(&self) -> &str;

    /// The channel this adapter delivers on.
    fn channel(&self) -> NotificationChannel;

    /// Check a payload before any network activity.
    fn validate(&self, payload: &Payload) -> Result<()>;

    /// Split a payload into independently retried units of delivery.
    fn partition(&self, payload: &Payload) -> Vec<Payload> {
        vec![payload.clone()]
    }

    /// Perform one send attempt.
    async fn attempt_send(&self, payload: &Payload) -> Result<ProviderResponse>;

    /// Whether a provider failure is worth another attempt.
    fn should_retry(&self, error: &ProviderError) -> bool;

    /// Pull the provider's message id out of a response.
    fn extract_message_id(&self, response: &ProviderResponse) -> Option<String> {
        extract_message_id(response)
    }

    /// Release any held transport.
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Builds adapters from configuration.
#[async_trait]
pub trait AdapterFactory: Send + Sync {
    /// Create the adapter for a channel.
    async fn create(
        &self,
        channel: NotificationChannel,
        config: &Config,
    ) -> Result<Arc<dyn ProviderAdapter>>;
}

/// First non-empty id under `messageId`, `sid`, or `id`.
pub fn extract_message_id(response: &ProviderResponse) -> Option<String> {
    MESSAGE_ID_KEYS
        .iter()
        .find_map(|key| match response.get(*key) {
            Some(Value::String(id)) if !id.is_empty() => Some(id.clone()),
            Some(Value::Number(id)) => Some(id.to_string()),
            _ => None,
        })
}

/// Serialize a transport receipt into a [`ProviderResponse`].
pub fn to_response<T: Serialize>(receipt: &T) -> Result<ProviderResponse> {
    match serde_json::to_value(receipt) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(NotifyError::Internal(format!(
            "provider response is not an object: {}",
            other
        ))),
        Err(e) => Err(NotifyError::Internal(format!(
            "failed to encode provider response: {}",
            e
        ))),
    }
}

/// Uniform result of one send request.
///
/// Only built through [`SendOutcome::delivered`] and [`SendOutcome::failed`],
/// so a successful outcome never carries an error and a failed one always does.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendOutcome {
    success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    message_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    provider: Option<String>,

    attempts: u32,

    timestamp: chrono::DateTime<chrono::Utc>,
}

impl SendOutcome {
    /// A successful delivery.
    pub fn delivered(
        message_id: Option<String>,
        provider: impl Into<String>,
        attempts: u32,
    ) -> Self {
        Self {
            success: true,
            message_id,
            error: None,
            provider: Some(provider.into()),
            attempts,
            timestamp: chrono::Utc::now(),
        }
    }

    /// A failed delivery. `provider` is `None` when no adapter was resolved.
    pub fn failed(error: impl Into<String>, provider: Option<String>, attempts: u32) -> Self {
        Self {
            success: false,
            message_id: None,
            error: Some(error.into()),
            provider,
            attempts,
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn message_id(&self) -> Option<&str> {
        self.message_id.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn provider(&self) -> Option<&str> {
        self.provider.as_deref()
    }

    /// Provider calls made across all partitions.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// When the outcome was recorded.
    pub fn timestamp(&self) -> chrono::DateTime<chrono::Utc> {
        self.timestamp
    }
}
