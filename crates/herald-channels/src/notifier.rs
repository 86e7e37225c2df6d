//! The notifier shell: validation, logging, retry, and outcome building
//! around a single provider adapter.

use crate::error::NotifyError;
use crate::payload::Payload;
use crate::retry::{RetryExecutor, RetryPolicy};
use crate::sanitize::sanitize_payload;
use crate::traits::{ProviderAdapter, SendOutcome};
use crate::Result;
use futures::future::join_all;
use herald_core::NotificationChannel;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Sends payloads through one adapter under one retry policy.
#[derive(Debug)]
pub struct Notifier {
    adapter: Arc<dyn ProviderAdapter>,
    executor: RetryExecutor,
}

impl Notifier {
    pub fn new(adapter: Arc<dyn ProviderAdapter>, policy: RetryPolicy) -> Self {
        Self {
            adapter,
            executor: RetryExecutor::new(policy),
        }
    }

    /// Notifier with the default retry policy.
    pub fn with_defaults(adapter: Arc<dyn ProviderAdapter>) -> Self {
        Self::new(adapter, RetryPolicy::default())
    }

    pub fn provider_name(&self) -> &str {
        self.adapter.name()
    }

    pub fn channel(&self) -> NotificationChannel {
        self.adapter.channel()
    }

    pub fn policy(&self) -> &RetryPolicy {
        self.executor.policy()
    }

    /// Send a payload. Never fails; every failure becomes a failed outcome.
    pub async fn send(&self, payload: &Payload) -> SendOutcome {
        let provider = self.adapter.name().to_string();
        let request_id = Uuid::new_v4();

        if let Err(e) = self.adapter.validate(payload) {
            warn!(%request_id, provider = %provider, error = %e, "Notification rejected");
            return SendOutcome::failed(e.to_string(), Some(provider), 0);
        }

        let sanitized = sanitize_payload(payload);
        info!(
            %request_id,
            provider = %provider,
            payload = %sanitized,
            "Attempting to send notification via {}",
            provider
        );

        let parts = self.adapter.partition(payload);
        let results = join_all(parts.iter().map(|part| self.deliver(part))).await;

        let attempts: u32 = results.iter().map(|(_, n)| *n).sum();
        let mut message_ids = Vec::new();
        let mut errors = Vec::new();
        for (result, _) in results {
            match result {
                Ok(Some(id)) => message_ids.push(id),
                Ok(None) => {}
                Err(e) => errors.push(e.to_string()),
            }
        }

        if errors.is_empty() {
            let message_id = (!message_ids.is_empty()).then(|| message_ids.join(","));
            info!(
                %request_id,
                provider = %provider,
                message_id = message_id.as_deref().unwrap_or(""),
                attempts,
                "Notification sent successfully"
            );
            return SendOutcome::delivered(message_id, provider, attempts);
        }

        let error = if parts.len() == 1 {
            errors.remove(0)
        } else {
            format!(
                "{} of {} deliveries failed: {}",
                errors.len(),
                parts.len(),
                errors.join("; ")
            )
        };

        error!(
            %request_id,
            provider = %provider,
            payload = %sanitized,
            attempts,
            error = %error,
            "Failed to send notification"
        );
        SendOutcome::failed(error, Some(provider), attempts)
    }

    /// Deliver one partition, returning its message id and attempt count.
    async fn deliver(&self, part: &Payload) -> (Result<Option<String>>, u32) {
        let attempts = AtomicU32::new(0);
        let adapter: &dyn ProviderAdapter = self.adapter.as_ref();
        let counter = &attempts;

        let result = self
            .executor
            .execute(
                move |attempt| {
                    counter.store(attempt, Ordering::Relaxed);
                    adapter.attempt_send(part)
                },
                |error| match error {
                    NotifyError::Provider(e) => adapter.should_retry(e),
                    _ => false,
                },
            )
            .await;

        let result = result.map(|response| adapter.extract_message_id(&response));
        (result, attempts.load(Ordering::Relaxed))
    }

    /// Release the adapter's transport.
    pub async fn close(&self) -> Result<()> {
        self.adapter.close().await
    }
}
