//! Email adapter.

use crate::classifier::ClassifierRules;
use crate::error::{NotifyError, ProviderError};
use crate::payload::{EmailPayload, Payload};
use crate::traits::{to_response, ProviderAdapter, ProviderResponse};
use crate::transport::{MailTransport, OutgoingMail};
use crate::Result;
use async_trait::async_trait;
use herald_core::NotificationChannel;
use std::fmt;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, error, info, warn};

/// Verification calls made before giving up on the transport.
const VERIFY_ATTEMPTS: u32 = 2;

/// Delivers email through a [`MailTransport`].
///
/// The transport is verified lazily on the first send and the result is
/// cached for the adapter's lifetime.
pub struct EmailAdapter {
    name: String,
    transport: Arc<dyn MailTransport>,
    rules: ClassifierRules,
    verified: OnceCell<()>,
}

impl EmailAdapter {
    pub fn new(transport: Arc<dyn MailTransport>) -> Self {
        Self {
            name: "email".to_string(),
            transport,
            rules: ClassifierRules::email(),
            verified: OnceCell::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_rules(mut self, rules: ClassifierRules) -> Self {
        self.rules = rules;
        self
    }

    pub fn is_verified(&self) -> bool {
        self.verified.initialized()
    }

    async fn ensure_verified(&self) -> Result<()> {
        self.verified
            .get_or_try_init(|| async {
                let mut last_error = None;
                for attempt in 1..=VERIFY_ATTEMPTS {
                    match self.transport.verify().await {
                        Ok(()) => {
                            info!(provider = %self.name, "Email transport verified");
                            return Ok(());
                        }
                        Err(e) => {
                            warn!(attempt, error = %e, "Email transport verification failed");
                            last_error = Some(e);
                        }
                    }
                }

                let reason = last_error
                    .map(|e| e.message)
                    .unwrap_or_else(|| "verification failed".to_string());
                error!(provider = %self.name, error = %reason, "Email notifier connection failed");
                Err(NotifyError::connection(format!(
                    "Failed to connect to email service: {}",
                    reason
                )))
            })
            .await
            .map(|_| ())
    }
}

impl fmt::Debug for EmailAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmailAdapter")
            .field("name", &self.name)
            .field("rules", &self.rules)
            .field("verified", &self.is_verified())
            .finish_non_exhaustive()
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |s| s.trim().is_empty())
}

/// Check an email payload's required fields.
pub fn validate_email(payload: &EmailPayload) -> Result<()> {
    if payload.to.is_empty() {
        return Err(NotifyError::validation("Email recipient is required"));
    }
    if payload.to.as_slice().iter().any(|r| r.trim().is_empty()) {
        return Err(NotifyError::validation("Email recipient must not be blank"));
    }
    if payload.subject.trim().is_empty() {
        return Err(NotifyError::validation("Email subject is required"));
    }
    if is_blank(&payload.html_body) && is_blank(&payload.text_body) {
        return Err(NotifyError::validation(
            "Email must have either html or text content",
        ));
    }
    Ok(())
}

fn mismatch(payload: &Payload) -> NotifyError {
    NotifyError::validation(format!(
        "Email adapter cannot send {} payloads",
        payload.channel()
    ))
}

#[async_trait]
impl ProviderAdapter for EmailAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn channel(&self) -> NotificationChannel {
        NotificationChannel::Email
    }

    fn validate(&self, payload: &Payload) -> Result<()> {
        match payload {
            Payload::Email(email) => validate_email(email),
            other => Err(mismatch(other)),
        }
    }

    async fn attempt_send(&self, payload: &Payload) -> Result<ProviderResponse> {
        let Payload::Email(email) = payload else {
            return Err(mismatch(payload));
        };

        self.ensure_verified().await?;

        let receipt = self
            .transport
            .send_mail(&OutgoingMail::from(email))
            .await
            .map_err(NotifyError::Provider)?;

        debug!(
            message_id = %receipt.message_id,
            accepted = receipt.accepted.len(),
            rejected = receipt.rejected.len(),
            "Mail accepted by transport"
        );
        to_response(&receipt)
    }

    fn should_retry(&self, error: &ProviderError) -> bool {
        self.rules.should_retry(error)
    }

    async fn close(&self) -> Result<()> {
        self.transport.close().await;
        info!(provider = %self.name, "Email notifier connection closed");
        Ok(())
    }
}
