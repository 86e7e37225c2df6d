//! SMS adapter.

use crate::classifier::ClassifierRules;
use crate::error::{NotifyError, ProviderError};
use crate::payload::{Payload, Recipients, SmsPayload};
use crate::traits::{to_response, ProviderAdapter, ProviderResponse};
use crate::transport::{SmsGateway, SmsMessage};
use crate::Result;
use async_trait::async_trait;
use herald_core::NotificationChannel;
pub use herald_core::phone::is_e164;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Longest message accepted, in characters.
pub const MAX_SMS_LENGTH: usize = 1600;

/// Delivers SMS through an [`SmsGateway`], one gateway call per recipient.
pub struct SmsAdapter {
    name: String,
    gateway: Arc<dyn SmsGateway>,
    from_number: String,
    rules: ClassifierRules,
}

impl SmsAdapter {
    /// `from_number` is used when a payload names no sender.
    pub fn new(gateway: Arc<dyn SmsGateway>, from_number: impl Into<String>) -> Self {
        Self {
            name: "sms".to_string(),
            gateway,
            from_number: from_number.into(),
            rules: ClassifierRules::sms(),
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
}

impl fmt::Debug for SmsAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmsAdapter")
            .field("name", &self.name)
            .field("from_number", &self.from_number)
            .field("rules", &self.rules)
            .finish_non_exhaustive()
    }
}

/// Check an SMS payload's recipients and message.
pub fn validate_sms(payload: &SmsPayload) -> Result<()> {
    if payload.to.is_empty() {
        return Err(NotifyError::validation("SMS recipient is required"));
    }
    if payload.message.is_empty() {
        return Err(NotifyError::validation("SMS message is required"));
    }
    if payload.message.chars().count() > MAX_SMS_LENGTH {
        return Err(NotifyError::validation(format!(
            "SMS message exceeds maximum length of {} characters",
            MAX_SMS_LENGTH
        )));
    }
    if let Some(bad) = payload.to.as_slice().iter().find(|n| !is_e164(n)) {
        return Err(NotifyError::validation(format!(
            "Invalid phone number format: {}. Must be in E.164 format (e.g., +1234567890)",
            bad
        )));
    }
    Ok(())
}

fn mismatch(payload: &Payload) -> NotifyError {
    NotifyError::validation(format!(
        "SMS adapter cannot send {} payloads",
        payload.channel()
    ))
}

#[async_trait]
impl ProviderAdapter for SmsAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn channel(&self) -> NotificationChannel {
        NotificationChannel::Sms
    }

    fn validate(&self, payload: &Payload) -> Result<()> {
        match payload {
            Payload::Sms(sms) => validate_sms(sms),
            other => Err(mismatch(other)),
        }
    }

    fn partition(&self, payload: &Payload) -> Vec<Payload> {
        match payload {
            Payload::Sms(sms) if sms.to.len() > 1 => sms
                .to
                .as_slice()
                .iter()
                .map(|recipient| {
                    Payload::Sms(SmsPayload {
                        to: Recipients::One(recipient.clone()),
                        ..sms.clone()
                    })
                })
                .collect(),
            _ => vec![payload.clone()],
        }
    }

    async fn attempt_send(&self, payload: &Payload) -> Result<ProviderResponse> {
        let Payload::Sms(sms) = payload else {
            return Err(mismatch(payload));
        };

        let to = match sms.to.as_slice() {
            [one] => one.clone(),
            [] => return Err(NotifyError::validation("SMS recipient is required")),
            _ => {
                return Err(NotifyError::validation(
                    "SMS attempt expects a single recipient",
                ))
            }
        };

        let message = SmsMessage {
            from: sms.from.clone().unwrap_or_else(|| self.from_number.clone()),
            to,
            body: sms.message.clone(),
            options: sms.extra.clone(),
        };

        let receipt = self
            .gateway
            .send_message(&message)
            .await
            .map_err(NotifyError::Provider)?;

        debug!(sid = %receipt.sid, status = %receipt.status, "SMS accepted by gateway");
        to_response(&receipt)
    }

    fn should_retry(&self, error: &ProviderError) -> bool {
        self.rules.should_retry(error)
    }
}
