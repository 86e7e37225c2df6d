//! Dispatcher: the entry point for sending notifications.

use crate::notifier::Notifier;
use crate::payload::{EmailPayload, Payload, SmsPayload};
use crate::registry::NotifierRegistry;
use crate::traits::SendOutcome;
use futures::future::join_all;
use herald_core::NotificationChannel;
use std::sync::Arc;
use tracing::{error, info, warn};

/// One channel/payload pair.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchRequest {
    /// Channel to resolve the notifier for.
    pub channel: NotificationChannel,
    /// Payload handed to that notifier.
    pub payload: Payload,
}

impl DispatchRequest {
    pub fn new(channel: NotificationChannel, payload: impl Into<Payload>) -> Self {
        Self {
            channel,
            payload: payload.into(),
        }
    }

    /// Request for the payload's own channel.
    pub fn for_payload(payload: impl Into<Payload>) -> Self {
        let payload = payload.into();
        Self {
            channel: payload.channel(),
            payload,
        }
    }
}

/// Sends notifications through the registry's notifiers.
///
/// No method fails; every problem is reported as a failed [`SendOutcome`].
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<NotifierRegistry>,
}

impl Dispatcher {
    pub fn new(registry: Arc<NotifierRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<NotifierRegistry> {
        &self.registry
    }

    async fn notifier(&self, channel: NotificationChannel) -> Result<Arc<Notifier>, SendOutcome> {
        self.registry.resolve(channel).await.map_err(|e| {
            error!("Failed to send {} notification: {}", channel, e);
            SendOutcome::failed(e.to_string(), None, 0)
        })
    }

    /// Send one payload on one channel.
    pub async fn send(&self, channel: NotificationChannel, payload: &Payload) -> SendOutcome {
        match self.notifier(channel).await {
            Ok(notifier) => notifier.send(payload).await,
            Err(outcome) => outcome,
        }
    }

    pub async fn send_email(&self, payload: EmailPayload) -> SendOutcome {
        self.send(NotificationChannel::Email, &Payload::Email(payload))
            .await
    }

    pub async fn send_sms(&self, payload: SmsPayload) -> SendOutcome {
        self.send(NotificationChannel::Sms, &Payload::Sms(payload)).await
    }

    /// Send every request concurrently. Outcomes are in request order and
    /// one request's failure does not affect the others.
    pub async fn send_fan_out(&self, requests: &[DispatchRequest]) -> Vec<SendOutcome> {
        let outcomes = join_all(
            requests
                .iter()
                .map(|request| self.send(request.channel, &request.payload)),
        )
        .await;

        let delivered = outcomes.iter().filter(|o| o.is_success()).count();
        info!(
            "Fan-out complete: {} of {} notifications delivered",
            delivered,
            outcomes.len()
        );
        outcomes
    }

    /// Send on the primary channel; if that fails after its full retry
    /// budget, send on the fallback channel.
    pub async fn send_with_fallback(
        &self,
        primary: &DispatchRequest,
        fallback: &DispatchRequest,
    ) -> SendOutcome {
        let outcome = self.send(primary.channel, &primary.payload).await;
        if outcome.is_success() {
            return outcome;
        }

        warn!(
            "Primary channel {} failed ({}), trying fallback channel {}",
            primary.channel,
            outcome.error().unwrap_or("unknown error"),
            fallback.channel
        );
        self.send(fallback.channel, &fallback.payload).await
    }
}
