//! Shared fakes for the integration tests.
//!
//! The fakes sit at the transport seam, so everything above them (adapters,
//! classifier, retry, notifier, registry, dispatcher) runs for real.

use async_trait::async_trait;
use herald_channels::error::ProviderError;
use herald_channels::transport::{
    MailReceipt, MailTransport, OutgoingMail, SmsGateway, SmsMessage, SmsReceipt, TransportResult,
};
use herald_channels::{AdapterFactory, EmailAdapter, NotifyError, ProviderAdapter, SmsAdapter};
use herald_core::{Config, NotificationChannel};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

/// Default sender used by [`FakeFactory`]'s SMS adapter.
pub const SMS_SENDER: &str = "+15550000000";

/// Mail transport that records messages and fails from a script.
#[derive(Default)]
pub struct RecordingMailTransport {
    verifications: AtomicU32,
    failures: Mutex<VecDeque<ProviderError>>,
    sent: Mutex<Vec<OutgoingMail>>,
    closed: AtomicBool,
}

impl RecordingMailTransport {
    /// Queue failures returned by the next sends, in order.
    pub fn fail_next(&self, errors: impl IntoIterator<Item = ProviderError>) {
        self.failures.lock().unwrap().extend(errors);
    }

    pub fn verifications(&self) -> u32 {
        self.verifications.load(Ordering::SeqCst)
    }

    pub fn sent(&self) -> Vec<OutgoingMail> {
        self.sent.lock().unwrap().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MailTransport for RecordingMailTransport {
    async fn verify(&self) -> TransportResult<()> {
        self.verifications.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn send_mail(&self, mail: &OutgoingMail) -> TransportResult<MailReceipt> {
        if let Some(error) = self.failures.lock().unwrap().pop_front() {
            return Err(error);
        }

        let mut sent = self.sent.lock().unwrap();
        sent.push(mail.clone());
        Ok(MailReceipt {
            message_id: format!("<{}@relay.test>", sent.len()),
            accepted: mail.to.clone(),
            rejected: Vec::new(),
            response: Some("250 OK".to_string()),
        })
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// SMS gateway that records messages and fails from a script.
#[derive(Default)]
pub struct ScriptedSmsGateway {
    failures: Mutex<VecDeque<ProviderError>>,
    sent: Mutex<Vec<SmsMessage>>,
}

impl ScriptedSmsGateway {
    /// Queue failures returned by the next sends, in order.
    pub fn fail_next(&self, errors: impl IntoIterator<Item = ProviderError>) {
        self.failures.lock().unwrap().extend(errors);
    }

    pub fn sent(&self) -> Vec<SmsMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl SmsGateway for ScriptedSmsGateway {
    async fn send_message(&self, message: &SmsMessage) -> TransportResult<SmsReceipt> {
        if let Some(error) = self.failures.lock().unwrap().pop_front() {
            return Err(error);
        }

        let mut sent = self.sent.lock().unwrap();
        sent.push(message.clone());
        Ok(SmsReceipt {
            sid: format!("SM{}", sent.len()),
            status: "queued".to_string(),
            to: message.to.clone(),
            from: message.from.clone(),
        })
    }
}

/// Adapter factory wiring the real adapters to the fake transports.
#[derive(Default, Clone)]
pub struct FakeFactory {
    pub mail: Arc<RecordingMailTransport>,
    pub sms: Arc<ScriptedSmsGateway>,
}

#[async_trait]
impl AdapterFactory for FakeFactory {
    async fn create(
        &self,
        channel: NotificationChannel,
        _config: &Config,
    ) -> herald_channels::Result<Arc<dyn ProviderAdapter>> {
        match channel {
            NotificationChannel::Email => Ok(Arc::new(EmailAdapter::new(self.mail.clone()))),
            NotificationChannel::Sms => {
                Ok(Arc::new(SmsAdapter::new(self.sms.clone(), SMS_SENDER)))
            }
            other => Err(NotifyError::UnsupportedChannel(other)),
        }
    }
}

/// Configuration with short retry delays.
pub fn fast_retry_config() -> Config {
    Config::parse(
        r#"{
            retry: { max_retries: 3, delay_ms: 10, timeout_ms: 5000 },
        }"#,
    )
    .unwrap()
}
