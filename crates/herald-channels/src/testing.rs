//! Test doubles shared by the unit tests.

use crate::classifier::ClassifierRules;
use crate::email::validate_email;
use crate::error::{NotifyError, ProviderError};
use crate::payload::{Payload, Recipients, SmsPayload};
use crate::sms::validate_sms;
use crate::traits::{ProviderAdapter, ProviderResponse};
use crate::Result;
use async_trait::async_trait;
use herald_core::NotificationChannel;
use serde_json::{json, Value};
use std::io;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing_subscriber::fmt::MakeWriter;

#[derive(Debug)]
enum Behavior {
    Succeed,
    Fail(ProviderError),
    FailThenSucceed { failures: u32, code: String },
}

/// Scripted adapter that records every attempt.
#[derive(Debug)]
pub(crate) struct FakeAdapter {
    name: String,
    channel: NotificationChannel,
    behavior: Behavior,
    partition: bool,
    delay: Option<Duration>,
    calls: AtomicU32,
    last_payload: Mutex<Option<Payload>>,
    closed: AtomicBool,
}

impl FakeAdapter {
    fn with_behavior(name: &str, behavior: Behavior) -> Self {
        Self {
            name: name.to_string(),
            channel: NotificationChannel::Email,
            behavior,
            partition: false,
            delay: None,
            calls: AtomicU32::new(0),
            last_payload: Mutex::new(None),
            closed: AtomicBool::new(false),
        }
    }

    pub fn succeeding(name: &str) -> Self {
        Self::with_behavior(name, Behavior::Succeed)
    }

    pub fn failing(name: &str, message: &str) -> Self {
        Self::with_behavior(name, Behavior::Fail(ProviderError::new(message)))
    }

    pub fn failing_then_succeeding(name: &str, failures: u32, code: &str) -> Self {
        Self::with_behavior(
            name,
            Behavior::FailThenSucceed {
                failures,
                code: code.to_string(),
            },
        )
    }

    pub fn on_channel(mut self, channel: NotificationChannel) -> Self {
        self.channel = channel;
        self
    }

    /// Split multi-recipient SMS payloads like the SMS adapter does.
    pub fn partitioning(mut self) -> Self {
        self.partition = true;
        self
    }

    /// Make every attempt take this long.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_payload(&self) -> Option<Payload> {
        self.last_payload.lock().unwrap().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn delivered(n: u32) -> Result<ProviderResponse> {
        match json!({ "messageId": format!("msg-{}", n) }) {
            Value::Object(map) => Ok(map),
            _ => unreachable!(),
        }
    }
}

#[async_trait]
impl ProviderAdapter for FakeAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn channel(&self) -> NotificationChannel {
        self.channel
    }

    fn validate(&self, payload: &Payload) -> Result<()> {
        match payload {
            Payload::Email(email) => validate_email(email),
            Payload::Sms(sms) => validate_sms(sms),
            _ => Ok(()),
        }
    }

    fn partition(&self, payload: &Payload) -> Vec<Payload> {
        match payload {
            Payload::Sms(sms) if self.partition => sms
                .to
                .as_slice()
                .iter()
                .map(|to| {
                    Payload::Sms(SmsPayload {
                        to: Recipients::One(to.clone()),
                        ..sms.clone()
                    })
                })
                .collect(),
            _ => vec![payload.clone()],
        }
    }

    async fn attempt_send(&self, payload: &Payload) -> Result<ProviderResponse> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        *self.last_payload.lock().unwrap() = Some(payload.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match &self.behavior {
            Behavior::Succeed => Self::delivered(n),
            Behavior::Fail(e) => Err(NotifyError::Provider(e.clone())),
            Behavior::FailThenSucceed { failures, code } if n <= *failures => Err(
                NotifyError::Provider(ProviderError::new("transient failure").with_code(code.as_str())),
            ),
            Behavior::FailThenSucceed { .. } => Self::delivered(n),
        }
    }

    fn should_retry(&self, error: &ProviderError) -> bool {
        ClassifierRules::email().should_retry(error)
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Collects formatted log output for assertions.
#[derive(Clone, Default)]
pub(crate) struct LogCapture {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl LogCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route this thread's events into the capture until the guard drops.
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        let subscriber = tracing_subscriber::fmt()
            .with_writer(self.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::TRACE)
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buffer.lock().unwrap()).into_owned()
    }
}

pub(crate) struct CaptureWriter(Arc<Mutex<Vec<u8>>>);

impl io::Write for CaptureWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = CaptureWriter;

    fn make_writer(&'a self) -> Self::Writer {
        CaptureWriter(self.buffer.clone())
    }
}
