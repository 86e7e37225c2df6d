//! Wire transports behind the email and SMS adapters.
//!
//! Every transport failure is normalized into a [`ProviderError`] so the
//! classifier sees the same shape regardless of where it came from.

use crate::error::{ErrorCode, NotifyError, ProviderError};
use crate::payload::{EmailAttachment, EmailPayload};
use crate::Result;
use async_trait::async_trait;
use herald_core::config::{EmailConfig, SmsConfig};
use herald_core::SecretString;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::debug;

/// Result of a single transport call.
pub type TransportResult<T> = std::result::Result<T, ProviderError>;

/// A mail message as handed to the transport.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutgoingMail {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<EmailAttachment>,

    /// Pass-through options from the payload.
    #[serde(flatten)]
    pub options: Map<String, Value>,
}

impl From<&EmailPayload> for OutgoingMail {
    fn from(payload: &EmailPayload) -> Self {
        Self {
            from: payload.from.clone(),
            to: payload.to.as_slice().to_vec(),
            subject: payload.subject.clone(),
            html: payload.html_body.clone(),
            text: payload.text_body.clone(),
            attachments: payload.attachments.clone(),
            options: payload.extra.clone(),
        }
    }
}

/// What the mail relay reports for an accepted message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MailReceipt {
    pub message_id: String,

    #[serde(default)]
    pub accepted: Vec<String>,

    #[serde(default)]
    pub rejected: Vec<String>,

    /// Final SMTP reply line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
}

/// Mail delivery transport.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Check that the service is reachable and accepts our credentials.
    async fn verify(&self) -> TransportResult<()>;

    /// Submit one message.
    async fn send_mail(&self, mail: &OutgoingMail) -> TransportResult<MailReceipt>;

    /// Release the connection.
    async fn close(&self);
}

/// An SMS as handed to the gateway.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SmsMessage {
    pub from: String,
    pub to: String,
    pub body: String,

    /// Extra gateway parameters (e.g. `StatusCallback`).
    #[serde(flatten)]
    pub options: Map<String, Value>,
}

/// What the gateway reports for an accepted message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmsReceipt {
    pub sid: String,

    #[serde(default)]
    pub status: String,

    #[serde(default)]
    pub to: String,

    #[serde(default)]
    pub from: String,
}

/// SMS delivery gateway.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SmsGateway: Send + Sync {
    /// Submit one message to one recipient.
    async fn send_message(&self, message: &SmsMessage) -> TransportResult<SmsReceipt>;
}

/// Error body shape shared by the relay and Twilio-style APIs.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,

    #[serde(default)]
    code: Option<ErrorCode>,

    /// SMTP reply code reported by the relay.
    #[serde(default)]
    response_code: Option<u16>,
}

/// Map a `reqwest` failure onto the network codes the classifier knows.
fn from_reqwest(e: reqwest::Error) -> ProviderError {
    let code = if e.is_timeout() {
        Some("ETIMEDOUT")
    } else if e.is_connect() {
        Some("ECONNREFUSED")
    } else if e.is_request() || e.is_body() {
        Some("ESOCKET")
    } else {
        None
    };

    let err = ProviderError::new(e.to_string());
    match code {
        Some(code) => err.with_code(code),
        None => err,
    }
}

/// Turn a non-2xx response into a provider error.
///
/// `status` is the reply code from the body when the provider reports one,
/// otherwise the HTTP status.
async fn from_response(service: &str, response: Response) -> ProviderError {
    let http_status = response.status();
    let body = response.text().await.unwrap_or_default();
    let parsed: ErrorBody = serde_json::from_str(&body).unwrap_or_default();

    let message = match parsed.message.filter(|m| !m.is_empty()) {
        Some(message) => message,
        None if body.trim().is_empty() => format!("{} returned {}", service, http_status),
        None => format!("{} returned {}: {}", service, http_status, body.trim()),
    };

    let err = ProviderError::new(message)
        .with_status(parsed.response_code.unwrap_or_else(|| http_status.as_u16()));
    match parsed.code {
        Some(code) => err.with_code(code),
        None => err,
    }
}

fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| NotifyError::Config(format!("failed to build HTTP client: {}", e)))
}

/// Mail transport over an HTTP mail relay.
///
/// `GET {base}/v1/verify` checks reachability and credentials,
/// `POST {base}/v1/send` submits a JSON message.
#[derive(Debug)]
pub struct HttpMailTransport {
    client: Client,
    base_url: String,
    username: Option<String>,
    password: Option<SecretString>,
    closed: AtomicBool,
}

impl HttpMailTransport {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            username: None,
            password: None,
            closed: AtomicBool::new(false),
        })
    }

    /// Authenticate every request with basic auth.
    pub fn with_credentials(mut self, username: impl Into<String>, password: SecretString) -> Self {
        self.username = Some(username.into());
        self.password = Some(password);
        self
    }

    pub fn from_config(config: &EmailConfig) -> Result<Self> {
        let transport = Self::new(
            config.base_url(),
            Duration::from_millis(config.request_timeout_ms),
        )?;

        Ok(match (&config.username, &config.password) {
            (Some(user), Some(pass)) => transport.with_credentials(user.clone(), pass.clone()),
            _ => transport,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match (&self.username, &self.password) {
            (Some(user), Some(pass)) => request.basic_auth(user, Some(pass.expose_secret())),
            _ => request,
        }
    }

    fn ensure_open(&self) -> TransportResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ProviderError::new("Mail transport has been closed"));
        }
        Ok(())
    }
}

#[async_trait]
impl MailTransport for HttpMailTransport {
    async fn verify(&self) -> TransportResult<()> {
        self.ensure_open()?;

        let response = self
            .authorize(self.client.get(format!("{}/v1/verify", self.base_url)))
            .send()
            .await
            .map_err(from_reqwest)?;

        if !response.status().is_success() {
            return Err(from_response("Mail relay", response).await);
        }
        Ok(())
    }

    async fn send_mail(&self, mail: &OutgoingMail) -> TransportResult<MailReceipt> {
        self.ensure_open()?;
        debug!(recipients = mail.to.len(), "Submitting mail to relay");

        let response = self
            .authorize(self.client.post(format!("{}/v1/send", self.base_url)))
            .json(mail)
            .send()
            .await
            .map_err(from_reqwest)?;

        if !response.status().is_success() {
            return Err(from_response("Mail relay", response).await);
        }

        response
            .json()
            .await
            .map_err(|e| ProviderError::new(format!("Invalid mail relay response: {}", e)))
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// SMS gateway over the Twilio-compatible REST API.
#[derive(Debug)]
pub struct HttpSmsGateway {
    client: Client,
    api_base: String,
    account_sid: String,
    auth_token: SecretString,
}

impl HttpSmsGateway {
    pub fn new(
        api_base: impl Into<String>,
        account_sid: impl Into<String>,
        auth_token: SecretString,
        timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            account_sid: account_sid.into(),
            auth_token,
        })
    }

    pub fn from_config(config: &SmsConfig) -> Result<Self> {
        Self::new(
            config.api_base.clone(),
            config.account_sid.clone(),
            config.auth_token.clone(),
            Duration::from_millis(config.request_timeout_ms),
        )
    }

    fn messages_url(&self) -> String {
        format!("{}/Accounts/{}/Messages.json", self.api_base, self.account_sid)
    }
}

fn form_fields(message: &SmsMessage) -> Vec<(String, String)> {
    let mut fields = vec![
        ("To".to_string(), message.to.clone()),
        ("From".to_string(), message.from.clone()),
        ("Body".to_string(), message.body.clone()),
    ];

    for (key, value) in &message.options {
        match value {
            Value::String(s) => fields.push((key.clone(), s.clone())),
            Value::Number(_) | Value::Bool(_) => fields.push((key.clone(), value.to_string())),
            _ => {}
        }
    }
    fields
}

#[async_trait]
impl SmsGateway for HttpSmsGateway {
    async fn send_message(&self, message: &SmsMessage) -> TransportResult<SmsReceipt> {
        debug!(to = %message.to, "Submitting SMS to gateway");

        let response = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.account_sid, Some(self.auth_token.expose_secret()))
            .form(&form_fields(message))
            .send()
            .await
            .map_err(from_reqwest)?;

        if !response.status().is_success() {
            return Err(from_response("SMS gateway", response).await);
        }

        response
            .json()
            .await
            .map_err(|e| ProviderError::new(format!("Invalid SMS gateway response: {}", e)))
    }
}
