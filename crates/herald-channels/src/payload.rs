//! Channel-specific notification payloads.

use herald_core::NotificationChannel;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One recipient or many.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Recipients {
    One(String),
    Many(Vec<String>),
}

impl Recipients {
    pub fn as_slice(&self) -> &[String] {
        match self {
            Self::One(r) => std::slice::from_ref(r),
            Self::Many(rs) => rs,
        }
    }

    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }

    pub fn first(&self) -> Option<&str> {
        self.as_slice().first().map(String::as_str)
    }
}

impl From<&str> for Recipients {
    fn from(r: &str) -> Self {
        Self::One(r.to_string())
    }
}

impl From<String> for Recipients {
    fn from(r: String) -> Self {
        Self::One(r)
    }
}

impl From<Vec<String>> for Recipients {
    fn from(rs: Vec<String>) -> Self {
        Self::Many(rs)
    }
}

impl From<Vec<&str>> for Recipients {
    fn from(rs: Vec<&str>) -> Self {
        Self::Many(rs.into_iter().map(String::from).collect())
    }
}

/// An email attachment, passed through to the transport untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailAttachment {
    pub filename: String,

    /// Inline content (text or base64, per `encoding`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,

    /// Path or URL the relay fetches the content from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

/// Email notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailPayload {
    pub from: String,
    pub to: Recipients,
    pub subject: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_body: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_body: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<EmailAttachment>,

    /// Provider-specific options forwarded as-is (e.g. per-message `auth`).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl EmailPayload {
    pub fn new(
        from: impl Into<String>,
        to: impl Into<Recipients>,
        subject: impl Into<String>,
    ) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            subject: subject.into(),
            html_body: None,
            text_body: None,
            attachments: Vec::new(),
            extra: Map::new(),
        }
    }

    pub fn with_html(mut self, html: impl Into<String>) -> Self {
        self.html_body = Some(html.into());
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text_body = Some(text.into());
        self
    }

    pub fn with_attachment(mut self, attachment: EmailAttachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    pub fn with_option(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

/// SMS notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmsPayload {
    /// Sender number; the configured default is used when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,

    pub to: Recipients,
    pub message: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SmsPayload {
    pub fn new(to: impl Into<Recipients>, message: impl Into<String>) -> Self {
        Self {
            from: None,
            to: to.into(),
            message: message.into(),
            extra: Map::new(),
        }
    }

    pub fn with_from(mut self, from: impl Into<String>) -> Self {
        self.from = Some(from.into());
        self
    }

    pub fn with_option(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

/// Push notification. No built-in adapter; supplied through registry overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushPayload {
    pub device_token: String,
    pub title: String,
    pub body: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Chat notification. No built-in adapter; supplied through registry overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatPayload {
    pub room: String,
    pub text: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A notification for exactly one channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "channel", content = "payload", rename_all = "lowercase")]
pub enum Payload {
    Email(EmailPayload),
    Sms(SmsPayload),
    Push(PushPayload),
    Chat(ChatPayload),
}

impl Payload {
    /// The channel this payload is shaped for.
    pub fn channel(&self) -> NotificationChannel {
        match self {
            Self::Email(_) => NotificationChannel::Email,
            Self::Sms(_) => NotificationChannel::Sms,
            Self::Push(_) => NotificationChannel::Push,
            Self::Chat(_) => NotificationChannel::Chat,
        }
    }
}

impl From<EmailPayload> for Payload {
    fn from(p: EmailPayload) -> Self {
        Self::Email(p)
    }
}

impl From<SmsPayload> for Payload {
    fn from(p: SmsPayload) -> Self {
        Self::Sms(p)
    }
}

impl From<PushPayload> for Payload {
    fn from(p: PushPayload) -> Self {
        Self::Push(p)
    }
}

impl From<ChatPayload> for Payload {
    fn from(p: ChatPayload) -> Self {
        Self::Chat(p)
    }
}
