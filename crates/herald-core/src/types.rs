//! Shared type definitions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A delivery mechanism a notification can be sent through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationChannel {
    Email,
    Sms,
    Push,
    #[serde(alias = "slack")]
    Chat,
}

impl NotificationChannel {
    /// All channels, in declaration order.
    pub const ALL: [NotificationChannel; 4] = [Self::Email, Self::Sms, Self::Push, Self::Chat];

    /// Lowercase channel name used in config keys and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Sms => "sms",
            Self::Push => "push",
            Self::Chat => "chat",
        }
    }
}

impl fmt::Display for NotificationChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationChannel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "email" => Ok(Self::Email),
            "sms" => Ok(Self::Sms),
            "push" => Ok(Self::Push),
            "chat" | "slack" => Ok(Self::Chat),
            other => Err(format!("Unknown notification channel: {}", other)),
        }
    }
}
