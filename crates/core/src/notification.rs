use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::user::UserId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NotificationId(pub i64);

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Channel {
    #[serde(rename = "SMS", alias = "sms", alias = "Sms")]
    Sms,
    #[serde(rename = "Email", alias = "email", alias = "EMAIL")]
    Email,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Sms => write!(f, "SMS"),
            Channel::Email => write!(f, "Email"),
        }
    }
}

impl std::str::FromStr for Channel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sms" => Ok(Channel::Sms),
            "email" | "mail" => Ok(Channel::Email),
            other => Err(format!("Unknown channel: '{other}'")),
        }
    }
}

/// An inbound notification as handed over by a caller, before validation.
/// `received_at` is kept as the caller's raw text: it is parsed best-effort.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewNotification {
    pub channel: Channel,
    pub message_id: String,
    pub sender: String,
    #[serde(default)]
    pub subject: Option<String>,
    pub body: String,
    #[serde(default)]
    pub received_at: Option<String>,
}

/// A stored notification. Immutable once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawNotification {
    pub id: NotificationId,
    pub user_id: UserId,
    pub channel: Channel,
    pub message_id: String,
    pub sender: String,
    pub subject: Option<String>,
    pub body: String,
    pub received_at: NaiveDateTime,
    /// SHA-256 over sender, subject and received timestamp.
    pub fingerprint: String,
    pub created_at: NaiveDateTime,
}

impl RawNotification {
    /// Subject and body joined, as scanned for recurring-payment keywords.
    pub fn full_text(&self) -> String {
        match &self.subject {
            Some(subject) => format!("{subject} {}", self.body),
            None => self.body.clone(),
        }
    }
}
