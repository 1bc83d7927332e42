//! Canonical message record.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of payload a message carries.
///
/// Reading never rejects a kind: anything outside the four known values is
/// kept verbatim in `Other` so a renderer can decide what to do with it.
/// Historical spellings (`photo`, `voice`) are only folded into the
/// canonical kinds by [`MessageKind::from_legacy`], which the migrator uses.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MessageKind {
    #[default]
    Text,
    Image,
    Video,
    Audio,
    Other(String),
}

impl MessageKind {
    /// Maps a historical `type` value to its canonical kind.
    ///
    /// Empty or missing values become `Text`.
    pub fn from_legacy(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") => MessageKind::Text,
            Some("photo") => MessageKind::Image,
            Some("voice") => MessageKind::Audio,
            Some(other) => MessageKind::from(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            MessageKind::Text => "text",
            MessageKind::Image => "image",
            MessageKind::Video => "video",
            MessageKind::Audio => "audio",
            MessageKind::Other(raw) => raw,
        }
    }

    /// Noun used when announcing a message of this kind.
    pub fn noun(&self) -> &'static str {
        match self {
            MessageKind::Image => "image",
            MessageKind::Video => "video",
            MessageKind::Audio => "voice message",
            MessageKind::Text | MessageKind::Other(_) => "message",
        }
    }
}

impl From<String> for MessageKind {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "text" => MessageKind::Text,
            "image" => MessageKind::Image,
            "video" => MessageKind::Video,
            "audio" => MessageKind::Audio,
            _ => MessageKind::Other(raw),
        }
    }
}

impl From<MessageKind> for String {
    fn from(kind: MessageKind) -> Self {
        match kind {
            MessageKind::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single message, immutable once created.
///
/// `id` is the creation timestamp and is not unique; identity for merging
/// purposes is the `(sender, timestamp, content)` triple, see [`MessageIdentity`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: i64,
    pub sender: String,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    /// Text body, or an embedded data URI for media.
    pub content: String,
    /// Epoch milliseconds.
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_time: Option<String>,
}

impl Message {
    /// Builds a fresh message stamped with `now`.
    pub fn compose(
        sender: impl Into<String>,
        kind: MessageKind,
        content: impl Into<String>,
        now: DateTime<Local>,
    ) -> Self {
        let millis = now.timestamp_millis();
        Self {
            id: millis,
            sender: sender.into(),
            kind,
            content: content.into(),
            timestamp: millis,
            display_time: Some(now.format("%H:%M").to_string()),
        }
    }

    pub fn identity(&self) -> MessageIdentity {
        MessageIdentity {
            sender: self.sender.clone(),
            timestamp: self.timestamp,
            content: self.content.clone(),
        }
    }
}

/// The `(sender, timestamp, content)` triple two copies of a message share.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageIdentity {
    pub sender: String,
    pub timestamp: i64,
    pub content: String,
}
