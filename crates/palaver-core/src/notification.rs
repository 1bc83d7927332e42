//! Notification side-channel.

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Stored as the `type` field of a notification entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Message,
}

/// An announcement addressed to one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub recipient_email: String,
    pub kind: NotificationKind,
    pub title: String,
    pub details: String,
}

/// Fire-and-forget sink for notifications.
///
/// Callers log a failed `notify` and carry on; a message that was already
/// stored is never rolled back because its announcement failed.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: Notification) -> Result<()>;
}

/// Sink that drops everything, for callers with notifications disabled.
#[derive(Debug, Clone, Default)]
pub struct NullNotificationSink;

impl NotificationSink for NullNotificationSink {
    fn notify(&self, _notification: Notification) -> Result<()> {
        Ok(())
    }
}
