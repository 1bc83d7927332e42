//! Dual-write replication of a new message.
//!
//! A conversation has no shared source of truth: each participant owns an
//! independent copy. [`DualWriteReplicator::deliver`] keeps the two copies
//! in step by writing the message into both owners' stores, then announces
//! it to the recipient.
//!
//! The two writes are not a transaction. A crash between them leaves the
//! recipient without the message until `deliver` is run again; appends are
//! idempotent, so re-running is always safe.

use anyhow::Result;
use palaver_core::conversation::{ConversationRepository, MetaUpdate, WriteOutcome, is_placeholder_name};
use palaver_core::message::{Message, MessageKind};
use palaver_core::notification::{Notification, NotificationKind, NotificationSink};
use palaver_core::user::UserDirectory;
use std::sync::Arc;

/// Title of every new-message notification.
pub const NEW_MESSAGE_TITLE: &str = "New Message";

/// What each step of a delivery did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    pub sender_side: WriteOutcome,
    pub recipient_side: WriteOutcome,
    /// Whether the notification sink accepted an announcement.
    pub notified: bool,
}

impl Delivery {
    /// Whether neither store was touched.
    pub fn is_noop(&self) -> bool {
        self.sender_side.is_noop() && self.recipient_side.is_noop()
    }
}

/// Builds the announcement sent to `recipient_email` for a new message.
pub fn new_message_notification(
    recipient_email: &str,
    sender_name: &str,
    kind: &MessageKind,
) -> Notification {
    Notification {
        recipient_email: recipient_email.to_string(),
        kind: NotificationKind::Message,
        title: NEW_MESSAGE_TITLE.to_string(),
        details: format!("{} sent you a {}.", sender_name, kind.noun()),
    }
}

/// Writes each new message into both participants' stores.
pub struct DualWriteReplicator {
    /// Per-owner conversation store both copies go through
    store: Arc<dyn ConversationRepository>,
    /// Source of the sender's name and avatar for the recipient's record
    directory: Arc<dyn UserDirectory>,
    /// Side channel for the recipient's announcement
    notifier: Arc<dyn NotificationSink>,
    notify_on_delivery: bool,
}

impl std::fmt::Debug for DualWriteReplicator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DualWriteReplicator")
            .field("store", &"<dyn ConversationRepository>")
            .field("directory", &"<dyn UserDirectory>")
            .field("notifier", &"<dyn NotificationSink>")
            .field("notify_on_delivery", &self.notify_on_delivery)
            .finish()
    }
}

impl DualWriteReplicator {
    /// Creates a replicator that announces every delivery.
    ///
    /// # Arguments
    ///
    /// * `store` - Conversation store holding every owner's list
    /// * `directory` - User directory used to label the recipient's record
    /// * `notifier` - Sink receiving new-message announcements
    pub fn new(
        store: Arc<dyn ConversationRepository>,
        directory: Arc<dyn UserDirectory>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            store,
            directory,
            notifier,
            notify_on_delivery: true,
        }
    }

    /// Turns announcements on or off.
    pub fn with_notifications(mut self, enabled: bool) -> Self {
        self.notify_on_delivery = enabled;
        self
    }

    /// Delivers `message` from `sender_email` to `recipient_email`.
    ///
    /// In order: appends to the sender's record for the recipient, ensures
    /// the recipient's record for the sender (labelled with the sender's
    /// known profile) and appends a copy there, then notifies the recipient.
    ///
    /// A blank email makes the whole call a no-op. A failed notification is
    /// logged and reported through [`Delivery::notified`]; the stored
    /// message is kept.
    pub fn deliver(
        &self,
        sender_email: &str,
        recipient_email: &str,
        message: &Message,
    ) -> Result<Delivery> {
        let sender = sender_email.trim();
        let recipient = recipient_email.trim();

        let sender_side = self.store.append(sender, recipient, message)?;
        if let WriteOutcome::NoOp(reason) = sender_side {
            tracing::debug!(%reason, "Nothing to deliver");
            return Ok(Delivery {
                sender_side,
                recipient_side: sender_side,
                notified: false,
            });
        }

        let sender_profile = self.directory.by_email(sender)?;
        let meta = match &sender_profile {
            Some(user) => MetaUpdate {
                name: Some(user.name.clone()).filter(|n| !is_placeholder_name(n, sender)),
                avatar: user.profile_pic.clone(),
            },
            None => MetaUpdate::default(),
        };
        self.store.upsert_meta(recipient, sender, &meta)?;
        let recipient_side = self.store.append(recipient, sender, message)?;

        tracing::info!(
            from = sender,
            to = recipient,
            kind = %message.kind,
            ?sender_side,
            ?recipient_side,
            "Delivered message"
        );

        let mut notified = false;
        if self.notify_on_delivery && recipient_side == WriteOutcome::Appended && sender != recipient {
            let sender_name = sender_profile
                .as_ref()
                .map(|u| u.display_name())
                .unwrap_or(sender);
            let notification = new_message_notification(recipient, sender_name, &message.kind);
            match self.notifier.notify(notification) {
                Ok(()) => notified = true,
                Err(e) => tracing::warn!(to = recipient, error = %e, "Failed to send notification"),
            }
        }

        Ok(Delivery {
            sender_side,
            recipient_side,
            notified,
        })
    }
}
