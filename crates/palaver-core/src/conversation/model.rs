//! Canonical per-owner conversation record.

use crate::message::{Message, MessageIdentity};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One owner's private copy of a conversation with `partner_email`.
///
/// The partner holds a structurally independent record with the roles
/// reversed. Messages are append-only and kept in insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationRecord {
    pub partner_email: String,
    pub partner_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partner_avatar: Option<String>,
    #[serde(default)]
    pub messages: Vec<Message>,
}

/// Metadata offered for a partner. Only fills what is still missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetaUpdate {
    pub name: Option<String>,
    pub avatar: Option<String>,
}

impl MetaUpdate {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            avatar: None,
        }
    }

    pub fn with_avatar(mut self, avatar: impl Into<String>) -> Self {
        self.avatar = Some(avatar.into());
        self
    }
}

/// A display name that only stands in for a real one: empty, or the email itself.
pub fn is_placeholder_name(name: &str, email: &str) -> bool {
    let name = name.trim();
    name.is_empty() || name == email
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

impl ConversationRecord {
    /// Creates an empty record. A blank name falls back to the partner's email.
    pub fn new(partner_email: impl Into<String>, partner_name: Option<&str>) -> Self {
        let partner_email = partner_email.into();
        let partner_name = non_blank(partner_name)
            .map(str::to_string)
            .unwrap_or_else(|| partner_email.clone());
        Self {
            partner_email,
            partner_name,
            partner_avatar: None,
            messages: Vec::new(),
        }
    }

    /// Timestamp of the most recent message, if any.
    pub fn last_timestamp(&self) -> Option<i64> {
        self.messages.iter().map(|m| m.timestamp).max()
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn contains(&self, identity: &MessageIdentity) -> bool {
        self.messages.iter().any(|m| &m.identity() == identity)
    }

    pub fn has_placeholder_name(&self) -> bool {
        is_placeholder_name(&self.partner_name, &self.partner_email)
    }

    /// First-write-wins fill of name and avatar.
    ///
    /// A name is written only over a placeholder, an avatar only where none
    /// is set; blank values never overwrite anything. Returns whether the
    /// record changed.
    pub fn fill_meta(&mut self, update: &MetaUpdate) -> bool {
        let mut changed = false;

        if let Some(name) = non_blank(update.name.as_deref()) {
            if self.has_placeholder_name() && name != self.partner_name {
                self.partner_name = name.to_string();
                changed = true;
            }
        } else if self.partner_name.trim().is_empty() {
            self.partner_name = self.partner_email.clone();
            changed = true;
        }

        if let Some(avatar) = non_blank(update.avatar.as_deref()) {
            if non_blank(self.partner_avatar.as_deref()).is_none() {
                self.partner_avatar = Some(avatar.to_string());
                changed = true;
            }
        }

        changed
    }

    /// Appends `message` unless a message with the same identity is present.
    pub fn push_unique(&mut self, message: Message) -> bool {
        if self.contains(&message.identity()) {
            return false;
        }
        self.messages.push(message);
        true
    }

    /// Folds another copy of the same conversation into this one.
    ///
    /// Messages are unioned by identity; metadata follows [`fill_meta`].
    /// When messages from `other` land in a non-empty record the result is
    /// stably re-sorted by timestamp, since two sources carry no common
    /// insertion order. Only migration merges; live appends keep insertion
    /// order. Returns the number of messages added.
    ///
    /// [`fill_meta`]: ConversationRecord::fill_meta
    pub fn merge(&mut self, other: ConversationRecord) -> usize {
        self.fill_meta(&MetaUpdate {
            name: Some(other.partner_name),
            avatar: other.partner_avatar,
        });

        let had_messages = !self.messages.is_empty();
        let mut seen: HashSet<MessageIdentity> =
            self.messages.iter().map(Message::identity).collect();

        let mut added = 0;
        for message in other.messages {
            if seen.insert(message.identity()) {
                self.messages.push(message);
                added += 1;
            }
        }

        if had_messages && added > 0 {
            self.messages.sort_by_key(|m| m.timestamp);
        }
        added
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MessageKind;

    fn text(sender: &str, content: &str, timestamp: i64) -> Message {
        Message {
            id: timestamp,
            sender: sender.to_string(),
            kind: MessageKind::Text,
            content: content.to_string(),
            timestamp,
            display_time: None,
        }
    }

    #[test]
    fn test_new_defaults_name_to_email() {
        let record = ConversationRecord::new("b@x", None);
        assert_eq!(record.partner_name, "b@x");
        let record = ConversationRecord::new("b@x", Some("  "));
        assert_eq!(record.partner_name, "b@x");
        let record = ConversationRecord::new("b@x", Some("Bob"));
        assert_eq!(record.partner_name, "Bob");
    }

    #[test]
    fn test_fill_meta_first_write_wins() {
        let mut record = ConversationRecord::new("b@x", None);
        assert!(record.fill_meta(&MetaUpdate::named("Bob")));
        assert!(!record.fill_meta(&MetaUpdate::named("Robert")));
        assert_eq!(record.partner_name, "Bob");
    }

    #[test]
    fn test_fill_meta_never_blanks() {
        let mut record = ConversationRecord::new("b@x", Some("Bob"));
        record.partner_avatar = Some("data:image/png;base64,AA".to_string());
        let changed = record.fill_meta(&MetaUpdate {
            name: Some(String::new()),
            avatar: Some(String::new()),
        });
        assert!(!changed);
        assert_eq!(record.partner_name, "Bob");
        assert_eq!(
            record.partner_avatar.as_deref(),
            Some("data:image/png;base64,AA")
        );
    }

    #[test]
    fn test_merge_unions_by_identity() {
        let mut left = ConversationRecord::new("b", None);
        left.messages = vec![text("a", "hi", 100), text("b", "yo", 300)];

        let mut right = ConversationRecord::new("b", Some("Bob"));
        right.messages = vec![text("a", "hi", 100), text("a", "late", 200)];

        let added = left.merge(right);

        assert_eq!(added, 1);
        assert_eq!(left.partner_name, "Bob");
        let contents: Vec<_> = left.messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["hi", "late", "yo"]);
    }

    #[test]
    fn test_merge_same_content_different_time_is_kept() {
        let mut left = ConversationRecord::new("b", None);
        left.messages = vec![text("a", "ok", 1)];
        let mut right = ConversationRecord::new("b", None);
        right.messages = vec![text("a", "ok", 2)];
        assert_eq!(left.merge(right), 1);
        assert_eq!(left.messages.len(), 2);
    }

    #[test]
    fn test_merge_without_additions_keeps_order() {
        let mut left = ConversationRecord::new("b", None);
        left.messages = vec![text("a", "second", 200), text("a", "first", 100)];
        let snapshot = left.clone();
        let added = left.merge(snapshot.clone());
        assert_eq!(added, 0);
        assert_eq!(left, snapshot);
    }

    #[test]
    fn test_last_timestamp() {
        let mut record = ConversationRecord::new("b", None);
        assert_eq!(record.last_timestamp(), None);
        record.messages = vec![text("a", "x", 5), text("a", "y", 9)];
        assert_eq!(record.last_timestamp(), Some(9));
    }

    #[test]
    fn test_wire_shape() {
        let record = ConversationRecord::new("b", None);
        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            serde_json::json!({"partnerEmail": "b", "partnerName": "b", "messages": []})
        );
    }
}
