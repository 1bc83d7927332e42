//! Lenient DTOs for historical conversation shapes.
//!
//! Every field is optional and unknown fields are ignored. Messages stay as
//! raw JSON until the normalizer sees them.

use palaver_core::conversation::{conversation_key, split_key};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

const PARTNER_EMAIL_FIELDS: &[&str] = &["partnerEmail", "chatWithEmail"];
const PARTNER_NAME_FIELDS: &[&str] = &["partnerName", "chatWithName", "name"];
const PARTNER_AVATAR_FIELDS: &[&str] = &["partnerAvatar", "chatWithAvatar", "avatar", "profilePic"];
const THREAD_MESSAGE_FIELDS: &[&str] = &["messages", "chat"];

/// Shared two-party record, schema 1.0.0 / 1.1.0, as stored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SharedConversationV1 {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub participants: Option<Vec<Value>>,
    #[serde(default)]
    pub labels: Option<Map<String, Value>>,
    #[serde(default)]
    pub messages: Option<Vec<Value>>,
}

/// A shared record after key and participant repair.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SharedConversation {
    pub key: Option<String>,
    pub participants: Vec<String>,
    pub labels: BTreeMap<String, String>,
    pub messages: Vec<Value>,
}

impl SharedConversationV1 {
    /// Repairs the record so key and participants agree.
    ///
    /// A record with two participants but no `::` key gets its key derived;
    /// a record with fewer than two participants gets them back from its
    /// key. `map_key` is the key the record was stored under in a keyed map
    /// and takes precedence over the embedded one.
    pub fn into_repaired(self, map_key: Option<&str>) -> SharedConversation {
        let mut participants: Vec<String> = self
            .participants
            .unwrap_or_default()
            .into_iter()
            .filter_map(|p| match p {
                Value::String(s) if !s.trim().is_empty() => Some(s),
                _ => None,
            })
            .collect();

        let mut key = map_key
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .or(self.key);

        let has_separator = key.as_deref().is_some_and(|k| split_key(k).is_some());
        if !has_separator && participants.len() == 2 {
            key = Some(conversation_key(&participants[0], &participants[1]));
        }

        if participants.len() < 2 {
            if let Some((a, b)) = key.as_deref().and_then(split_key) {
                participants = vec![a, b];
            }
        }

        let labels = self
            .labels
            .unwrap_or_default()
            .into_iter()
            .filter_map(|(email, label)| match label {
                Value::String(s) if !s.trim().is_empty() => Some((email, s)),
                _ => None,
            })
            .collect();

        SharedConversation {
            key,
            participants,
            labels,
            messages: self.messages.unwrap_or_default(),
        }
    }
}

impl SharedConversation {
    /// Builds a shared record from one entry of a per-user map (1.2.0).
    pub fn from_user_thread(user_email: &str, partner_email: &str, messages: Vec<Value>) -> Self {
        Self {
            key: Some(conversation_key(user_email, partner_email)),
            participants: vec![user_email.to_string(), partner_email.to_string()],
            labels: BTreeMap::new(),
            messages,
        }
    }

    /// The participant on the other side from `owner_email`.
    ///
    /// Returns `None` when the owner is not one of two known participants.
    /// A conversation with oneself yields the owner.
    pub fn partner_of(&self, owner_email: &str) -> Option<&str> {
        if self.participants.len() < 2 || !self.participants.iter().any(|p| p == owner_email) {
            return None;
        }
        self.participants
            .iter()
            .find(|p| p.as_str() != owner_email)
            .or_else(|| self.participants.first())
            .map(String::as_str)
    }

    pub fn label_for(&self, email: &str) -> Option<&str> {
        self.labels.get(email).map(String::as_str)
    }
}

/// One embedded thread of a user record, schema 2.0.0.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InlineThreadV2 {
    #[serde(default)]
    pub with: Option<String>,
    #[serde(default)]
    pub chat: Option<Vec<Value>>,
}

/// A per-owner thread read from a map entry (2.1.0) or a canonical-looking
/// list entry (3.0.0), with field aliases resolved.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartnerThread {
    pub partner_email: String,
    pub partner_name: Option<String>,
    pub partner_avatar: Option<String>,
    pub messages: Vec<Value>,
}

impl PartnerThread {
    /// Reads a list entry that names its partner itself.
    pub fn from_entry(entry: &Value) -> Option<Self> {
        let obj = entry.as_object()?;
        let partner_email = first_str(obj, PARTNER_EMAIL_FIELDS)?;
        Some(Self::from_object(partner_email, obj))
    }

    /// Reads the value stored under `partner_email` in an owner-keyed map.
    ///
    /// The value is either a bare message array or a record.
    pub fn from_map_entry(partner_email: &str, value: &Value) -> Option<Self> {
        match value {
            Value::Array(messages) => Some(Self {
                partner_email: partner_email.to_string(),
                messages: messages.clone(),
                ..Self::default()
            }),
            Value::Object(obj) => Some(Self::from_object(partner_email.to_string(), obj)),
            _ => None,
        }
    }

    fn from_object(partner_email: String, obj: &Map<String, Value>) -> Self {
        let messages = THREAD_MESSAGE_FIELDS
            .iter()
            .find_map(|field| obj.get(*field)?.as_array().cloned())
            .unwrap_or_default();
        Self {
            partner_email,
            partner_name: first_str(obj, PARTNER_NAME_FIELDS),
            partner_avatar: first_str(obj, PARTNER_AVATAR_FIELDS),
            messages,
        }
    }
}

/// Whether `entry` looks like a canonical list entry: it names a partner,
/// and its `messages`, when present, is an array. A missing `messages`
/// reads as an empty thread, as it does for [`ConversationRecord`].
///
/// [`ConversationRecord`]: palaver_core::conversation::ConversationRecord
pub(crate) fn is_canonical_entry(entry: &Value) -> bool {
    let Some(obj) = entry.as_object() else {
        return false;
    };
    first_str(obj, PARTNER_EMAIL_FIELDS).is_some()
        && obj.get("messages").is_none_or(Value::is_array)
}

fn first_str(obj: &Map<String, Value>, fields: &[&str]) -> Option<String> {
    fields.iter().find_map(|field| match obj.get(*field)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        _ => None,
    })
}
