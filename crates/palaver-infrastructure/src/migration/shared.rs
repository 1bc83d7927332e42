//! Decoders for the shared-record generations (1.0.0, 1.1.0, 1.2.0).
//!
//! One shared record holds a conversation for both participants. Decoding it
//! for an owner yields at most one canonical record, the owner's side; the
//! partner's side is produced when the partner migrates.

use super::generation::SchemaGeneration;
use super::traits::{Decoded, LearnedProfile, Migration, TypedMigration};
use crate::dto::{SharedConversation, SharedConversationV1};
use crate::normalizer::normalize_at;
use anyhow::{Context, Result};
use palaver_core::conversation::{ConversationRecord, is_placeholder_name};
use serde_json::{Map, Value};

/// Migration from the global flat array (1.0.0).
#[derive(Debug)]
pub struct SharedArrayMigration {
    owner_email: String,
    now_millis: i64,
}

impl SharedArrayMigration {
    pub fn new(owner_email: &str, now_millis: i64) -> Self {
        Self {
            owner_email: owner_email.to_string(),
            now_millis,
        }
    }
}

impl Migration for SharedArrayMigration {
    fn generation(&self) -> SchemaGeneration {
        SchemaGeneration::SharedArray
    }

    fn description(&self) -> &str {
        "Split shared records of the global array into the owner's list"
    }
}

impl TypedMigration<Vec<Value>, Decoded> for SharedArrayMigration {
    fn migrate(&self, items: Vec<Value>) -> Result<Decoded> {
        let conversations = items.into_iter().enumerate().filter_map(|(i, item)| {
            parse_shared(item, &format!("shared conversation #{i}"))
                .map(|dto| dto.into_repaired(None))
        });
        Ok(decode_shared(&self.owner_email, conversations, self.now_millis))
    }
}

/// Migration from the global keyed map (1.1.0).
#[derive(Debug)]
pub struct SharedMapMigration {
    owner_email: String,
    now_millis: i64,
}

impl SharedMapMigration {
    pub fn new(owner_email: &str, now_millis: i64) -> Self {
        Self {
            owner_email: owner_email.to_string(),
            now_millis,
        }
    }
}

impl Migration for SharedMapMigration {
    fn generation(&self) -> SchemaGeneration {
        SchemaGeneration::SharedMap
    }

    fn description(&self) -> &str {
        "Split shared records of the keyed map into the owner's list"
    }
}

impl TypedMigration<Map<String, Value>, Decoded> for SharedMapMigration {
    fn migrate(&self, map: Map<String, Value>) -> Result<Decoded> {
        let conversations = map.into_iter().filter_map(|(key, item)| {
            parse_shared(item, &format!("shared conversation '{key}'"))
                .map(|dto| dto.into_repaired(Some(key.as_str())))
        });
        Ok(decode_shared(&self.owner_email, conversations, self.now_millis))
    }
}

/// Migration from the per-user map (1.2.0).
///
/// The map belongs to `user_email` and is keyed by partner. Each entry is a
/// two-party conversation, so it is decoded like a shared record: the map's
/// user and each partner both get their side.
#[derive(Debug)]
pub struct UserMapMigration {
    owner_email: String,
    user_email: String,
    now_millis: i64,
}

impl UserMapMigration {
    pub fn new(owner_email: &str, user_email: &str, now_millis: i64) -> Self {
        Self {
            owner_email: owner_email.to_string(),
            user_email: user_email.to_string(),
            now_millis,
        }
    }
}

impl Migration for UserMapMigration {
    fn generation(&self) -> SchemaGeneration {
        SchemaGeneration::UserMap
    }

    fn description(&self) -> &str {
        "Lift a per-user partner map into the owner's list"
    }
}

impl TypedMigration<Map<String, Value>, Decoded> for UserMapMigration {
    fn migrate(&self, map: Map<String, Value>) -> Result<Decoded> {
        let user = self.user_email.trim();
        if user.is_empty() {
            anyhow::bail!("per-user map names no user");
        }

        let conversations = map.into_iter().filter_map(|(partner, item)| match item {
            Value::Array(messages) if !partner.trim().is_empty() => {
                Some(SharedConversation::from_user_thread(user, &partner, messages))
            }
            _ => {
                tracing::warn!(user, partner = %partner, "Skipping per-user thread that is not a message list");
                None
            }
        });
        Ok(decode_shared(&self.owner_email, conversations, self.now_millis))
    }
}

fn parse_shared(item: Value, what: &str) -> Option<SharedConversationV1> {
    match serde_json::from_value::<SharedConversationV1>(item)
        .with_context(|| format!("Failed to decode {what}"))
    {
        Ok(dto) => Some(dto),
        Err(e) => {
            tracing::warn!("Skipping legacy record: {:#}", e);
            None
        }
    }
}

fn decode_shared(
    owner_email: &str,
    conversations: impl IntoIterator<Item = SharedConversation>,
    now_millis: i64,
) -> Decoded {
    let mut decoded = Decoded::default();

    for convo in conversations {
        let Some(partner) = convo.partner_of(owner_email) else {
            continue;
        };

        decoded.profiles.extend(
            convo
                .labels
                .iter()
                .filter(|(email, label)| !is_placeholder_name(label, email))
                .map(|(email, label)| LearnedProfile {
                    email: email.clone(),
                    name: Some(label.clone()),
                    avatar: None,
                }),
        );

        let mut record = ConversationRecord::new(partner, convo.label_for(partner));
        record.messages = convo
            .messages
            .iter()
            .map(|m| normalize_at(m, now_millis))
            .collect();

        tracing::debug!(
            owner = owner_email,
            partner,
            key = ?convo.key,
            messages = record.messages.len(),
            "Decoded shared conversation"
        );
        decoded.records.push(record);
    }

    decoded
}
