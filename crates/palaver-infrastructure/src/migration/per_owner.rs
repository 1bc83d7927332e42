//! Decoders for generations that already store one copy per owner
//! (2.0.0, 2.1.0, and the canonical 3.0.0 list itself).

use super::generation::SchemaGeneration;
use super::traits::{Decoded, LearnedProfile, Migration, TypedMigration};
use crate::dto::{InlineThreadV2, PartnerThread};
use crate::normalizer::normalize_at;
use anyhow::{Context, Result};
use palaver_core::conversation::{ConversationRecord, is_placeholder_name};
use serde_json::{Map, Value};

/// Re-normalization of an already canonical list.
///
/// A no-op on data this crate wrote; repairs alias fields left by older
/// writers of the same shape.
#[derive(Debug)]
pub struct CanonicalMigration {
    now_millis: i64,
}

impl CanonicalMigration {
    pub fn new(now_millis: i64) -> Self {
        Self { now_millis }
    }
}

impl Migration for CanonicalMigration {
    fn generation(&self) -> SchemaGeneration {
        SchemaGeneration::Canonical
    }

    fn description(&self) -> &str {
        "Re-normalize messages of the canonical list"
    }
}

impl TypedMigration<Vec<Value>, Decoded> for CanonicalMigration {
    fn migrate(&self, items: Vec<Value>) -> Result<Decoded> {
        let records = items
            .iter()
            .filter_map(PartnerThread::from_entry)
            .map(|thread| thread_record(thread, self.now_millis))
            .collect();
        Ok(Decoded {
            records,
            profiles: Vec::new(),
        })
    }
}

/// Migration from threads embedded in the user record (2.0.0).
#[derive(Debug)]
pub struct InlineThreadsMigration {
    now_millis: i64,
}

impl InlineThreadsMigration {
    pub fn new(now_millis: i64) -> Self {
        Self { now_millis }
    }
}

impl Migration for InlineThreadsMigration {
    fn generation(&self) -> SchemaGeneration {
        SchemaGeneration::InlineThreads
    }

    fn description(&self) -> &str {
        "Relabel embedded {with, chat} threads as partner records"
    }
}

impl TypedMigration<Vec<Value>, Decoded> for InlineThreadsMigration {
    fn migrate(&self, items: Vec<Value>) -> Result<Decoded> {
        let mut decoded = Decoded::default();
        for (i, item) in items.into_iter().enumerate() {
            let thread = match serde_json::from_value::<InlineThreadV2>(item)
                .with_context(|| format!("Failed to decode embedded thread #{i}"))
            {
                Ok(thread) => thread,
                Err(e) => {
                    tracing::warn!("Skipping legacy record: {:#}", e);
                    continue;
                }
            };
            let Some(partner) = thread.with.filter(|w| !w.trim().is_empty()) else {
                tracing::warn!(index = i, "Skipping embedded thread without a partner");
                continue;
            };
            decoded.records.push(thread_record(
                PartnerThread {
                    partner_email: partner,
                    messages: thread.chat.unwrap_or_default(),
                    ..PartnerThread::default()
                },
                self.now_millis,
            ));
        }
        Ok(decoded)
    }
}

/// Migration from the owner-keyed global map (2.1.0).
#[derive(Debug)]
pub struct OwnerMapMigration {
    owner_email: String,
    now_millis: i64,
}

impl OwnerMapMigration {
    pub fn new(owner_email: &str, now_millis: i64) -> Self {
        Self {
            owner_email: owner_email.to_string(),
            now_millis,
        }
    }
}

impl Migration for OwnerMapMigration {
    fn generation(&self) -> SchemaGeneration {
        SchemaGeneration::OwnerMap
    }

    fn description(&self) -> &str {
        "Take the owner's entry of the owner-keyed map"
    }
}

impl TypedMigration<Map<String, Value>, Decoded> for OwnerMapMigration {
    fn migrate(&self, mut map: Map<String, Value>) -> Result<Decoded> {
        let threads = match map.remove(&self.owner_email) {
            None => return Ok(Decoded::default()),
            Some(Value::Object(threads)) => threads,
            Some(_) => anyhow::bail!("entry for owner '{}' is not a map", self.owner_email),
        };

        let mut decoded = Decoded::default();
        for (partner, value) in &threads {
            let Some(thread) = PartnerThread::from_map_entry(partner, value) else {
                tracing::warn!(owner = %self.owner_email, partner = %partner, "Skipping unreadable thread");
                continue;
            };
            if thread.partner_name.is_some() || thread.partner_avatar.is_some() {
                let name = thread
                    .partner_name
                    .clone()
                    .filter(|n| !is_placeholder_name(n, partner));
                decoded.profiles.push(LearnedProfile {
                    email: partner.clone(),
                    name,
                    avatar: thread.partner_avatar.clone(),
                });
            }
            decoded.records.push(thread_record(thread, self.now_millis));
        }
        Ok(decoded)
    }
}

fn thread_record(thread: PartnerThread, now_millis: i64) -> ConversationRecord {
    let mut record = ConversationRecord::new(thread.partner_email, thread.partner_name.as_deref());
    record.partner_avatar = thread.partner_avatar;
    record.messages = thread
        .messages
        .iter()
        .map(|m| normalize_at(m, now_millis))
        .collect();
    record
}
