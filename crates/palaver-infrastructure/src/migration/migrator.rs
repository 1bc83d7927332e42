//! Per-owner schema migrator.

use super::detect::{DecodeContext, LegacySchema, detect};
use super::generation::SchemaGeneration;
use super::traits::LearnedProfile;
use crate::keys;
use crate::kv::{parse_json, read_json, write_json};
use crate::user_directory::inline_threads;
use chrono::Utc;
use palaver_core::conversation::{ConversationRecord, MetaUpdate};
use palaver_core::error::Result;
use palaver_core::storage::KeyValueStore;
use palaver_core::user::UserDirectory;
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

/// Source id of the global legacy store.
const SOURCE_GLOBAL: &str = keys::LEGACY_CONVERSATIONS;
/// Source id of threads embedded in the owner's user record.
const SOURCE_INLINE: &str = "users.messages";

/// What one migration run found and did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MigrationReport {
    pub owner_email: String,
    /// Generation of every source that was decoded, in merge order.
    pub generations: Vec<SchemaGeneration>,
    /// Shared sources folded in for the first time by this run.
    pub consumed_sources: Vec<String>,
    /// Sources that could not be decoded, with the reason.
    pub skipped_sources: Vec<String>,
    /// Messages added from sources other than the canonical list.
    pub messages_recovered: usize,
    /// Whether the canonical list was rewritten.
    pub persisted: bool,
    /// The owner's canonical list after migration, in stored order.
    pub records: Vec<ConversationRecord>,
}

impl MigrationReport {
    fn empty(owner_email: &str) -> Self {
        Self {
            owner_email: owner_email.to_string(),
            ..Self::default()
        }
    }

    pub fn message_count(&self) -> usize {
        self.records.iter().map(|r| r.messages.len()).sum()
    }
}

impl fmt::Display for MigrationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "owner:         {}", self.owner_email)?;
        let generations: Vec<String> = self.generations.iter().map(ToString::to_string).collect();
        writeln!(f, "sources:       {}", if generations.is_empty() { "none".to_string() } else { generations.join(", ") })?;
        if !self.consumed_sources.is_empty() {
            writeln!(f, "consumed:      {}", self.consumed_sources.join(", "))?;
        }
        for skipped in &self.skipped_sources {
            writeln!(f, "skipped:       {skipped}")?;
        }
        writeln!(f, "conversations: {}", self.records.len())?;
        writeln!(f, "messages:      {} ({} recovered)", self.message_count(), self.messages_recovered)?;
        write!(f, "rewritten:     {}", if self.persisted { "yes" } else { "no" })
    }
}

/// Canonical records indexed by partner while sources are folded in.
#[derive(Default)]
struct MergedList {
    records: Vec<ConversationRecord>,
    index: HashMap<String, usize>,
}

impl MergedList {
    /// Folds `records` in and returns how many messages were new.
    fn absorb(&mut self, records: Vec<ConversationRecord>) -> usize {
        let mut added = 0;
        for record in records {
            match self.index.get(&record.partner_email) {
                Some(&i) => added += self.records[i].merge(record),
                None => {
                    added += record.messages.len();
                    self.index.insert(record.partner_email.clone(), self.records.len());
                    self.records.push(record);
                }
            }
        }
        added
    }
}

/// Rewrites an owner's stored conversations into the canonical list.
///
/// Reads, in this order, the value at `conversationList:<owner>` (any
/// shape), the global `conversations` store, and threads embedded in the
/// owner's user record. The last two are shared with other owners and are
/// never modified; once folded in they are recorded under
/// `migratedSources:<owner>` and skipped on later runs, which keeps
/// messages that were stamped with the current time from being imported
/// twice.
///
/// The ledger is per owner and per source, not per write: once
/// `conversations` is recorded as consumed for an owner, anything a legacy
/// client writes to that key afterwards is not folded into that owner's
/// list. Other owners still read the key until they consume it themselves.
///
/// A stored list is read entry by entry. Entries that match no generation
/// are dropped from the rewritten list and reported as skipped; the rest
/// are kept.
pub struct SchemaMigrator {
    kv: Arc<dyn KeyValueStore>,
    directory: Arc<dyn UserDirectory>,
}

impl fmt::Debug for SchemaMigrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaMigrator")
            .field("kv", &"<dyn KeyValueStore>")
            .field("directory", &"<dyn UserDirectory>")
            .finish()
    }
}

impl SchemaMigrator {
    pub fn new(kv: Arc<dyn KeyValueStore>, directory: Arc<dyn UserDirectory>) -> Self {
        Self { kv, directory }
    }

    /// Migrates `owner_email`'s data. Running it again changes nothing.
    pub fn migrate(&self, owner_email: &str) -> Result<MigrationReport> {
        self.migrate_at(owner_email, Utc::now().timestamp_millis())
    }

    /// Like [`migrate`](Self::migrate), stamping timestamp-less legacy
    /// messages with `now_millis`.
    pub fn migrate_at(&self, owner_email: &str, now_millis: i64) -> Result<MigrationReport> {
        let owner = owner_email.trim();
        if owner.is_empty() {
            tracing::debug!("Skipping migration without an owner");
            return Ok(MigrationReport::empty(owner));
        }

        let kv = self.kv.as_ref();
        let list_key = keys::conversation_list(owner);
        let stored = kv.get(&list_key)?;
        let mut consumed = self.consumed_sources(owner)?;
        let session_email = self.directory.current_user()?.map(|u| u.email);
        let ctx = DecodeContext {
            owner_email: owner,
            session_email: session_email.as_deref(),
            now_millis,
        };

        let mut sources: Vec<(Option<&'static str>, LegacySchema)> = Vec::new();
        if let Some(raw) = stored.as_deref().and_then(|s| parse_json(&list_key, s)) {
            sources.extend(detect(&raw).into_iter().map(|schema| (None, schema)));
        }
        if !consumed.contains(SOURCE_GLOBAL) {
            if let Some(raw) = read_json(kv, keys::LEGACY_CONVERSATIONS)? {
                sources.extend(detect(&raw).into_iter().map(|schema| (Some(SOURCE_GLOBAL), schema)));
            }
        }
        if !consumed.contains(SOURCE_INLINE) {
            if let Some(raw) = inline_threads(kv, owner)? {
                sources.extend(detect(&raw).into_iter().map(|schema| (Some(SOURCE_INLINE), schema)));
            }
        }

        let mut report = MigrationReport::empty(owner);
        let mut merged = MergedList::default();
        let mut profiles: Vec<LearnedProfile> = Vec::new();

        for (source, schema) in sources {
            let label = source.unwrap_or("conversationList");
            let Some(generation) = schema.generation() else {
                if let LegacySchema::Malformed(count) = schema {
                    tracing::warn!(owner, source = label, count, "Dropping malformed list entries");
                    report.skipped_sources.push(format!("{label}: {count} malformed entries"));
                } else {
                    tracing::warn!(owner, source = label, "Ignoring unrecognized conversation data");
                    report.skipped_sources.push(format!("{label}: unrecognized shape"));
                }
                continue;
            };

            let decoded = match schema.decode(&ctx) {
                Ok(decoded) => decoded,
                Err(e) => {
                    tracing::warn!(owner, source = label, "Skipping legacy source: {:#}", e);
                    report.skipped_sources.push(format!("{label}: {e:#}"));
                    continue;
                }
            };

            tracing::debug!(
                owner,
                source = label,
                generation = generation.name(),
                shared = generation.is_shared(),
                records = decoded.records.len(),
                "Decoded conversation source"
            );
            report.generations.push(generation);
            profiles.extend(decoded.profiles);
            let added = merged.absorb(decoded.records);
            if generation != SchemaGeneration::Canonical {
                report.messages_recovered += added;
            }
            if let Some(id) = source {
                if consumed.insert(id.to_string()) {
                    report.consumed_sources.push(id.to_string());
                }
            }
        }

        self.learn_profiles(owner, &profiles)?;
        self.fill_from_directory(&mut merged.records)?;

        let serialized = serde_json::to_string(&merged.records)?;
        report.persisted = stored.as_deref() != Some(serialized.as_str());
        if report.persisted {
            kv.set(&list_key, &serialized)?;
        }
        if !report.consumed_sources.is_empty() {
            write_json(kv, &keys::migrated_sources(owner), &consumed)?;
        }

        report.records = merged.records;
        tracing::info!(
            owner,
            conversations = report.records.len(),
            recovered = report.messages_recovered,
            rewritten = report.persisted,
            "Migrated conversations"
        );
        Ok(report)
    }

    fn consumed_sources(&self, owner: &str) -> Result<BTreeSet<String>> {
        let consumed = match read_json(self.kv.as_ref(), &keys::migrated_sources(owner))? {
            Some(Value::Array(ids)) => ids
                .into_iter()
                .filter_map(|id| id.as_str().map(str::to_string))
                .collect(),
            _ => BTreeSet::new(),
        };
        Ok(consumed)
    }

    fn learn_profiles(&self, owner: &str, profiles: &[LearnedProfile]) -> Result<()> {
        self.directory.learn(owner, None, None)?;
        for profile in profiles {
            self.directory
                .learn(&profile.email, profile.name.as_deref(), profile.avatar.as_deref())?;
        }
        Ok(())
    }

    /// Fills placeholder names and missing avatars from the directory.
    fn fill_from_directory(&self, records: &mut [ConversationRecord]) -> Result<()> {
        for record in records.iter_mut() {
            if !record.has_placeholder_name() && record.partner_avatar.is_some() {
                continue;
            }
            if let Some(user) = self.directory.by_email(&record.partner_email)? {
                record.fill_meta(&MetaUpdate {
                    name: Some(user.name),
                    avatar: user.profile_pic,
                });
            }
        }
        Ok(())
    }
}
