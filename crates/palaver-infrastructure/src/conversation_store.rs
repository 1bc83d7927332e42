//! Conversation store backed by `conversationList:<owner>`.

use crate::keys;
use crate::kv::{read_json, write_json};
use crate::migration::SchemaMigrator;
use palaver_core::conversation::{
    ConversationRecord, ConversationRepository, MetaUpdate, NoOpReason, WriteOutcome,
    is_placeholder_name,
};
use palaver_core::error::Result;
use palaver_core::message::Message;
use palaver_core::storage::KeyValueStore;
use palaver_core::user::UserDirectory;
use std::sync::Arc;

/// [`ConversationRepository`] over the shared key-value substrate.
///
/// Every call reads the owner's list fresh, modifies it, and writes it back.
/// A list that is not in canonical shape is migrated before use, so a store
/// operation never overwrites legacy data it has not read.
pub struct KvConversationStore {
    kv: Arc<dyn KeyValueStore>,
    directory: Arc<dyn UserDirectory>,
    migrator: SchemaMigrator,
}

impl std::fmt::Debug for KvConversationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KvConversationStore")
            .field("kv", &"<dyn KeyValueStore>")
            .field("directory", &"<dyn UserDirectory>")
            .finish()
    }
}

impl KvConversationStore {
    pub fn new(kv: Arc<dyn KeyValueStore>, directory: Arc<dyn UserDirectory>) -> Self {
        let migrator = SchemaMigrator::new(kv.clone(), directory.clone());
        Self {
            kv,
            directory,
            migrator,
        }
    }

    pub fn migrator(&self) -> &SchemaMigrator {
        &self.migrator
    }

    fn load(&self, owner_email: &str) -> Result<Vec<ConversationRecord>> {
        let key = keys::conversation_list(owner_email);
        let Some(raw) = read_json(self.kv.as_ref(), &key)? else {
            return Ok(Vec::new());
        };
        match serde_json::from_value::<Vec<ConversationRecord>>(raw) {
            Ok(list) => Ok(list),
            Err(e) => {
                tracing::debug!(owner = owner_email, error = %e, "Stored list is not canonical, migrating first");
                Ok(self.migrator.migrate(owner_email)?.records)
            }
        }
    }

    fn save(&self, owner_email: &str, list: &[ConversationRecord]) -> Result<()> {
        write_json(self.kv.as_ref(), &keys::conversation_list(owner_email), list)
    }

    /// Finds the record for `partner_email`, creating it if absent.
    ///
    /// Returns its index and whether the list changed.
    fn ensure_record(
        &self,
        list: &mut Vec<ConversationRecord>,
        partner_email: &str,
        update: &MetaUpdate,
    ) -> Result<(usize, bool)> {
        if let Some(index) = list.iter().position(|r| r.partner_email == partner_email) {
            let changed = list[index].fill_meta(update);
            return Ok((index, changed));
        }

        let known = self.directory.by_email(partner_email)?;
        let known_name = known
            .as_ref()
            .map(|u| u.name.as_str())
            .filter(|name| !is_placeholder_name(name, partner_email));
        let name = update
            .name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .or(known_name);

        let mut record = ConversationRecord::new(partner_email, name);
        record.fill_meta(&MetaUpdate {
            name: None,
            avatar: update
                .avatar
                .clone()
                .or_else(|| known.as_ref().and_then(|u| u.profile_pic.clone())),
        });

        self.directory
            .learn(partner_email, update.name.as_deref(), update.avatar.as_deref())?;
        tracing::debug!(partner = partner_email, "Created conversation record");

        list.push(record);
        Ok((list.len() - 1, true))
    }
}

fn identity_of<'a>(owner_email: &'a str, partner_email: &'a str) -> std::result::Result<(&'a str, &'a str), NoOpReason> {
    let owner = owner_email.trim();
    let partner = partner_email.trim();
    if owner.is_empty() {
        return Err(NoOpReason::MissingOwner);
    }
    if partner.is_empty() {
        return Err(NoOpReason::MissingPartner);
    }
    Ok((owner, partner))
}

impl ConversationRepository for KvConversationStore {
    fn list(&self, owner_email: &str) -> Result<Vec<ConversationRecord>> {
        let owner = owner_email.trim();
        if owner.is_empty() {
            return Ok(Vec::new());
        }
        let mut list = self.load(owner)?;
        list.sort_by(|a, b| b.last_timestamp().cmp(&a.last_timestamp()));
        Ok(list)
    }

    fn get(&self, owner_email: &str, partner_email: &str) -> Result<Option<ConversationRecord>> {
        let Ok((owner, partner)) = identity_of(owner_email, partner_email) else {
            return Ok(None);
        };
        Ok(self
            .load(owner)?
            .into_iter()
            .find(|r| r.partner_email == partner))
    }

    fn upsert_meta(
        &self,
        owner_email: &str,
        partner_email: &str,
        update: &MetaUpdate,
    ) -> Result<Option<ConversationRecord>> {
        let (owner, partner) = match identity_of(owner_email, partner_email) {
            Ok(identity) => identity,
            Err(reason) => {
                tracing::debug!(%reason, "Skipping upsert");
                return Ok(None);
            }
        };

        let mut list = self.load(owner)?;
        let (index, changed) = self.ensure_record(&mut list, partner, update)?;
        if changed {
            self.save(owner, &list)?;
        }
        Ok(Some(list.swap_remove(index)))
    }

    fn append(
        &self,
        owner_email: &str,
        partner_email: &str,
        message: &Message,
    ) -> Result<WriteOutcome> {
        let (owner, partner) = match identity_of(owner_email, partner_email) {
            Ok(identity) => identity,
            Err(reason) => {
                tracing::debug!(%reason, "Skipping append");
                return Ok(WriteOutcome::NoOp(reason));
            }
        };

        let mut list = self.load(owner)?;
        let (index, _) = self.ensure_record(&mut list, partner, &MetaUpdate::default())?;
        if !list[index].push_unique(message.clone()) {
            tracing::debug!(owner, partner, timestamp = message.timestamp, "Message already stored");
            return Ok(WriteOutcome::Duplicate);
        }
        self.save(owner, &list)?;
        Ok(WriteOutcome::Appended)
    }
}
