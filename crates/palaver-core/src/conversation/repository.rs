//! Conversation store trait.
//!
//! Defines the per-owner operations all reads and writes go through once
//! the owner's data has been migrated to the canonical schema.

use super::model::{ConversationRecord, MetaUpdate};
use crate::error::Result;
use crate::message::Message;
use std::fmt;

/// Why a write was skipped without touching storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoOpReason {
    MissingOwner,
    MissingPartner,
}

impl fmt::Display for NoOpReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoOpReason::MissingOwner => f.write_str("no owner email"),
            NoOpReason::MissingPartner => f.write_str("no partner email"),
        }
    }
}

/// Result of an append.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Appended,
    /// A message with the same identity was already stored; nothing written.
    Duplicate,
    NoOp(NoOpReason),
}

impl WriteOutcome {
    pub fn is_noop(&self) -> bool {
        matches!(self, WriteOutcome::NoOp(_))
    }
}

/// Per-owner conversation store.
///
/// Every method is one read-modify-write of the owner's list and never
/// caches across calls. Two writers racing on the same owner lose one of
/// the updates (last write wins); the substrate offers nothing to prevent it.
pub trait ConversationRepository: Send + Sync {
    /// All of the owner's conversations, most recent activity first.
    /// Conversations without messages sort last.
    fn list(&self, owner_email: &str) -> Result<Vec<ConversationRecord>>;

    /// The owner's conversation with `partner_email`, if one exists.
    fn get(&self, owner_email: &str, partner_email: &str) -> Result<Option<ConversationRecord>>;

    /// Creates the record if absent, otherwise fills only missing metadata.
    ///
    /// Returns `None` when either email is blank.
    fn upsert_meta(
        &self,
        owner_email: &str,
        partner_email: &str,
        update: &MetaUpdate,
    ) -> Result<Option<ConversationRecord>>;

    /// Appends `message` to the owner's record for `partner_email`,
    /// creating the record first when needed.
    fn append(
        &self,
        owner_email: &str,
        partner_email: &str,
        message: &Message,
    ) -> Result<WriteOutcome>;
}
