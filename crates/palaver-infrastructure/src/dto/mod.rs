//! Data Transfer Objects (DTOs) for persisted data.
//!
//! Canonical records serialize straight from the domain types. The DTOs
//! here cover what the domain types cannot: the historical conversation
//! shapes the migrator reads, and user records that carry fields this
//! core does not own.
//!
//! ## Conversation schema history
//! - **1.0.0**: global flat array of shared records `{key, participants, labels, messages}`
//! - **1.1.0**: global map `{conversations: {key: sharedRecord}}`
//! - **1.2.0**: per-user map `{currentUser, conversations: {partner: [message]}}`
//! - **2.0.0**: per-user threads embedded in the user record, `messages: [{with, chat}]`
//! - **2.1.0**: global map keyed by owner then partner
//! - **3.0.0**: per-owner list of `{partnerEmail, partnerName, partnerAvatar, messages}`

mod legacy;
mod user_record;

pub(crate) use legacy::is_canonical_entry;
pub use legacy::{InlineThreadV2, PartnerThread, SharedConversation, SharedConversationV1};
pub use user_record::UserRecordDto;
