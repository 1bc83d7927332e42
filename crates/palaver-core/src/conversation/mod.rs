//! Conversation domain module.
//!
//! # Module Structure
//!
//! - `key`: order-independent identity for a pair of users (legacy shared records)
//! - `model`: the canonical per-owner `ConversationRecord` and its merge rules
//! - `repository`: the per-owner conversation store contract
//!
//! There is no shared conversation record in the canonical schema. Each
//! participant owns an independent copy keyed by the partner's email.

mod key;
mod model;
mod repository;

pub use key::{conversation_key, split_key, KEY_SEPARATOR};
pub use model::{is_placeholder_name, ConversationRecord, MetaUpdate};
pub use repository::{ConversationRepository, NoOpReason, WriteOutcome};
