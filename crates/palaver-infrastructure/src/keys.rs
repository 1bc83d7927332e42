//! Storage key layout.
//!
//! ```text
//! users                        User records (may embed legacy `messages`)
//! conversationList:<owner>     canonical per-owner conversation list
//! conversations                global legacy store, read-only
//! migratedSources:<owner>      shared legacy sources already folded in
//! userProfile / loggedInUser   session user, full record
//! loggedInUserId               session user, email only
//! openChatWith / openChatMeta  pending chat request
//! notifications                notification log
//! ```

pub const USERS: &str = "users";
pub const LEGACY_CONVERSATIONS: &str = "conversations";
pub const SESSION_PROFILE: &str = "userProfile";
pub const SESSION_LOGGED_IN_USER: &str = "loggedInUser";
pub const SESSION_LOGGED_IN_USER_ID: &str = "loggedInUserId";
pub const PENDING_CHAT_WITH: &str = "openChatWith";
pub const PENDING_CHAT_META: &str = "openChatMeta";
pub const NOTIFICATIONS: &str = "notifications";

const CONVERSATION_LIST_PREFIX: &str = "conversationList:";
const MIGRATED_SOURCES_PREFIX: &str = "migratedSources:";

pub fn conversation_list(owner_email: &str) -> String {
    format!("{CONVERSATION_LIST_PREFIX}{owner_email}")
}

pub fn migrated_sources(owner_email: &str) -> String {
    format!("{MIGRATED_SOURCES_PREFIX}{owner_email}")
}
