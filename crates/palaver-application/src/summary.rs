//! Chat-list entries: display names and message previews.

use palaver_core::conversation::{ConversationRecord, is_placeholder_name};
use palaver_core::message::{Message, MessageKind};
use palaver_core::user::User;
use serde::Serialize;

/// Preview shown for a conversation without messages.
pub const NO_MESSAGES: &str = "No messages";
/// Name shown when nothing identifies the partner.
pub const UNKNOWN_USER: &str = "Unknown user";

const PREVIEW_CHARS: usize = 50;

/// One row of the chat list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    pub partner_email: String,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partner_avatar: Option<String>,
    pub preview: String,
    pub last_timestamp: Option<i64>,
    pub message_count: usize,
}

impl ConversationSummary {
    /// Summarizes `record`, naming the partner through `known` when the
    /// directory has a profile for them.
    pub fn from_record(record: &ConversationRecord, known: Option<&User>) -> Self {
        Self {
            partner_email: record.partner_email.clone(),
            display_name: resolve_name(&record.partner_email, known, Some(record)),
            partner_avatar: record
                .partner_avatar
                .clone()
                .or_else(|| known.and_then(|u| u.profile_pic.clone())),
            preview: preview(record.last_message()),
            last_timestamp: record.last_timestamp(),
            message_count: record.messages.len(),
        }
    }
}

/// Name to show for `email`.
///
/// Precedence: the directory's name, then the record's `partner_name`, then
/// the email itself, then [`UNKNOWN_USER`].
pub fn resolve_name(email: &str, known: Option<&User>, record: Option<&ConversationRecord>) -> String {
    let email = email.trim();
    if let Some(user) = known {
        if !is_placeholder_name(&user.name, email) {
            return user.name.trim().to_string();
        }
    }
    if let Some(record) = record {
        if !record.partner_name.trim().is_empty() {
            return record.partner_name.trim().to_string();
        }
    }
    if email.is_empty() {
        UNKNOWN_USER.to_string()
    } else {
        email.to_string()
    }
}

/// One-line preview of the latest message.
pub fn preview(last: Option<&Message>) -> String {
    let Some(message) = last else {
        return NO_MESSAGES.to_string();
    };
    match message.kind {
        MessageKind::Image => "📷 Image".to_string(),
        MessageKind::Video => "🎥 Video".to_string(),
        MessageKind::Audio => "🎤 Voice message".to_string(),
        MessageKind::Text | MessageKind::Other(_) => {
            message.content.chars().take(PREVIEW_CHARS).collect()
        }
    }
}
