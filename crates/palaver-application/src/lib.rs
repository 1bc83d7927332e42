//! Application layer for palaver.
//!
//! This crate provides the use cases that coordinate between the domain and
//! infrastructure layers: the dual-write replicator that keeps both
//! participants' copies of a conversation in step, and the chat-view flow
//! that migrates, opens pending chats and lists conversations.

pub mod chat_service;
pub mod replicator;
pub mod summary;

pub use chat_service::{ChatService, ChatView};
pub use replicator::{Delivery, DualWriteReplicator, new_message_notification};
pub use summary::{ConversationSummary, preview, resolve_name};
