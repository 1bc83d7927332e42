//! Infrastructure layer for palaver.
//!
//! Implements the domain traits on top of an untyped key-value substrate:
//! in-memory and file-backed backends, the legacy-schema DTOs and migrator,
//! and the key-value-backed conversation store, user directory and
//! notification sink. Also resolves paths and loads configuration.

pub mod config_service;
pub mod conversation_store;
pub mod dto;
pub mod keys;
pub mod kv;
pub mod migration;
pub mod normalizer;
pub mod notification_sink;
pub mod paths;
pub mod user_directory;

pub use crate::config_service::ConfigService;
pub use crate::conversation_store::KvConversationStore;
pub use crate::kv::{FileKeyValueStore, MemoryKeyValueStore};
pub use crate::migration::{MigrationReport, SchemaMigrator};
pub use crate::notification_sink::KvNotificationSink;
pub use crate::paths::PalaverPaths;
pub use crate::user_directory::KvUserDirectory;
