//! Schema migration for the per-owner conversation list.
//!
//! Conversation data has been stored under five historical shapes before the
//! current per-owner list. None of them carries a version tag, so the
//! migrator recognizes each by structure, decodes it for one owner, and folds
//! everything into the canonical list.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       SchemaMigrator                          │
//! │  reads: conversationList:<owner>, conversations, users        │
//! ├──────────────────────────────────────────────────────────────┤
//! │  detect() ──► LegacySchema parts ──► per-generation decoder   │
//! │                                 (TypedMigration → Decoded)    │
//! │  merge by partner, union messages by identity                 │
//! │  learn profile names into the user directory                  │
//! └──────────────────────────────────────────────────────────────┘
//!          │
//!          V
//!   conversationList:<owner>   (canonical, 3.0.0)
//! ```
//!
//! # Adding a new generation
//!
//! 1. Add a variant to `SchemaGeneration` and to `SchemaGeneration::all()`
//! 2. Add a `LegacySchema` variant and teach `detect()` to recognize it
//! 3. Implement `Migration` + `TypedMigration<_, Decoded>` for its decoder
//!
//! The exhaustive matches in `generation.rs` and `detect.rs` will not
//! compile until every step is done.

mod detect;
mod generation;
mod migrator;
mod per_owner;
mod shared;
mod traits;

pub use detect::{DecodeContext, LegacySchema, detect};
pub use generation::SchemaGeneration;
pub use migrator::{MigrationReport, SchemaMigrator};
pub use per_owner::{CanonicalMigration, InlineThreadsMigration, OwnerMapMigration};
pub use shared::{SharedArrayMigration, SharedMapMigration, UserMapMigration};
pub use traits::{Decoded, LearnedProfile, Migration, TypedMigration};
