//! Core traits for the migration framework.
//!
//! Each historical schema has one decoder. A decoder knows which generation
//! it reads and turns that generation's payload into canonical records for a
//! single owner.

use super::generation::SchemaGeneration;
use anyhow::Result;
use palaver_core::conversation::ConversationRecord;
use semver::Version;

/// Base trait for all migrations.
///
/// Provides version information and metadata about a migration step.
pub trait Migration: Send + Sync {
    /// The generation this migration reads.
    fn generation(&self) -> SchemaGeneration;

    /// Returns the source version this migration starts from.
    fn from_version(&self) -> Version {
        self.generation().version()
    }

    /// Returns the target version this migration produces.
    fn to_version(&self) -> Version {
        SchemaGeneration::Canonical.version()
    }

    /// Checks if this migration can be applied to the given version.
    fn can_migrate(&self, version: &Version) -> bool {
        version == &self.from_version()
    }

    /// Returns a human-readable description of this migration.
    ///
    /// Used for logging and debugging purposes.
    fn description(&self) -> &str;
}

/// Typed migration that transforms data from one version to another.
pub trait TypedMigration<From, To>: Migration + std::fmt::Debug {
    /// Executes the migration.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload as a whole is unusable. Individual
    /// unreadable entries are skipped and logged instead.
    fn migrate(&self, from: From) -> Result<To>;
}

/// A profile fact recovered from legacy data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LearnedProfile {
    pub email: String,
    pub name: Option<String>,
    pub avatar: Option<String>,
}

/// What a decoder recovered from one legacy source for one owner.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Decoded {
    pub records: Vec<ConversationRecord>,
    pub profiles: Vec<LearnedProfile>,
}

impl Decoded {
    pub fn message_count(&self) -> usize {
        self.records.iter().map(|r| r.messages.len()).sum()
    }
}
