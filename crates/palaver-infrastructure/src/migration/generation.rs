//! Schema generations of the conversation store.
//!
//! When adding a generation:
//! 1. Add a variant to `SchemaGeneration`
//! 2. Add it to `SchemaGeneration::all()`
//! 3. Add match arms to `name()` and `version()`
//!
//! The compiler will ensure all steps are completed through exhaustive matching.

use semver::Version;
use std::fmt;

/// Every on-disk shape conversation data has had, oldest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SchemaGeneration {
    /// Global flat array of shared two-party records.
    SharedArray,
    /// Global `{conversations: {key: sharedRecord}}` map.
    SharedMap,
    /// Per-user `{currentUser, conversations: {partner: [message]}}` map.
    UserMap,
    /// Threads embedded in the user record as `messages: [{with, chat}]`.
    InlineThreads,
    /// Global map keyed by owner email, then partner email.
    OwnerMap,
    /// Current per-owner list.
    Canonical,
}

impl SchemaGeneration {
    /// Returns all generations, oldest first.
    pub const fn all() -> &'static [SchemaGeneration] {
        &[
            SchemaGeneration::SharedArray,
            SchemaGeneration::SharedMap,
            SchemaGeneration::UserMap,
            SchemaGeneration::InlineThreads,
            SchemaGeneration::OwnerMap,
            SchemaGeneration::Canonical,
        ]
    }

    pub const fn name(&self) -> &'static str {
        match self {
            SchemaGeneration::SharedArray => "shared-array",
            SchemaGeneration::SharedMap => "shared-map",
            SchemaGeneration::UserMap => "user-map",
            SchemaGeneration::InlineThreads => "inline-threads",
            SchemaGeneration::OwnerMap => "owner-map",
            SchemaGeneration::Canonical => "canonical",
        }
    }

    /// Schema version assigned to this generation after the fact.
    pub const fn version(&self) -> Version {
        match self {
            SchemaGeneration::SharedArray => Version::new(1, 0, 0),
            SchemaGeneration::SharedMap => Version::new(1, 1, 0),
            SchemaGeneration::UserMap => Version::new(1, 2, 0),
            SchemaGeneration::InlineThreads => Version::new(2, 0, 0),
            SchemaGeneration::OwnerMap => Version::new(2, 1, 0),
            SchemaGeneration::Canonical => Version::new(3, 0, 0),
        }
    }

    /// Whether records of this generation are shared between both
    /// participants rather than owned by one of them.
    pub const fn is_shared(&self) -> bool {
        matches!(
            self,
            SchemaGeneration::SharedArray | SchemaGeneration::SharedMap | SchemaGeneration::UserMap
        )
    }
}

impl fmt::Display for SchemaGeneration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.version())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_versions_increase_with_age() {
        let versions: Vec<Version> = SchemaGeneration::all().iter().map(|g| g.version()).collect();
        let mut sorted = versions.clone();
        sorted.sort();
        assert_eq!(versions, sorted);
        assert_eq!(SchemaGeneration::all().last(), Some(&SchemaGeneration::Canonical));
    }

    #[test]
    fn test_display() {
        assert_eq!(SchemaGeneration::SharedMap.to_string(), "shared-map (1.1.0)");
    }
}
