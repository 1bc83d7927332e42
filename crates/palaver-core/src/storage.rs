//! Raw key-value substrate.
//!
//! The conversation store sits on an untyped string-to-string store with no
//! transactions and no locks, shared by every open window of the client.

use crate::error::Result;

/// Untyped string storage, one JSON document per key.
///
/// Implementations make each single `set` atomic. They do not and cannot
/// make a `get` followed by a `set` atomic: concurrent writers to the same
/// key lose updates, last write wins.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Removing an absent key is not an error.
    fn remove(&self, key: &str) -> Result<()>;

    /// All keys currently present, in ascending order.
    fn keys(&self) -> Result<Vec<String>>;
}
