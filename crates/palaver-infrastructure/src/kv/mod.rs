//! Key-value substrate backends and JSON helpers.

mod file;
mod memory;

pub use file::FileKeyValueStore;
pub use memory::MemoryKeyValueStore;

use palaver_core::error::Result;
use palaver_core::storage::KeyValueStore;
use serde::Serialize;
use serde_json::Value;

/// Reads `key` as JSON.
///
/// Absent keys, blank values and malformed JSON all read as `None`; the
/// last case is logged since it usually means a torn write from an earlier
/// session.
pub fn read_json(kv: &dyn KeyValueStore, key: &str) -> Result<Option<Value>> {
    Ok(kv.get(key)?.and_then(|raw| parse_json(key, &raw)))
}

/// Parses a raw value read from `key` with the same leniency as [`read_json`].
pub fn parse_json(key: &str, raw: &str) -> Option<Value> {
    if raw.trim().is_empty() {
        return None;
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Null) => None,
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(key, error = %e, "Ignoring malformed JSON in storage");
            None
        }
    }
}

/// Serializes `value` and stores it under `key`.
pub fn write_json<T: Serialize + ?Sized>(kv: &dyn KeyValueStore, key: &str, value: &T) -> Result<()> {
    let raw = serde_json::to_string(value)?;
    kv.set(key, &raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_json_tolerates_garbage() {
        let kv = MemoryKeyValueStore::new();
        kv.set("broken", "{\"half\": [1, 2").unwrap();
        kv.set("blank", "   ").unwrap();
        kv.set("null", "null").unwrap();
        assert_eq!(read_json(&kv, "broken").unwrap(), None);
        assert_eq!(read_json(&kv, "blank").unwrap(), None);
        assert_eq!(read_json(&kv, "null").unwrap(), None);
        assert_eq!(read_json(&kv, "missing").unwrap(), None);
    }

    #[test]
    fn test_write_then_read() {
        let kv = MemoryKeyValueStore::new();
        write_json(&kv, "k", &serde_json::json!({"a": 1})).unwrap();
        assert_eq!(
            read_json(&kv, "k").unwrap(),
            Some(serde_json::json!({"a": 1}))
        );
    }
}
