//! Structural detection of stored conversation shapes.

use super::generation::SchemaGeneration;
use super::per_owner::{CanonicalMigration, InlineThreadsMigration, OwnerMapMigration};
use super::shared::{SharedArrayMigration, SharedMapMigration, UserMapMigration};
use super::traits::{Decoded, TypedMigration};
use crate::dto::is_canonical_entry;
use anyhow::Result;
use serde_json::{Map, Value};

/// A stored conversation payload, tagged with the generation it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub enum LegacySchema {
    Canonical(Vec<Value>),
    SharedArray(Vec<Value>),
    SharedMap(Map<String, Value>),
    UserMap {
        current_user: Option<String>,
        conversations: Map<String, Value>,
    },
    InlineThreads(Vec<Value>),
    OwnerMap(Map<String, Value>),
    /// List entries that match no generation, by count.
    Malformed(usize),
    Unrecognized,
}

/// Who is migrating, and the clock used for messages without a timestamp.
#[derive(Debug, Clone, Copy)]
pub struct DecodeContext<'a> {
    pub owner_email: &'a str,
    /// Signed-in user, used by per-user maps that do not name their user.
    pub session_email: Option<&'a str>,
    pub now_millis: i64,
}

/// Recognizes the shape of a stored conversation payload.
///
/// Arrays are split entry by entry, so one value can yield several parts:
///
/// - `{with, chat}` entries → inline threads
/// - entries naming a partner → canonical
/// - entries with a `key` or `participants` → shared array
/// - anything else (nulls, scalars, bare objects) → malformed, skipped
///
/// An empty array is an empty canonical list. Objects yield one part:
///
/// - object with a `conversations` object → per-user map when it names a
///   `currentUser` or every entry is a message array, shared map otherwise
/// - object whose values are all objects → owner-keyed map
pub fn detect(raw: &Value) -> Vec<LegacySchema> {
    match raw {
        Value::Array(items) => split_list(items),
        Value::Object(obj) => vec![detect_object(obj)],
        _ => vec![LegacySchema::Unrecognized],
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListEntry {
    Canonical,
    Inline,
    Shared,
    Malformed,
}

fn classify(entry: &Value) -> ListEntry {
    let Some(obj) = entry.as_object() else {
        return ListEntry::Malformed;
    };
    if obj.get("with").is_some_and(Value::is_string) {
        ListEntry::Inline
    } else if is_canonical_entry(entry) {
        ListEntry::Canonical
    } else if obj.get("key").is_some_and(Value::is_string)
        || obj.get("participants").is_some_and(Value::is_array)
    {
        ListEntry::Shared
    } else {
        ListEntry::Malformed
    }
}

/// Partitions a stored list; canonical entries come first so their
/// metadata wins when a partner shows up in more than one part.
fn split_list(items: &[Value]) -> Vec<LegacySchema> {
    if items.is_empty() {
        return vec![LegacySchema::Canonical(Vec::new())];
    }

    let mut canonical = Vec::new();
    let mut inline = Vec::new();
    let mut shared = Vec::new();
    let mut malformed = 0;
    for item in items {
        match classify(item) {
            ListEntry::Canonical => canonical.push(item.clone()),
            ListEntry::Inline => inline.push(item.clone()),
            ListEntry::Shared => shared.push(item.clone()),
            ListEntry::Malformed => malformed += 1,
        }
    }

    let mut parts = Vec::new();
    if !canonical.is_empty() {
        parts.push(LegacySchema::Canonical(canonical));
    }
    if !inline.is_empty() {
        parts.push(LegacySchema::InlineThreads(inline));
    }
    if !shared.is_empty() {
        parts.push(LegacySchema::SharedArray(shared));
    }
    if malformed > 0 {
        parts.push(LegacySchema::Malformed(malformed));
    }
    parts
}

fn detect_object(obj: &Map<String, Value>) -> LegacySchema {
    if let Some(Value::Object(conversations)) = obj.get("conversations") {
        let current_user = obj
            .get("currentUser")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .map(str::to_string);
        let all_threads = !conversations.is_empty() && conversations.values().all(Value::is_array);
        if obj.contains_key("currentUser") || all_threads {
            LegacySchema::UserMap {
                current_user,
                conversations: conversations.clone(),
            }
        } else {
            LegacySchema::SharedMap(conversations.clone())
        }
    } else if !obj.is_empty() && obj.values().all(Value::is_object) {
        LegacySchema::OwnerMap(obj.clone())
    } else {
        LegacySchema::Unrecognized
    }
}

impl LegacySchema {
    pub fn generation(&self) -> Option<SchemaGeneration> {
        match self {
            LegacySchema::Canonical(_) => Some(SchemaGeneration::Canonical),
            LegacySchema::SharedArray(_) => Some(SchemaGeneration::SharedArray),
            LegacySchema::SharedMap(_) => Some(SchemaGeneration::SharedMap),
            LegacySchema::UserMap { .. } => Some(SchemaGeneration::UserMap),
            LegacySchema::InlineThreads(_) => Some(SchemaGeneration::InlineThreads),
            LegacySchema::OwnerMap(_) => Some(SchemaGeneration::OwnerMap),
            LegacySchema::Malformed(_) | LegacySchema::Unrecognized => None,
        }
    }

    /// Runs the decoder for this generation.
    pub fn decode(self, ctx: &DecodeContext<'_>) -> Result<Decoded> {
        let owner = ctx.owner_email;
        let now = ctx.now_millis;
        match self {
            LegacySchema::Canonical(items) => run(CanonicalMigration::new(now), items),
            LegacySchema::SharedArray(items) => run(SharedArrayMigration::new(owner, now), items),
            LegacySchema::SharedMap(map) => run(SharedMapMigration::new(owner, now), map),
            LegacySchema::UserMap {
                current_user,
                conversations,
            } => {
                let user = current_user
                    .as_deref()
                    .or(ctx.session_email)
                    .unwrap_or(owner);
                run(UserMapMigration::new(owner, user, now), conversations)
            }
            LegacySchema::InlineThreads(items) => {
                run(InlineThreadsMigration::new(now), items)
            }
            LegacySchema::OwnerMap(map) => run(OwnerMapMigration::new(owner, now), map),
            LegacySchema::Malformed(_) | LegacySchema::Unrecognized => Ok(Decoded::default()),
        }
    }
}

fn run<P, M>(migration: M, payload: P) -> Result<Decoded>
where
    M: TypedMigration<P, Decoded>,
{
    tracing::debug!(
        migration = migration.description(),
        from = %migration.from_version(),
        to = %migration.to_version(),
        "Running decoder"
    );
    migration.migrate(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn generation_of(raw: Value) -> Option<SchemaGeneration> {
        let parts = detect(&raw);
        assert_eq!(parts.len(), 1, "expected a single part for {raw}");
        parts[0].generation()
    }

    #[test]
    fn test_detects_every_generation() {
        assert_eq!(
            generation_of(json!([{"key": "a::b", "participants": ["a", "b"], "messages": []}])),
            Some(SchemaGeneration::SharedArray)
        );
        assert_eq!(
            generation_of(json!({"conversations": {"a::b": {"participants": ["a", "b"]}}})),
            Some(SchemaGeneration::SharedMap)
        );
        assert_eq!(
            generation_of(json!({"currentUser": "a", "conversations": {"b": []}})),
            Some(SchemaGeneration::UserMap)
        );
        assert_eq!(
            generation_of(json!([{"with": "b", "chat": []}])),
            Some(SchemaGeneration::InlineThreads)
        );
        assert_eq!(
            generation_of(json!({"a": {"b": {"messages": []}}})),
            Some(SchemaGeneration::OwnerMap)
        );
        assert_eq!(
            generation_of(json!([{"partnerEmail": "b", "partnerName": "b", "messages": []}])),
            Some(SchemaGeneration::Canonical)
        );
    }

    #[test]
    fn test_empty_list_is_canonical() {
        assert_eq!(generation_of(json!([])), Some(SchemaGeneration::Canonical));
    }

    #[test]
    fn test_entry_without_messages_stays_canonical() {
        let raw = json!([
            {"partnerEmail": "b", "partnerName": "Bob", "messages": [{"sender": "b", "content": "hi", "timestamp": 1}]},
            {"partnerEmail": "c", "partnerName": "Cy"}
        ]);
        assert_eq!(generation_of(raw), Some(SchemaGeneration::Canonical));
    }

    #[test]
    fn test_mixed_list_is_split_per_entry() {
        let raw = json!([
            {"partnerEmail": "b", "messages": []},
            null,
            {"key": "a::c", "participants": ["a", "c"], "messages": []},
            {"with": "d", "chat": []},
            "stray",
            {"partnerEmail": "e"}
        ]);
        let parts = detect(&raw);
        assert_eq!(parts.len(), 4);
        match &parts[0] {
            LegacySchema::Canonical(items) => assert_eq!(items.len(), 2),
            other => panic!("Expected canonical part first, got {other:?}"),
        }
        assert_eq!(parts[1].generation(), Some(SchemaGeneration::InlineThreads));
        assert_eq!(parts[2].generation(), Some(SchemaGeneration::SharedArray));
        assert_eq!(parts[3], LegacySchema::Malformed(2));
    }

    #[test]
    fn test_mixed_list_keeps_canonical_history() {
        let raw = json!([
            {"partnerEmail": "b", "partnerName": "Bob", "messages": [{"sender": "b", "content": "hi", "timestamp": 1}]},
            {"partnerEmail": "c", "partnerName": "Cy"},
            null
        ]);
        let ctx = DecodeContext {
            owner_email: "a",
            session_email: None,
            now_millis: 1,
        };
        let records: Vec<_> = detect(&raw)
            .into_iter()
            .flat_map(|part| part.decode(&ctx).unwrap().records)
            .collect();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].partner_email, "b");
        assert_eq!(records[0].messages[0].content, "hi");
        assert_eq!(records[1].partner_email, "c");
        assert!(records[1].messages.is_empty());
    }

    #[test]
    fn test_user_map_without_current_user() {
        assert_eq!(
            generation_of(json!({"conversations": {"b": [{"from": "a"}]}})),
            Some(SchemaGeneration::UserMap)
        );
    }

    #[test]
    fn test_unrecognized_shapes() {
        assert_eq!(generation_of(json!("text")), None);
        assert_eq!(generation_of(json!(12)), None);
        assert_eq!(generation_of(json!({})), None);
        assert_eq!(generation_of(json!({"a": 1})), None);
    }
}
