//! Message normalizer.
//!
//! The single translation boundary between historical message shapes and
//! the canonical [`Message`]. Field aliases accepted, first non-empty wins:
//!
//! | canonical     | accepted                              |
//! |---------------|---------------------------------------|
//! | `sender`      | `sender`, `from`, `author`            |
//! | `content`     | `content`, `text`, `src`, `value`     |
//! | `type`        | `type` (`photo` → image, `voice` → audio, missing → text) |
//! | `timestamp`   | `timestamp` (missing or zero → now)   |
//! | `displayTime` | `displayTime`, `time`                 |
//! | `id`          | `id` (missing → timestamp)            |
//!
//! Normalizing an already canonical message returns it unchanged.

use chrono::Utc;
use palaver_core::message::{Message, MessageKind};
use serde_json::{Map, Value};

const SENDER_FIELDS: &[&str] = &["sender", "from", "author"];
const CONTENT_FIELDS: &[&str] = &["content", "text", "src", "value"];
const DISPLAY_TIME_FIELDS: &[&str] = &["displayTime", "time"];

/// Normalizes `raw`, stamping missing timestamps with the current time.
pub fn normalize(raw: &Value) -> Message {
    normalize_at(raw, Utc::now().timestamp_millis())
}

/// Normalizes `raw`, stamping missing timestamps with `now_millis`.
///
/// Total: a value that is not an object still yields a message. A bare
/// string becomes the content of a text message.
pub fn normalize_at(raw: &Value, now_millis: i64) -> Message {
    let empty = Map::new();
    let (obj, bare_content) = match raw {
        Value::Object(obj) => (obj, None),
        Value::String(s) => (&empty, Some(s.clone())),
        _ => (&empty, None),
    };

    let timestamp = obj
        .get("timestamp")
        .and_then(as_millis)
        .filter(|t| *t != 0)
        .unwrap_or(now_millis);

    let id = obj
        .get("id")
        .and_then(as_millis)
        .filter(|id| *id != 0)
        .unwrap_or(timestamp);

    let kind = MessageKind::from_legacy(obj.get("type").and_then(Value::as_str));

    Message {
        id,
        sender: first_text(obj, SENDER_FIELDS).unwrap_or_default(),
        kind,
        content: bare_content
            .or_else(|| first_text(obj, CONTENT_FIELDS))
            .unwrap_or_default(),
        timestamp,
        display_time: first_text(obj, DISPLAY_TIME_FIELDS),
    }
}

/// Normalizes every element of a JSON array; anything else yields nothing.
pub fn normalize_all_at(raw: Option<&Value>, now_millis: i64) -> Vec<Message> {
    raw.and_then(Value::as_array)
        .map(|items| items.iter().map(|m| normalize_at(m, now_millis)).collect())
        .unwrap_or_default()
}

fn first_text(obj: &Map<String, Value>, fields: &[&str]) -> Option<String> {
    fields.iter().find_map(|field| match obj.get(*field)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn as_millis(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const NOW: i64 = 1_700_000_000_000;

    #[test]
    fn test_legacy_aliases() {
        let message = normalize_at(
            &json!({"from": "a", "text": "hi", "timestamp": 100, "time": "10:02"}),
            NOW,
        );
        assert_eq!(message.sender, "a");
        assert_eq!(message.content, "hi");
        assert_eq!(message.kind, MessageKind::Text);
        assert_eq!(message.timestamp, 100);
        assert_eq!(message.id, 100);
        assert_eq!(message.display_time.as_deref(), Some("10:02"));
    }

    #[test]
    fn test_author_and_src_aliases() {
        let message = normalize_at(
            &json!({"author": "b", "src": "data:image/png;base64,AA", "type": "photo", "timestamp": 7}),
            NOW,
        );
        assert_eq!(message.sender, "b");
        assert_eq!(message.content, "data:image/png;base64,AA");
        assert_eq!(message.kind, MessageKind::Image);
    }

    #[test]
    fn test_voice_maps_to_audio() {
        let message = normalize_at(&json!({"from": "a", "type": "voice", "value": "Voice message"}), NOW);
        assert_eq!(message.kind, MessageKind::Audio);
        assert_eq!(message.content, "Voice message");
    }

    #[test]
    fn test_missing_timestamp_defaults_to_now() {
        let message = normalize_at(&json!({"from": "a", "text": "hi"}), NOW);
        assert_eq!(message.timestamp, NOW);
        assert_eq!(message.id, NOW);
    }

    #[test]
    fn test_empty_alias_falls_through() {
        let message = normalize_at(&json!({"content": "", "text": "fallback", "timestamp": 1}), NOW);
        assert_eq!(message.content, "fallback");
    }

    #[test]
    fn test_total_on_garbage() {
        let message = normalize_at(&json!(42), NOW);
        assert_eq!(message.sender, "");
        assert_eq!(message.content, "");
        assert_eq!(message.timestamp, NOW);

        let message = normalize_at(&json!("just text"), NOW);
        assert_eq!(message.content, "just text");
        assert_eq!(message.kind, MessageKind::Text);
    }

    #[test]
    fn test_canonical_message_is_fixed_point() {
        let canonical = Message {
            id: 55,
            sender: "a".to_string(),
            kind: MessageKind::Video,
            content: "data:video/mp4;base64,AA".to_string(),
            timestamp: 60,
            display_time: Some("09:15".to_string()),
        };
        let raw = serde_json::to_value(&canonical).unwrap();
        assert_eq!(normalize_at(&raw, NOW), canonical);
    }

    #[test]
    fn test_unknown_type_is_kept() {
        let message = normalize_at(&json!({"type": "sticker", "timestamp": 1}), NOW);
        assert_eq!(message.kind, MessageKind::Other("sticker".to_string()));
    }

    #[test]
    fn test_float_and_string_timestamps() {
        assert_eq!(normalize_at(&json!({"timestamp": 12.9}), NOW).timestamp, 12);
        assert_eq!(normalize_at(&json!({"timestamp": "34"}), NOW).timestamp, 34);
    }
}
