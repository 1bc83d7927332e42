//! Notification sink that appends to the `notifications` key.

use crate::keys;
use crate::kv::{read_json, write_json};
use chrono::{SecondsFormat, Utc};
use palaver_core::error::Result;
use palaver_core::notification::{Notification, NotificationKind, NotificationSink};
use palaver_core::storage::KeyValueStore;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// Stored shape of one notification.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NotificationRecordDto<'a> {
    id: i64,
    user_email: &'a str,
    #[serde(rename = "type")]
    kind: NotificationKind,
    title: &'a str,
    details: &'a str,
    timestamp: String,
    read: bool,
}

#[derive(Clone)]
pub struct KvNotificationSink {
    kv: Arc<dyn KeyValueStore>,
}

impl std::fmt::Debug for KvNotificationSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KvNotificationSink")
            .field("kv", &"<dyn KeyValueStore>")
            .finish()
    }
}

impl KvNotificationSink {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }
}

impl NotificationSink for KvNotificationSink {
    fn notify(&self, notification: Notification) -> Result<()> {
        let mut log = match read_json(self.kv.as_ref(), keys::NOTIFICATIONS)? {
            Some(Value::Array(entries)) => entries,
            Some(_) => {
                tracing::warn!("Replacing `notifications` value that is not a list");
                Vec::new()
            }
            None => Vec::new(),
        };

        let now = Utc::now();
        // Ids are creation millis; keep them increasing within one burst.
        let last_id = log.iter().filter_map(|e| e.get("id")?.as_i64()).max();
        let id = match last_id {
            Some(last) if last >= now.timestamp_millis() => last + 1,
            _ => now.timestamp_millis(),
        };

        let record = NotificationRecordDto {
            id,
            user_email: &notification.recipient_email,
            kind: notification.kind,
            title: &notification.title,
            details: &notification.details,
            timestamp: now.to_rfc3339_opts(SecondsFormat::Millis, true),
            read: false,
        };
        log.push(serde_json::to_value(&record)?);
        write_json(self.kv.as_ref(), keys::NOTIFICATIONS, &log)?;

        tracing::debug!(recipient = %notification.recipient_email, id, "Stored notification");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryKeyValueStore;

    fn notification(recipient: &str) -> Notification {
        Notification {
            recipient_email: recipient.to_string(),
            kind: NotificationKind::Message,
            title: "New Message".to_string(),
            details: "Alice sent you a message.".to_string(),
        }
    }

    fn stored(kv: &MemoryKeyValueStore) -> Vec<Value> {
        serde_json::from_str(&kv.get(keys::NOTIFICATIONS).unwrap().unwrap()).unwrap()
    }

    #[test]
    fn test_appends_record() {
        let kv = MemoryKeyValueStore::new();
        let sink = KvNotificationSink::new(Arc::new(kv.clone()));
        sink.notify(notification("b@x")).unwrap();

        let log = stored(&kv);
        assert_eq!(log.len(), 1);
        assert_eq!(log[0]["userEmail"], "b@x");
        assert_eq!(log[0]["type"], "message");
        assert_eq!(log[0]["title"], "New Message");
        assert_eq!(log[0]["read"], false);
        assert!(log[0]["timestamp"].as_str().unwrap().ends_with('Z'));
    }

    #[test]
    fn test_ids_increase() {
        let kv = MemoryKeyValueStore::new();
        let sink = KvNotificationSink::new(Arc::new(kv.clone()));
        sink.notify(notification("b@x")).unwrap();
        sink.notify(notification("b@x")).unwrap();

        let log = stored(&kv);
        let first = log[0]["id"].as_i64().unwrap();
        let second = log[1]["id"].as_i64().unwrap();
        assert!(second > first);
    }

    #[test]
    fn test_keeps_existing_entries() {
        let kv = MemoryKeyValueStore::new();
        kv.set(keys::NOTIFICATIONS, r#"[{"id":1,"type":"sale","read":true}]"#).unwrap();
        let sink = KvNotificationSink::new(Arc::new(kv.clone()));
        sink.notify(notification("b@x")).unwrap();

        let log = stored(&kv);
        assert_eq!(log.len(), 2);
        assert_eq!(log[0]["type"], "sale");
    }
}
