use chrono::{DateTime, Local, TimeZone};
use palaver_application::ChatService;
use palaver_core::conversation::{ConversationRepository, MetaUpdate, WriteOutcome, conversation_key, split_key};
use palaver_core::error::PalaverError;
use palaver_core::message::{Message, MessageKind};
use palaver_core::notification::{Notification, NotificationKind, NotificationSink};
use palaver_core::storage::KeyValueStore;
use palaver_infrastructure::{FileKeyValueStore, MemoryKeyValueStore};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

#[derive(Default)]
struct RecordingSink {
    sent: Mutex<Vec<Notification>>,
}

impl RecordingSink {
    fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }
}

impl NotificationSink for RecordingSink {
    fn notify(&self, notification: Notification) -> palaver_core::Result<()> {
        self.sent.lock().unwrap().push(notification);
        Ok(())
    }
}

struct FailingSink;

impl NotificationSink for FailingSink {
    fn notify(&self, _notification: Notification) -> palaver_core::Result<()> {
        Err(PalaverError::io("notification channel closed"))
    }
}

fn at(millis: i64) -> DateTime<Local> {
    Local.timestamp_millis_opt(millis).unwrap()
}

fn service_with(sink: Arc<dyn NotificationSink>) -> (MemoryKeyValueStore, ChatService) {
    let kv = MemoryKeyValueStore::new();
    let service = ChatService::new(Arc::new(kv.clone()), sink);
    (kv, service)
}

#[test]
fn test_dual_write_symmetry() {
    let (_kv, service) = service_with(Arc::new(RecordingSink::default()));

    let (sent, _) = service
        .send_at("a@x", "b@x", MessageKind::Text, "first", at(100))
        .unwrap();
    let (reply, _) = service
        .send_at("b@x", "a@x", MessageKind::Text, "second", at(200))
        .unwrap();

    let a_side = service.conversation("a@x", "b@x").unwrap().unwrap();
    let b_side = service.conversation("b@x", "a@x").unwrap().unwrap();
    assert_eq!(a_side.messages, vec![sent.clone(), reply.clone()]);
    assert_eq!(b_side.messages, vec![sent, reply]);
}

#[test]
fn test_image_delivery_surfaces_for_recipient() {
    let (_kv, service) = service_with(Arc::new(RecordingSink::default()));

    let (_, delivery) = service
        .send_at("a", "b", MessageKind::Image, "data:image/png;base64,AA", at(500))
        .unwrap();
    assert_eq!(delivery.recipient_side, WriteOutcome::Appended);

    let list = service.store().list("b").unwrap();
    assert_eq!(list[0].partner_email, "a");
    let last = list[0].last_message().unwrap();
    assert_eq!(last.kind, MessageKind::Image);
    assert_eq!(last.timestamp, 500);

    let summaries = service.summaries("b").unwrap();
    assert_eq!(summaries[0].preview, "📷 Image");
}

#[test]
fn test_recipient_is_notified() {
    let sink = Arc::new(RecordingSink::default());
    let (_kv, service) = service_with(sink.clone());
    service.sign_in("a@x", Some("Alice"), None).unwrap();

    service
        .send_at("a@x", "b@x", MessageKind::Video, "data:video/mp4;base64,AA", at(1))
        .unwrap();

    let sent = sink.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].recipient_email, "b@x");
    assert_eq!(sent[0].kind, NotificationKind::Message);
    assert_eq!(sent[0].title, "New Message");
    assert_eq!(sent[0].details, "Alice sent you a video.");
}

#[test]
fn test_failed_notification_does_not_lose_message() {
    let (_kv, service) = service_with(Arc::new(FailingSink));
    let (message, delivery) = service
        .send_at("a@x", "b@x", MessageKind::Text, "still here", at(1))
        .unwrap();

    assert!(!delivery.notified);
    let b_side = service.conversation("b@x", "a@x").unwrap().unwrap();
    assert_eq!(b_side.messages, vec![message]);
}

#[test]
fn test_redelivery_after_partial_write_converges() {
    let (_kv, service) = service_with(Arc::new(RecordingSink::default()));
    let message = Message::compose("a@x", MessageKind::Text, "retry me", at(42));

    // Only the sender side made it before the interruption.
    service.store().append("a@x", "b@x", &message).unwrap();
    assert!(service.conversation("b@x", "a@x").unwrap().is_none());

    service
        .send_at("a@x", "b@x", MessageKind::Text, "retry me", at(42))
        .unwrap();
    assert_eq!(service.conversation("a@x", "b@x").unwrap().unwrap().messages.len(), 1);
    assert_eq!(
        service.conversation("b@x", "a@x").unwrap().unwrap().messages,
        vec![message]
    );
}

#[test]
fn test_metadata_is_first_write_wins() {
    let (_kv, service) = service_with(Arc::new(RecordingSink::default()));
    let store = service.store();

    store.upsert_meta("a@x", "b@x", &MetaUpdate::named("Bobby")).unwrap();
    store
        .upsert_meta("a@x", "b@x", &MetaUpdate::named("Robert").with_avatar("pic"))
        .unwrap();

    let record = store.get("a@x", "b@x").unwrap().unwrap();
    assert_eq!(record.partner_name, "Bobby");
    assert_eq!(record.partner_avatar.as_deref(), Some("pic"));
}

#[test]
fn test_open_chat_fills_placeholder_name() {
    let (_kv, service) = service_with(Arc::new(RecordingSink::default()));
    service
        .send_at("a@x", "b@x", MessageKind::Text, "hi", at(1))
        .unwrap();
    assert_eq!(service.conversation("a@x", "b@x").unwrap().unwrap().partner_name, "b@x");

    let record = service.open_chat("a@x", "b@x", Some("Bob")).unwrap().unwrap();
    assert_eq!(record.partner_name, "Bob");
    assert_eq!(service.summaries("a@x").unwrap()[0].display_name, "Bob");
}

#[test]
fn test_missing_identity_writes_nothing() {
    let (kv, service) = service_with(Arc::new(RecordingSink::default()));
    let (_, delivery) = service.send_at("", "b@x", MessageKind::Text, "hi", at(1)).unwrap();
    assert!(delivery.is_noop());
    assert!(kv.keys().unwrap().is_empty());
}

#[test]
fn test_key_is_commutative() {
    for (a, b) in [("a@x", "b@x"), ("zed@x", "amy@x"), ("same@x", "same@x")] {
        assert_eq!(conversation_key(a, b), conversation_key(b, a));
    }
    let key = conversation_key("b@x", "a@x");
    assert_eq!(split_key(&key), Some(("a@x".to_string(), "b@x".to_string())));
}

#[test]
fn test_file_backend_persists_across_handles() {
    let temp_dir = TempDir::new().unwrap();
    let sink = Arc::new(RecordingSink::default());

    {
        let kv = FileKeyValueStore::open(temp_dir.path()).unwrap();
        let service = ChatService::new(Arc::new(kv), sink.clone());
        service
            .send_at("a@x", "b@x", MessageKind::Text, "persisted", at(10))
            .unwrap();
    }

    let kv = FileKeyValueStore::open(temp_dir.path()).unwrap();
    let service = ChatService::new(Arc::new(kv), sink);
    let view = service.enter("b@x").unwrap();
    assert_eq!(view.conversations.len(), 1);
    assert_eq!(view.conversations[0].partner_email, "a@x");
    assert_eq!(view.conversations[0].preview, "persisted");
    assert!(!view.migration.persisted);
}
