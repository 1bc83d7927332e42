//! Chat-view use case.
//!
//! [`ChatService`] wires the key-value backed infrastructure together and
//! runs the flow every entry into the chat view goes through: migrate the
//! owner's data, honour a pending chat request left by another page, then
//! list the owner's conversations.

use crate::replicator::{Delivery, DualWriteReplicator};
use crate::summary::ConversationSummary;
use anyhow::Result;
use chrono::{DateTime, Local};
use palaver_core::config::PalaverConfig;
use palaver_core::conversation::{ConversationRecord, ConversationRepository, MetaUpdate};
use palaver_core::message::{Message, MessageKind};
use palaver_core::notification::{NotificationSink, NullNotificationSink};
use palaver_core::storage::KeyValueStore;
use palaver_core::user::{User, UserDirectory};
use palaver_infrastructure::keys;
use palaver_infrastructure::{
    KvConversationStore, KvNotificationSink, KvUserDirectory, MigrationReport, SchemaMigrator,
};
use serde::Deserialize;
use std::sync::Arc;

/// Metadata stored alongside a pending chat request.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PendingChatMeta {
    #[serde(default)]
    name: Option<String>,
    #[serde(default, alias = "profilePic")]
    avatar: Option<String>,
}

/// State of the chat view after entry.
#[derive(Debug, Clone)]
pub struct ChatView {
    pub owner_email: String,
    /// Partner whose conversation should open, from a pending chat request.
    pub active_partner: Option<String>,
    /// The owner's conversations, most recent activity first.
    pub conversations: Vec<ConversationSummary>,
    pub migration: MigrationReport,
}

/// Entry point of the application layer.
pub struct ChatService {
    /// Raw substrate, for the pending chat keys
    kv: Arc<dyn KeyValueStore>,
    /// Profiles and the signed-in user
    directory: Arc<KvUserDirectory>,
    /// Per-owner canonical conversation lists
    store: Arc<dyn ConversationRepository>,
    /// Legacy schema migrator run on every entry
    migrator: SchemaMigrator,
    /// Writes new messages into both participants' stores
    replicator: DualWriteReplicator,
}

impl std::fmt::Debug for ChatService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatService")
            .field("kv", &"<dyn KeyValueStore>")
            .field("directory", &self.directory)
            .field("store", &"<dyn ConversationRepository>")
            .field("replicator", &self.replicator)
            .finish()
    }
}

impl ChatService {
    /// Creates a service over `kv` that announces deliveries to `notifier`.
    ///
    /// # Arguments
    ///
    /// * `kv` - Key-value substrate holding every owner's data
    /// * `notifier` - Sink receiving new-message announcements
    pub fn new(kv: Arc<dyn KeyValueStore>, notifier: Arc<dyn NotificationSink>) -> Self {
        Self::build(kv, notifier, true)
    }

    /// Creates a service over `kv` configured by `config`.
    ///
    /// Announcements go to the `notifications` key when
    /// `notify_on_delivery` is set and are dropped otherwise.
    pub fn from_config(kv: Arc<dyn KeyValueStore>, config: &PalaverConfig) -> Self {
        let notifier: Arc<dyn NotificationSink> = if config.notify_on_delivery {
            Arc::new(KvNotificationSink::new(kv.clone()))
        } else {
            Arc::new(NullNotificationSink)
        };
        Self::build(kv, notifier, config.notify_on_delivery)
    }

    fn build(kv: Arc<dyn KeyValueStore>, notifier: Arc<dyn NotificationSink>, notify: bool) -> Self {
        let directory = Arc::new(KvUserDirectory::new(kv.clone()));
        let store: Arc<dyn ConversationRepository> =
            Arc::new(KvConversationStore::new(kv.clone(), directory.clone()));
        let migrator = SchemaMigrator::new(kv.clone(), directory.clone());
        let replicator = DualWriteReplicator::new(store.clone(), directory.clone(), notifier)
            .with_notifications(notify);
        Self {
            kv,
            directory,
            store,
            migrator,
            replicator,
        }
    }

    pub fn store(&self) -> &Arc<dyn ConversationRepository> {
        &self.store
    }

    pub fn current_user(&self) -> Result<Option<User>> {
        Ok(self.directory.current_user()?)
    }

    /// Records the signed-in user, learning any name or avatar given.
    pub fn sign_in(&self, email: &str, name: Option<&str>, avatar: Option<&str>) -> Result<User> {
        let email = email.trim();
        anyhow::ensure!(!email.is_empty(), "cannot sign in without an email");
        let mut user = User::new(email);
        user.fill_missing(name, avatar);
        Ok(self.directory.sign_in(&user)?)
    }

    pub fn migrate(&self, owner_email: &str) -> Result<MigrationReport> {
        Ok(self.migrator.migrate(owner_email)?)
    }

    /// Runs the chat-entry flow for `owner_email`.
    pub fn enter(&self, owner_email: &str) -> Result<ChatView> {
        let owner = owner_email.trim();
        tracing::info!(owner, "Entering chat view");

        let migration = self.migrate(owner)?;
        let active_partner = self.take_pending_chat(owner)?;
        let conversations = self.summaries(owner)?;

        Ok(ChatView {
            owner_email: owner.to_string(),
            active_partner,
            conversations,
            migration,
        })
    }

    /// Runs the chat-entry flow for the signed-in user, if any.
    pub fn enter_current(&self) -> Result<Option<ChatView>> {
        match self.current_user()? {
            Some(user) => Ok(Some(self.enter(&user.email)?)),
            None => {
                tracing::debug!("No signed-in user");
                Ok(None)
            }
        }
    }

    /// Chat-list rows for `owner_email`, ordered like the store's list.
    pub fn summaries(&self, owner_email: &str) -> Result<Vec<ConversationSummary>> {
        self.store
            .list(owner_email)?
            .iter()
            .map(|record| -> Result<ConversationSummary> {
                let known = self.directory.by_email(&record.partner_email)?;
                Ok(ConversationSummary::from_record(record, known.as_ref()))
            })
            .collect()
    }

    /// Name to show for `partner_email`, see [`summary::resolve_name`](crate::summary::resolve_name).
    pub fn resolve_name(&self, partner_email: &str, record: Option<&ConversationRecord>) -> Result<String> {
        let known = self.directory.by_email(partner_email)?;
        Ok(crate::summary::resolve_name(partner_email, known.as_ref(), record))
    }

    pub fn conversation(&self, owner_email: &str, partner_email: &str) -> Result<Option<ConversationRecord>> {
        Ok(self.store.get(owner_email, partner_email)?)
    }

    /// Migrates `owner_email`'s data, then reads one conversation.
    pub fn read_conversation(&self, owner_email: &str, partner_email: &str) -> Result<Option<ConversationRecord>> {
        self.migrate(owner_email)?;
        self.conversation(owner_email, partner_email)
    }

    /// Ensures `owner_email` has a conversation with `partner_email`.
    pub fn open_chat(
        &self,
        owner_email: &str,
        partner_email: &str,
        partner_name: Option<&str>,
    ) -> Result<Option<ConversationRecord>> {
        let update = MetaUpdate {
            name: partner_name.map(str::to_string),
            avatar: None,
        };
        Ok(self.store.upsert_meta(owner_email, partner_email, &update)?)
    }

    /// Composes a message stamped with the current time and delivers it.
    pub fn send(
        &self,
        sender_email: &str,
        recipient_email: &str,
        kind: MessageKind,
        content: &str,
    ) -> Result<(Message, Delivery)> {
        self.send_at(sender_email, recipient_email, kind, content, Local::now())
    }

    /// Like [`send`](Self::send), stamping the message with `now`.
    ///
    /// Both participants' data is migrated before the write, so legacy
    /// history is folded in ahead of the new message.
    pub fn send_at(
        &self,
        sender_email: &str,
        recipient_email: &str,
        kind: MessageKind,
        content: &str,
        now: DateTime<Local>,
    ) -> Result<(Message, Delivery)> {
        let (sender, recipient) = (sender_email.trim(), recipient_email.trim());
        if !sender.is_empty() && !recipient.is_empty() {
            self.migrate(sender)?;
            self.migrate(recipient)?;
        }

        let message = Message::compose(sender_email.trim(), kind, content, now);
        let delivery = self.replicator.deliver(sender_email, recipient_email, &message)?;
        Ok((message, delivery))
    }

    /// Consumes `openChatWith` / `openChatMeta`, returning the requested partner.
    fn take_pending_chat(&self, owner_email: &str) -> Result<Option<String>> {
        let Some(raw) = self.kv.get(keys::PENDING_CHAT_WITH)? else {
            return Ok(None);
        };
        // Written both bare and JSON-encoded.
        let partner = serde_json::from_str::<String>(&raw).unwrap_or(raw);
        let partner = partner.trim().to_string();

        let meta = match self.kv.get(keys::PENDING_CHAT_META)? {
            Some(raw) => serde_json::from_str::<PendingChatMeta>(&raw).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Ignoring malformed pending chat metadata");
                PendingChatMeta::default()
            }),
            None => PendingChatMeta::default(),
        };

        self.kv.remove(keys::PENDING_CHAT_WITH)?;
        self.kv.remove(keys::PENDING_CHAT_META)?;

        if partner.is_empty() || owner_email.trim().is_empty() {
            return Ok(None);
        }

        let update = MetaUpdate {
            name: meta.name,
            avatar: meta.avatar,
        };
        self.store.upsert_meta(owner_email, &partner, &update)?;
        tracing::debug!(owner = owner_email, partner = %partner, "Opened pending chat");
        Ok(Some(partner))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use palaver_infrastructure::MemoryKeyValueStore;
    use serde_json::{Value, json};

    fn service() -> (MemoryKeyValueStore, ChatService) {
        let kv = MemoryKeyValueStore::new();
        let service = ChatService::from_config(Arc::new(kv.clone()), &PalaverConfig::default());
        (kv, service)
    }

    fn at(millis: i64) -> DateTime<Local> {
        Local.timestamp_millis_opt(millis).unwrap()
    }

    #[test]
    fn test_enter_consumes_pending_chat() {
        let (kv, service) = service();
        kv.set(keys::PENDING_CHAT_WITH, "seller@x").unwrap();
        kv.set(keys::PENDING_CHAT_META, r#"{"name":"Seller","profilePic":"pic"}"#).unwrap();

        let view = service.enter("a@x").unwrap();
        assert_eq!(view.active_partner.as_deref(), Some("seller@x"));
        assert_eq!(view.conversations.len(), 1);
        assert_eq!(view.conversations[0].display_name, "Seller");
        assert_eq!(view.conversations[0].preview, "No messages");
        assert_eq!(kv.get(keys::PENDING_CHAT_WITH).unwrap(), None);
        assert_eq!(kv.get(keys::PENDING_CHAT_META).unwrap(), None);

        let record = service.conversation("a@x", "seller@x").unwrap().unwrap();
        assert_eq!(record.partner_avatar.as_deref(), Some("pic"));
    }

    #[test]
    fn test_pending_chat_without_meta_uses_email() {
        let (kv, service) = service();
        kv.set(keys::PENDING_CHAT_WITH, "\"seller@x\"").unwrap();
        let view = service.enter("a@x").unwrap();
        assert_eq!(view.active_partner.as_deref(), Some("seller@x"));
        assert_eq!(view.conversations[0].display_name, "seller@x");
    }

    #[test]
    fn test_enter_without_pending_chat() {
        let (_kv, service) = service();
        let view = service.enter("a@x").unwrap();
        assert_eq!(view.active_partner, None);
        assert!(view.conversations.is_empty());
    }

    #[test]
    fn test_enter_current_requires_session() {
        let (_kv, service) = service();
        assert!(service.enter_current().unwrap().is_none());

        service.sign_in("a@x", Some("Alice"), None).unwrap();
        let view = service.enter_current().unwrap().unwrap();
        assert_eq!(view.owner_email, "a@x");
    }

    #[test]
    fn test_send_composes_and_delivers() {
        let (kv, service) = service();
        service.sign_in("a@x", Some("Alice"), None).unwrap();

        let (message, delivery) = service
            .send_at("a@x", "b@x", MessageKind::Text, "hello", at(1_700_000_000_000))
            .unwrap();
        assert_eq!(message.id, 1_700_000_000_000);
        assert_eq!(message.timestamp, 1_700_000_000_000);
        assert!(message.display_time.is_some());
        assert!(delivery.notified);

        let summaries = service.summaries("b@x").unwrap();
        assert_eq!(summaries[0].partner_email, "a@x");
        assert_eq!(summaries[0].display_name, "Alice");
        assert_eq!(summaries[0].preview, "hello");

        let notifications: Value = serde_json::from_str(&kv.get(keys::NOTIFICATIONS).unwrap().unwrap()).unwrap();
        assert_eq!(notifications[0]["details"], "Alice sent you a message.");
    }

    #[test]
    fn test_notifications_disabled_by_config() {
        let kv = MemoryKeyValueStore::new();
        let config = PalaverConfig {
            notify_on_delivery: false,
            ..PalaverConfig::default()
        };
        let service = ChatService::from_config(Arc::new(kv.clone()), &config);
        let (_, delivery) = service.send("a@x", "b@x", MessageKind::Text, "hi").unwrap();
        assert!(!delivery.notified);
        assert_eq!(kv.get(keys::NOTIFICATIONS).unwrap(), None);
    }

    #[test]
    fn test_enter_migrates_legacy_data() {
        let (kv, service) = service();
        kv.set(
            keys::LEGACY_CONVERSATIONS,
            &json!([{
                "key": "a@x::b@x",
                "participants": ["a@x", "b@x"],
                "labels": {"b@x": "Bob"},
                "messages": [{"from": "b@x", "text": "old", "timestamp": 10}]
            }])
            .to_string(),
        )
        .unwrap();

        let view = service.enter("a@x").unwrap();
        assert!(view.migration.persisted);
        assert_eq!(view.conversations[0].display_name, "Bob");
        assert_eq!(view.conversations[0].preview, "old");
    }

    fn seed_global_thread(kv: &MemoryKeyValueStore) {
        kv.set(
            keys::LEGACY_CONVERSATIONS,
            &json!({"conversations": {"a@x::b@x": {
                "participants": ["a@x", "b@x"],
                "messages": [{"from": "b@x", "text": "legacy", "timestamp": 10}]
            }}})
            .to_string(),
        )
        .unwrap();
    }

    #[test]
    fn test_read_conversation_folds_in_global_store() {
        let (kv, service) = service();
        service
            .store()
            .upsert_meta("a@x", "b@x", &MetaUpdate::named("Bob"))
            .unwrap();
        seed_global_thread(&kv);

        assert!(service.conversation("a@x", "b@x").unwrap().unwrap().messages.is_empty());
        let record = service.read_conversation("a@x", "b@x").unwrap().unwrap();
        assert_eq!(record.partner_name, "Bob");
        assert_eq!(record.messages.len(), 1);
        assert_eq!(record.messages[0].content, "legacy");
    }

    #[test]
    fn test_send_migrates_both_participants_first() {
        let (kv, service) = service();
        seed_global_thread(&kv);

        service
            .send_at("a@x", "b@x", MessageKind::Text, "new", at(20))
            .unwrap();

        for (owner, partner) in [("a@x", "b@x"), ("b@x", "a@x")] {
            let record = service.conversation(owner, partner).unwrap().unwrap();
            let contents: Vec<&str> = record.messages.iter().map(|m| m.content.as_str()).collect();
            assert_eq!(contents, vec!["legacy", "new"]);
        }
    }

    #[test]
    fn test_sign_in_rejects_blank_email() {
        let (_kv, service) = service();
        assert!(service.sign_in("  ", None, None).is_err());
    }
}
