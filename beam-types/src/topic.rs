use crate::key::Key;
use crate::status::Status;
use crate::webhook::WebhookConfig;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Webhook list is capped at roughly ten entries; enforced loosely (a soft cap,
/// not a hard validation failure) since the reference never rejects past it.
pub const WEBHOOKS_SOFT_CAP: usize = 10;

/// Parses the `<tenant>` segment out of `(persistent|non-persistent)://<tenant>/<namespace>/<name>`.
///
/// This, not the posted `Tenant` field, is the authority tenant-scoping checks
/// authorize against: `Tenant` is informational (§3) and may be absent on a
/// create, while the topic name's tenant segment is always present.
pub fn tenant_from_topic_full_name(topic_full_name: &str) -> Option<&str> {
    let rest = topic_full_name
        .strip_prefix("persistent://")
        .or_else(|| topic_full_name.strip_prefix("non-persistent://"))?;
    rest.split('/').next().filter(|s| !s.is_empty())
}

/// The durable control record: one Pulsar topic and the webhooks attached to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TopicConfig {
    pub topic_full_name: String,
    pub pulsar_url: String,
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub tenant: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub key: String,
    pub topic_status: Status,
    #[serde(default)]
    pub webhooks: Vec<WebhookConfig>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl TopicConfig {
    /// The content-hash key of this record, recomputed from its identifying fields.
    pub fn compute_key(&self) -> Key {
        Key::new(&self.topic_full_name, &self.pulsar_url)
    }

    /// Merge the mutable fields of `incoming` onto `self`, bump `UpdatedAt`, and
    /// leave `Key`/`CreatedAt` untouched: an upsert merges field-by-field rather
    /// than overwriting the stored record wholesale.
    pub fn merge_mutable_fields(&mut self, incoming: &TopicConfig, now: DateTime<Utc>) {
        self.token = incoming.token.clone();
        self.tenant = incoming.tenant.clone();
        self.notes = incoming.notes.clone();
        self.topic_status = incoming.topic_status;
        self.webhooks = incoming.webhooks.clone();
        self.updated_at = now;
    }

    /// Activated webhooks on a non-deleted topic, i.e. the ones that should have
    /// a live `WebhookWorker`.
    pub fn activated_webhooks(&self) -> impl Iterator<Item = &WebhookConfig> {
        let topic_visible = !self.topic_status.is_deleted();
        self.webhooks
            .iter()
            .filter(move |w| topic_visible && w.webhook_status.is_activated())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::webhook::{InitialPosition, SubscriptionType};

    fn sample() -> TopicConfig {
        TopicConfig {
            topic_full_name: "persistent://t/n/a".into(),
            pulsar_url: "pulsar://h:6650".into(),
            token: "secret".into(),
            tenant: "t".into(),
            notes: String::new(),
            key: Key::new("persistent://t/n/a", "pulsar://h:6650").to_string(),
            topic_status: Status::Activated,
            webhooks: vec![WebhookConfig {
                url: "http://sink/".into(),
                headers: vec![],
                subscription: "sub-a".into(),
                subscription_type: SubscriptionType::Shared,
                initial_position: InitialPosition::Latest,
                webhook_status: Status::Activated,
                created_at: Utc::now(),
                updated_at: Utc::now(),
                deleted_at: None,
            }],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn merge_keeps_key_and_created_at() {
        let original = sample();
        let mut stored = original.clone();
        let mut incoming = original.clone();
        incoming.notes = "updated".into();
        incoming.topic_status = Status::Suspended;
        let before_created = stored.created_at;
        let before_key = stored.key.clone();

        stored.merge_mutable_fields(&incoming, Utc::now());

        assert_eq!(stored.notes, "updated");
        assert_eq!(stored.topic_status, Status::Suspended);
        assert_eq!(stored.created_at, before_created);
        assert_eq!(stored.key, before_key);
    }

    #[test]
    fn activated_webhooks_excludes_deleted_topics() {
        let mut cfg = sample();
        assert_eq!(cfg.activated_webhooks().count(), 1);
        cfg.topic_status = Status::Deleted;
        assert_eq!(cfg.activated_webhooks().count(), 0);
    }

    #[test]
    fn tenant_is_parsed_from_persistent_topic_name() {
        assert_eq!(
            tenant_from_topic_full_name("persistent://t/n/x"),
            Some("t")
        );
        assert_eq!(
            tenant_from_topic_full_name("non-persistent://other/n/x"),
            Some("other")
        );
    }

    #[test]
    fn tenant_parse_rejects_malformed_names() {
        assert_eq!(tenant_from_topic_full_name("not-a-topic-name"), None);
        assert_eq!(tenant_from_topic_full_name("persistent:///n/x"), None);
    }
}
