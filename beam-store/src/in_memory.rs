use crate::store::Store;
use async_trait::async_trait;
use chrono::Utc;
use pulsar_beam_types::{Key, Status, StoreError, TopicConfig};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A plain in-memory `Store`, used by tests and by `PbDbType=inmemory`. It
/// honours the exact same CRUD/merge semantics as the compacted-log backend,
/// just without the publish/tail machinery.
#[derive(Default)]
pub struct InMemoryStore {
    records: RwLock<HashMap<String, TopicConfig>>,
}

impl InMemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(InMemoryStore::default())
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn get_by_topic_full_name(
        &self,
        topic_full_name: &str,
        pulsar_url: &str,
    ) -> Result<TopicConfig, StoreError> {
        let key = Key::new(topic_full_name, pulsar_url);
        self.get_by_key(&key).await
    }

    async fn get_by_key(&self, key: &Key) -> Result<TopicConfig, StoreError> {
        let records = self.records.read().await;
        records
            .get(key.as_str())
            .filter(|cfg| !cfg.topic_status.is_deleted())
            .cloned()
            .ok_or(StoreError::DocNotFound)
    }

    async fn create(&self, mut cfg: TopicConfig) -> Result<TopicConfig, StoreError> {
        let key = cfg.compute_key();
        let mut records = self.records.write().await;
        if records.contains_key(key.as_str()) {
            return Err(StoreError::DocAlreadyExisted);
        }
        let now = Utc::now();
        cfg.key = key.to_string();
        cfg.created_at = now;
        cfg.updated_at = now;
        records.insert(key.to_string(), cfg.clone());
        Ok(cfg)
    }

    async fn update(&self, cfg: TopicConfig) -> Result<TopicConfig, StoreError> {
        let key = cfg.compute_key();
        let mut records = self.records.write().await;
        match records.get(key.as_str()).cloned() {
            None => {
                drop(records);
                self.create(cfg).await
            }
            Some(mut stored) => {
                stored.merge_mutable_fields(&cfg, Utc::now());
                records.insert(key.to_string(), stored.clone());
                Ok(stored)
            }
        }
    }

    async fn delete(&self, topic_full_name: &str, pulsar_url: &str) -> Result<TopicConfig, StoreError> {
        let key = Key::new(topic_full_name, pulsar_url);
        self.delete_by_key(&key).await
    }

    async fn delete_by_key(&self, key: &Key) -> Result<TopicConfig, StoreError> {
        let mut records = self.records.write().await;
        let mut cfg = records.remove(key.as_str()).ok_or(StoreError::DocNotFound)?;
        cfg.topic_status = Status::Deleted;
        cfg.updated_at = Utc::now();
        Ok(cfg)
    }

    async fn load_all(&self) -> Result<Vec<TopicConfig>, StoreError> {
        let records = self.records.read().await;
        Ok(records
            .values()
            .filter(|cfg| !cfg.topic_status.is_deleted())
            .cloned()
            .collect())
    }

    async fn init(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn close(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn health(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulsar_beam_types::WebhookConfig;

    fn cfg(topic: &str, url: &str) -> TopicConfig {
        TopicConfig {
            topic_full_name: topic.into(),
            pulsar_url: url.into(),
            token: String::new(),
            tenant: "t".into(),
            notes: String::new(),
            key: String::new(),
            topic_status: Status::Activated,
            webhooks: vec![],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let store = InMemoryStore::new();
        let created = store.create(cfg("persistent://t/n/a", "pulsar://h:6650")).await.unwrap();
        let key = created.compute_key();
        let fetched = store.get_by_key(&key).await.unwrap();
        assert_eq!(fetched.topic_full_name, "persistent://t/n/a");
    }

    #[tokio::test]
    async fn create_twice_conflicts() {
        let store = InMemoryStore::new();
        store.create(cfg("persistent://t/n/a", "pulsar://h:6650")).await.unwrap();
        let err = store
            .create(cfg("persistent://t/n/a", "pulsar://h:6650"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DocAlreadyExisted));
    }

    #[tokio::test]
    async fn update_on_absent_key_behaves_as_create() {
        let store = InMemoryStore::new();
        let updated = store.update(cfg("persistent://t/n/b", "pulsar://h:6650")).await.unwrap();
        let key = updated.compute_key();
        assert!(store.get_by_key(&key).await.is_ok());
    }

    #[tokio::test]
    async fn update_merges_mutable_fields_only() {
        let store = InMemoryStore::new();
        let mut original = cfg("persistent://t/n/c", "pulsar://h:6650");
        original.webhooks.push(WebhookConfig {
            url: "http://sink/".into(),
            headers: vec![],
            subscription: "sub".into(),
            subscription_type: Default::default(),
            initial_position: Default::default(),
            webhook_status: Status::Activated,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            deleted_at: None,
        });
        let created = store.create(original).await.unwrap();

        let mut incoming = created.clone();
        incoming.notes = "changed".into();
        let updated = store.update(incoming).await.unwrap();

        assert_eq!(updated.notes, "changed");
        assert_eq!(updated.created_at, created.created_at);
        assert_eq!(updated.key, created.key);
    }

    #[tokio::test]
    async fn delete_then_get_is_not_found() {
        let store = InMemoryStore::new();
        let created = store.create(cfg("persistent://t/n/d", "pulsar://h:6650")).await.unwrap();
        let key = created.compute_key();
        store.delete_by_key(&key).await.unwrap();
        let err = store.get_by_key(&key).await.unwrap_err();
        assert!(matches!(err, StoreError::DocNotFound));
    }
}
