use crate::store::Store;
use async_trait::async_trait;
use chrono::Utc;
use log::{error, info, warn};
use pulsar::reader::ReaderOptions;
use pulsar::{Pulsar, TokioExecutor};
use pulsar_beam_pool::ClientPool;
use pulsar_beam_types::{Key, Status, StoreError, TopicConfig};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_stream::StreamExt;

/// A pre-created log-compacted topic used as both write-ahead log and snapshot
/// (§4.4.1). `Create`/`Update`/`Delete` publish a JSON document keyed by `Key`;
/// a tailing listener rebuilds an in-memory index that answers every read.
pub struct CompactedLogStore {
    clients: Arc<ClientPool>,
    pulsar_url: String,
    token: String,
    topic: String,
    index: Arc<RwLock<HashMap<String, TopicConfig>>>,
}

impl CompactedLogStore {
    pub fn new(clients: Arc<ClientPool>, pulsar_url: String, token: String, topic: String) -> Arc<Self> {
        Arc::new(CompactedLogStore {
            clients,
            pulsar_url,
            token,
            topic,
            index: Arc::new(RwLock::new(HashMap::new())),
        })
    }

    async fn publish(&self, doc: &TopicConfig) -> Result<(), StoreError> {
        let payload = serde_json::to_vec(doc)?;
        let client = self
            .clients
            .get(&self.pulsar_url, &self.token, false)
            .await
            .map_err(|e| StoreError::Transport(e.into()))?;

        let mut producer = client
            .producer()
            .with_topic(&self.topic)
            .build()
            .await
            .map_err(|e| StoreError::Transport(e.into()))?;

        producer
            .create_message()
            .with_key(doc.key.clone())
            .event_time(Utc::now().timestamp_millis() as u64)
            .with_content(payload)
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.into()))?;

        Ok(())
    }

    /// Crash-only supervisor: if the tailing listener ever exits (reader error,
    /// decode error), it is restarted immediately — "no backoff beyond the
    /// broker's own" (§7).
    fn spawn_listener_supervisor(self: &Arc<Self>) {
        let this = self.clone();
        tokio::spawn(async move {
            loop {
                if let Err(e) = this.clone().listen_once().await {
                    warn!("compacted-log listener for {} exited: {e}; restarting", this.topic);
                }
            }
        });
    }

    async fn listen_once(self: Arc<Self>) -> anyhow::Result<()> {
        let client: Pulsar<TokioExecutor> = self
            .clients
            .get(&self.pulsar_url, &self.token, false)
            .await?;

        let mut reader = client
            .reader()
            .with_topic(&self.topic)
            .with_options(ReaderOptions {
                read_compacted: Some(true),
                ..Default::default()
            })
            .into_reader::<Vec<u8>>()
            .await?;

        info!("compacted-log listener for {} started", self.topic);
        while let Some(msg) = reader.try_next().await? {
            match serde_json::from_slice::<TopicConfig>(&msg.payload.data) {
                Ok(doc) => {
                    let mut index = self.index.write().await;
                    if doc.topic_status.is_deleted() {
                        index.remove(&doc.key);
                    } else {
                        index.insert(doc.key.clone(), doc);
                    }
                }
                Err(e) => error!("failed to decode compacted-log message: {e}"),
            }
        }

        anyhow::bail!("compacted reader stream ended")
    }
}

#[async_trait]
impl Store for CompactedLogStore {
    async fn get_by_topic_full_name(
        &self,
        topic_full_name: &str,
        pulsar_url: &str,
    ) -> Result<TopicConfig, StoreError> {
        let key = Key::new(topic_full_name, pulsar_url);
        self.get_by_key(&key).await
    }

    async fn get_by_key(&self, key: &Key) -> Result<TopicConfig, StoreError> {
        self.index
            .read()
            .await
            .get(key.as_str())
            .cloned()
            .ok_or(StoreError::DocNotFound)
    }

    async fn create(&self, mut cfg: TopicConfig) -> Result<TopicConfig, StoreError> {
        let key = cfg.compute_key();
        if self.index.read().await.contains_key(key.as_str()) {
            return Err(StoreError::DocAlreadyExisted);
        }
        let now = Utc::now();
        cfg.key = key.to_string();
        cfg.created_at = now;
        cfg.updated_at = now;

        self.publish(&cfg).await?;
        // Mirror into the local index immediately so the creator observes its
        // own write (read-your-own-writes); cross-process readers see it once
        // their listener tails this message.
        self.index.write().await.insert(key.to_string(), cfg.clone());
        Ok(cfg)
    }

    async fn update(&self, cfg: TopicConfig) -> Result<TopicConfig, StoreError> {
        let key = cfg.compute_key();
        let existing = self.index.read().await.get(key.as_str()).cloned();
        match existing {
            None => self.create(cfg).await,
            Some(mut stored) => {
                stored.merge_mutable_fields(&cfg, Utc::now());
                self.publish(&stored).await?;
                self.index.write().await.insert(key.to_string(), stored.clone());
                Ok(stored)
            }
        }
    }

    async fn delete(&self, topic_full_name: &str, pulsar_url: &str) -> Result<TopicConfig, StoreError> {
        let key = Key::new(topic_full_name, pulsar_url);
        self.delete_by_key(&key).await
    }

    async fn delete_by_key(&self, key: &Key) -> Result<TopicConfig, StoreError> {
        let mut tombstone = self
            .index
            .read()
            .await
            .get(key.as_str())
            .cloned()
            .ok_or(StoreError::DocNotFound)?;
        tombstone.topic_status = Status::Deleted;
        tombstone.updated_at = Utc::now();

        self.publish(&tombstone).await?;
        self.index.write().await.remove(key.as_str());
        Ok(tombstone)
    }

    async fn load_all(&self) -> Result<Vec<TopicConfig>, StoreError> {
        Ok(self.index.read().await.values().cloned().collect())
    }

    async fn init(&self) -> Result<(), StoreError> {
        // Touch the client/producer once up front so construction errors (bad
        // URL, missing trust store) surface at startup rather than on first use.
        self.clients
            .get(&self.pulsar_url, &self.token, false)
            .await
            .map_err(|e| StoreError::Transport(e.into()))?;

        let this = Arc::new(CompactedLogStore {
            clients: self.clients.clone(),
            pulsar_url: self.pulsar_url.clone(),
            token: self.token.clone(),
            topic: self.topic.clone(),
            index: self.index.clone(),
        });
        this.spawn_listener_supervisor();
        Ok(())
    }

    async fn close(&self) -> Result<(), StoreError> {
        self.clients.close(&self.pulsar_url, &self.token).await;
        Ok(())
    }

    async fn health(&self) -> bool {
        true
    }
}
