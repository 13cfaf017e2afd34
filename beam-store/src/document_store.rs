use crate::store::Store;
use async_trait::async_trait;
use chrono::Utc;
use pulsar_beam_types::{Key, Status, StoreError, TopicConfig};
use sqlx::PgPool;

/// `PbDbType=mongo`'s grounded substitution (§4.4.1): the reference treats the
/// document-database backend as "a row/document store keyed by a unique id",
/// which this crate already has a stack for via `sqlx`/Postgres elsewhere in
/// the pack, so that is what this backend uses rather than a fresh MongoDB
/// driver dependency. One table, one JSONB column, `key` as the unique index.
pub struct DocumentStore {
    pool: PgPool,
}

const CREATE_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS pulsar_beam.topic_config (
        key TEXT PRIMARY KEY,
        doc JSONB NOT NULL
    )
";

impl DocumentStore {
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| StoreError::Transport(e.into()))?;
        sqlx::query("CREATE SCHEMA IF NOT EXISTS pulsar_beam")
            .execute(&pool)
            .await
            .map_err(|e| StoreError::Transport(e.into()))?;
        sqlx::query(CREATE_TABLE)
            .execute(&pool)
            .await
            .map_err(|e| StoreError::Transport(e.into()))?;
        Ok(DocumentStore { pool })
    }

    async fn fetch(&self, key: &str) -> Result<Option<TopicConfig>, StoreError> {
        let row: Option<(serde_json::Value,)> =
            sqlx::query_as("SELECT doc FROM pulsar_beam.topic_config WHERE key = $1")
                .bind(key)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| StoreError::Transport(e.into()))?;
        row.map(|(doc,)| serde_json::from_value(doc).map_err(StoreError::from))
            .transpose()
    }

    async fn upsert_row(&self, doc: &TopicConfig) -> Result<(), StoreError> {
        let payload = serde_json::to_value(doc)?;
        sqlx::query(
            "INSERT INTO pulsar_beam.topic_config (key, doc) VALUES ($1, $2)
             ON CONFLICT (key) DO UPDATE SET doc = EXCLUDED.doc",
        )
        .bind(&doc.key)
        .bind(payload)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Transport(e.into()))?;
        Ok(())
    }
}

#[async_trait]
impl Store for DocumentStore {
    async fn get_by_topic_full_name(
        &self,
        topic_full_name: &str,
        pulsar_url: &str,
    ) -> Result<TopicConfig, StoreError> {
        let key = Key::new(topic_full_name, pulsar_url);
        self.get_by_key(&key).await
    }

    async fn get_by_key(&self, key: &Key) -> Result<TopicConfig, StoreError> {
        self.fetch(key.as_str())
            .await?
            .filter(|cfg| !cfg.topic_status.is_deleted())
            .ok_or(StoreError::DocNotFound)
    }

    async fn create(&self, mut cfg: TopicConfig) -> Result<TopicConfig, StoreError> {
        let key = cfg.compute_key();
        if self.fetch(key.as_str()).await?.is_some() {
            return Err(StoreError::DocAlreadyExisted);
        }
        let now = Utc::now();
        cfg.key = key.to_string();
        cfg.created_at = now;
        cfg.updated_at = now;
        self.upsert_row(&cfg).await?;
        Ok(cfg)
    }

    async fn update(&self, cfg: TopicConfig) -> Result<TopicConfig, StoreError> {
        let key = cfg.compute_key();
        match self.fetch(key.as_str()).await? {
            None => self.create(cfg).await,
            Some(mut stored) => {
                stored.merge_mutable_fields(&cfg, Utc::now());
                self.upsert_row(&stored).await?;
                Ok(stored)
            }
        }
    }

    async fn delete(&self, topic_full_name: &str, pulsar_url: &str) -> Result<TopicConfig, StoreError> {
        let key = Key::new(topic_full_name, pulsar_url);
        self.delete_by_key(&key).await
    }

    async fn delete_by_key(&self, key: &Key) -> Result<TopicConfig, StoreError> {
        let mut tombstone = self.fetch(key.as_str()).await?.ok_or(StoreError::DocNotFound)?;
        tombstone.topic_status = Status::Deleted;
        tombstone.updated_at = Utc::now();
        sqlx::query("DELETE FROM pulsar_beam.topic_config WHERE key = $1")
            .bind(key.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Transport(e.into()))?;
        Ok(tombstone)
    }

    async fn load_all(&self) -> Result<Vec<TopicConfig>, StoreError> {
        let rows: Vec<(serde_json::Value,)> =
            sqlx::query_as("SELECT doc FROM pulsar_beam.topic_config")
                .fetch_all(&self.pool)
                .await
                .map_err(|e| StoreError::Transport(e.into()))?;
        rows.into_iter()
            .map(|(doc,)| serde_json::from_value::<TopicConfig>(doc).map_err(StoreError::from))
            .filter(|cfg| !matches!(cfg, Ok(c) if c.topic_status.is_deleted()))
            .collect()
    }

    async fn init(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn close(&self) -> Result<(), StoreError> {
        self.pool.close().await;
        Ok(())
    }

    async fn health(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}
