use async_trait::async_trait;
use pulsar_beam_types::{Key, StoreError, TopicConfig};

/// CRUD + full-snapshot load of `TopicConfig` records, plus backend lifecycle
/// (§4.4). Implementations are chosen by name (`PbDbType`) at startup and held
/// behind `Arc<dyn Store>` by the rest of the process.
#[async_trait]
pub trait Store: Send + Sync {
    async fn get_by_topic_full_name(
        &self,
        topic_full_name: &str,
        pulsar_url: &str,
    ) -> Result<TopicConfig, StoreError>;

    async fn get_by_key(&self, key: &Key) -> Result<TopicConfig, StoreError>;

    /// Fails with `DocAlreadyExisted` if a record with the same `Key` exists.
    async fn create(&self, cfg: TopicConfig) -> Result<TopicConfig, StoreError>;

    /// Upsert-like: delegates to `create` if `cfg.Key` is absent; otherwise
    /// merges mutable fields onto the stored record and bumps `UpdatedAt`. Never
    /// errors on a missing record (§8 property 2, the "upsert law").
    async fn update(&self, cfg: TopicConfig) -> Result<TopicConfig, StoreError>;

    async fn delete(&self, topic_full_name: &str, pulsar_url: &str) -> Result<TopicConfig, StoreError>;

    async fn delete_by_key(&self, key: &Key) -> Result<TopicConfig, StoreError>;

    /// A snapshot of every non-deleted record, used by the reconciliation tick.
    async fn load_all(&self) -> Result<Vec<TopicConfig>, StoreError>;

    async fn init(&self) -> Result<(), StoreError>;

    /// Most backends auto-sync; returns `UnsupportedDb` when there is nothing to do.
    async fn sync(&self) -> Result<(), StoreError> {
        Err(StoreError::UnsupportedDb("sync is not supported by this backend".into()))
    }

    async fn close(&self) -> Result<(), StoreError>;

    /// Always `true` for the in-memory-index backends (the index is always
    /// answerable); backends with an external round-trip may return `false`.
    async fn health(&self) -> bool;
}
