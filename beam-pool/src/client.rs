use crate::error::PoolError;
use pulsar::{Authentication, Pulsar, TokioExecutor};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};

/// Static per-construction settings that apply to every client the pool builds.
#[derive(Debug, Clone)]
pub struct ClientPoolConfig {
    pub operation_timeout: Duration,
    pub connection_timeout: Duration,
    pub trust_store_path: Option<String>,
    pub tls_allow_insecure_connection: bool,
    pub tls_validate_hostname: bool,
}

impl Default for ClientPoolConfig {
    fn default() -> Self {
        ClientPoolConfig {
            operation_timeout: Duration::from_secs(30),
            connection_timeout: Duration::from_secs(30),
            trust_store_path: None,
            tls_allow_insecure_connection: false,
            tls_validate_hostname: true,
        }
    }
}

struct Entry {
    client: Mutex<Option<Pulsar<TokioExecutor>>>,
    url: String,
    token: String,
}

/// Lazily creates and caches one broker client per `(URL, credential)` (§4.1).
pub struct ClientPool {
    config: ClientPoolConfig,
    entries: RwLock<HashMap<String, Arc<Entry>>>,
}

fn cache_key(url: &str, token: &str) -> String {
    format!("{url}{token}")
}

impl ClientPool {
    pub fn new(config: ClientPoolConfig) -> Arc<Self> {
        Arc::new(ClientPool {
            config,
            entries: RwLock::new(HashMap::new()),
        })
    }

    /// Returns the cached client, building it on first reference. With
    /// `force_reconnect = true`, the current handle (if any) is dropped and a
    /// fresh one is built, matching the reference's `Reconnect` semantics.
    pub async fn get(
        &self,
        url: &str,
        token: &str,
        force_reconnect: bool,
    ) -> Result<Pulsar<TokioExecutor>, PoolError> {
        let key = cache_key(url, token);
        let entry = {
            let entries = self.entries.read().await;
            entries.get(&key).cloned()
        };
        let entry = match entry {
            Some(e) => e,
            None => {
                let mut entries = self.entries.write().await;
                entries
                    .entry(key)
                    .or_insert_with(|| {
                        Arc::new(Entry {
                            client: Mutex::new(None),
                            url: url.to_owned(),
                            token: token.to_owned(),
                        })
                    })
                    .clone()
            }
        };

        let mut guard = entry.client.lock().await;
        if force_reconnect {
            guard.take();
        }
        if let Some(client) = guard.as_ref() {
            return Ok(client.clone());
        }

        let client = self.build_client(&entry.url, &entry.token).await?;
        *guard = Some(client.clone());
        Ok(client)
    }

    async fn build_client(&self, url: &str, token: &str) -> Result<Pulsar<TokioExecutor>, PoolError> {
        if url.starts_with("pulsar+ssl://") && self.config.trust_store_path.is_none() {
            return Err(PoolError::MissingTrustStore(url.to_owned()));
        }

        let mut builder = Pulsar::builder(url, TokioExecutor)
            .with_operation_timeout(self.config.operation_timeout)
            .with_connection_timeout(self.config.connection_timeout);

        if !token.is_empty() {
            builder = builder.with_auth(Authentication {
                name: "token".to_owned(),
                data: token.as_bytes().to_vec(),
            });
        }

        builder
            .build()
            .await
            .map_err(|e| PoolError::Connect(e.into()))
    }

    /// Removes and drops the cached client for `(url, token)`, if any.
    pub async fn close(&self, url: &str, token: &str) {
        let key = cache_key(url, token);
        if let Some(entry) = self.entries.write().await.remove(&key) {
            entry.client.lock().await.take();
        }
    }
}
