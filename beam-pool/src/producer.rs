use crate::client::ClientPool;
use crate::error::PoolError;
use crate::ttl::{Ttl, TtlCache};
use chrono::Utc;
use log::error;
use pulsar::{Producer, TokioExecutor};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use uuid::Builder;

/// The property every published message carries, used downstream for tracing
/// and dedup (§4.2). Falls back to a decimal Unix timestamp on entropy failure,
/// matching the reference's `NewUUID` fallback.
pub const PULSAR_BEAM_ID_PROPERTY: &str = "PulsarBeamId";

/// A v4 UUID sourced from the OS entropy pool, or a decimal Unix-millis
/// timestamp if that source fails (§4.2). `uuid::Uuid::new_v4()` panics on
/// entropy failure rather than reporting it, so the random bytes are sourced
/// directly through `getrandom` to make the fallback reachable.
fn new_message_id() -> String {
    let mut bytes = [0u8; 16];
    match getrandom::getrandom(&mut bytes) {
        Ok(()) => Builder::from_random_bytes(bytes).into_uuid().to_string(),
        Err(e) => {
            log::warn!("uuid entropy source failed ({e}); falling back to a timestamp id");
            Utc::now().timestamp_millis().to_string()
        }
    }
}

/// TTL-cached producer per `(URL, credential, topic)` (§4.2). Default entry TTL
/// is 900s, matching the reference's producer expiry default.
pub struct ProducerPool {
    clients: Arc<ClientPool>,
    cache: Arc<TtlCache<Arc<Mutex<Producer<TokioExecutor>>>>>,
    default_ttl: Duration,
}

impl ProducerPool {
    pub fn new(clients: Arc<ClientPool>, default_ttl: Duration, clean_interval: Duration) -> Arc<Self> {
        let cache = TtlCache::new(default_ttl, clean_interval, |key, _producer| {
            // Dropping the last Arc handle runs the Producer's own Drop impl,
            // which is this binding's equivalent of the reference's `Close()`.
            log::debug!("evicting idle producer {key}");
        });
        Arc::new(ProducerPool { clients, cache, default_ttl })
    }

    fn cache_key(url: &str, token: &str, topic: &str) -> String {
        format!("{url}{token}{topic}")
    }

    /// Returns the cached producer, refreshing its TTL, or builds and caches a
    /// new one. On a first-attempt failure, forces a client reconnect and
    /// retries exactly once, per §4.2's reconnect-once contract.
    async fn acquire(
        &self,
        url: &str,
        token: &str,
        topic: &str,
    ) -> Result<Arc<Mutex<Producer<TokioExecutor>>>, PoolError> {
        let key = Self::cache_key(url, token, topic);
        if let Some(producer) = self.cache.get(&key).await {
            return Ok(producer);
        }

        match self.build_and_cache(url, token, topic, &key, false).await {
            Ok(producer) => Ok(producer),
            Err(_first_err) => {
                self.clients.get(url, token, true).await?;
                self.build_and_cache(url, token, topic, &key, true).await
            }
        }
    }

    async fn build_and_cache(
        &self,
        url: &str,
        token: &str,
        topic: &str,
        key: &str,
        force_reconnect: bool,
    ) -> Result<Arc<Mutex<Producer<TokioExecutor>>>, PoolError> {
        let client = self.clients.get(url, token, force_reconnect).await?;
        let producer = client
            .producer()
            .with_topic(topic)
            .build()
            .await
            .map_err(|e| PoolError::Connect(e.into()))?;
        let handle = Arc::new(Mutex::new(producer));
        self.cache.set_with_ttl(key, handle.clone(), Ttl::Finite(self.default_ttl)).await;
        Ok(handle)
    }

    /// Publishes `payload` to `topic`. In async mode the send is fire-and-forget
    /// (failures are logged only); in sync mode the caller receives the error.
    pub async fn send(
        &self,
        url: &str,
        token: &str,
        topic: &str,
        payload: Vec<u8>,
        async_send: bool,
    ) -> Result<(), PoolError> {
        let producer = self.acquire(url, token, topic).await?;
        let mut properties = HashMap::new();
        properties.insert(PULSAR_BEAM_ID_PROPERTY.to_owned(), new_message_id());
        let event_time = Utc::now().timestamp_millis() as u64;

        let mut guard = producer.lock().await;
        let message = guard
            .create_message()
            .event_time(event_time)
            .properties(properties)
            .with_content(payload);

        if async_send {
            if let Err(e) = message.send_non_blocking().await {
                error!("async publish to {topic} failed: {e}");
            }
            Ok(())
        } else {
            message
                .send()
                .await
                .map(|_| ())
                .map_err(|e| PoolError::Connect(e.into()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_message_id_is_unique_per_call() {
        let a = new_message_id();
        let b = new_message_id();
        assert_ne!(a, b);
        assert_eq!(a.len(), "00000000-0000-0000-0000-000000000000".len());
    }
}
