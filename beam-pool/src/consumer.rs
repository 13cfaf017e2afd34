use crate::client::ClientPool;
use crate::error::PoolError;
use log::error;
use pulsar::consumer::InitialPosition;
use pulsar::{Consumer, ConsumerOptions, SubType, TokioExecutor};
use pulsar_beam_types::SubscriptionKey;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// What a worker needs to (re)acquire its consumer.
#[derive(Debug, Clone)]
pub struct ConsumerSpec {
    pub pulsar_url: String,
    pub token: String,
    pub topic: String,
    pub subscription_name: String,
    pub subscription_type: SubType,
    pub initial_position: InitialPosition,
}

struct Entry {
    consumer: Mutex<Option<Consumer<Vec<u8>, TokioExecutor>>>,
    spec: ConsumerSpec,
}

/// Keyed cache of consumers per `SubscriptionKey` (§4.3).
pub struct ConsumerPool {
    clients: Arc<ClientPool>,
    entries: RwLock<HashMap<SubscriptionKey, Arc<Entry>>>,
}

impl ConsumerPool {
    pub fn new(clients: Arc<ClientPool>) -> Arc<Self> {
        Arc::new(ConsumerPool {
            clients,
            entries: RwLock::new(HashMap::new()),
        })
    }

    /// Ensures a consumer for `key` is subscribed, subscribing on first
    /// reference. On a first-attempt failure, forces a client reconnect and
    /// retries exactly once.
    pub async fn ensure(&self, key: &SubscriptionKey, spec: ConsumerSpec) -> Result<(), PoolError> {
        let entry = self.entry_for(key, spec).await;

        if entry.consumer.lock().await.is_some() {
            return Ok(());
        }

        match self.subscribe(&entry, false).await {
            Ok(()) => Ok(()),
            Err(_first_err) => {
                self.clients
                    .get(&entry.spec.pulsar_url, &entry.spec.token, true)
                    .await?;
                self.subscribe(&entry, true).await
            }
        }
    }

    async fn entry_for(&self, key: &SubscriptionKey, spec: ConsumerSpec) -> Arc<Entry> {
        let entries = self.entries.read().await;
        if let Some(entry) = entries.get(key) {
            return entry.clone();
        }
        drop(entries);

        let mut entries = self.entries.write().await;
        entries
            .entry(key.clone())
            .or_insert_with(|| {
                Arc::new(Entry {
                    consumer: Mutex::new(None),
                    spec,
                })
            })
            .clone()
    }

    async fn subscribe(&self, entry: &Entry, force_reconnect: bool) -> Result<(), PoolError> {
        let client = self
            .clients
            .get(&entry.spec.pulsar_url, &entry.spec.token, force_reconnect)
            .await?;

        let consumer = client
            .consumer()
            .with_topic(&entry.spec.topic)
            .with_subscription(&entry.spec.subscription_name)
            .with_subscription_type(entry.spec.subscription_type)
            .with_options(ConsumerOptions {
                durable: Some(true),
                initial_position: entry.spec.initial_position,
                ..Default::default()
            })
            .build::<Vec<u8>>()
            .await
            .map_err(|e| PoolError::Connect(e.into()))?;

        *entry.consumer.lock().await = Some(consumer);
        Ok(())
    }

    /// Runs `f` with exclusive access to the subscribed consumer, re-subscribing
    /// first if it is not already present.
    pub async fn with_consumer<F, Fut, T>(
        &self,
        key: &SubscriptionKey,
        spec: ConsumerSpec,
        f: F,
    ) -> Result<T, PoolError>
    where
        F: FnOnce(&mut Consumer<Vec<u8>, TokioExecutor>) -> Fut,
        Fut: std::future::Future<Output = T>,
    {
        self.ensure(key, spec).await?;
        let entry = self
            .entries
            .read()
            .await
            .get(key)
            .cloned()
            .expect("ensure just inserted this key");

        let mut guard = entry.consumer.lock().await;
        let consumer = guard.as_mut().expect("ensure just subscribed this entry");
        Ok(f(consumer).await)
    }

    /// Cancellation protocol (§4.3): unsubscribe first if the subscription name
    /// carries the `NonResumable` prefix, then close, then remove the entry.
    pub async fn cancel(&self, key: &SubscriptionKey) {
        let entry = { self.entries.write().await.remove(key) };
        let Some(entry) = entry else {
            error!("cancel consumer failed to locate consumer key {key}");
            return;
        };

        let is_non_resumable = entry
            .spec
            .subscription_name
            .starts_with(pulsar_beam_types::NON_RESUMABLE_PREFIX);

        let mut guard = entry.consumer.lock().await;
        if let Some(mut consumer) = guard.take() {
            if is_non_resumable {
                if let Err(e) = consumer.unsubscribe().await {
                    error!("unsubscribe failed for {key}: {e}");
                }
            }
            // Dropping `consumer` here closes the underlying subscription.
        }
    }
}
