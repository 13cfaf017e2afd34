use crate::worker::{CloseSignal, WebhookWorker};
use log::info;
use pulsar_beam_pool::{ConsumerPool, ProducerPool};
use pulsar_beam_store::Store;
use pulsar_beam_types::{ClusterGuard, SubscriptionKey};
use reqwest::Client as HttpClient;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// Reconciles the desired set of activated webhooks against the live set of
/// running `WebhookWorker` tasks on a timer (§4.5). Default tick is 180s.
pub struct WebhookBroker {
    store: Arc<dyn Store>,
    consumers: Arc<ConsumerPool>,
    producers: Arc<ProducerPool>,
    guard: Arc<ClusterGuard>,
    http: HttpClient,
    workers: RwLock<HashMap<SubscriptionKey, CloseSignal>>,
    tick_interval: Duration,
    /// Tracks every spawned `WebhookWorker` task so `shutdown` can wait for
    /// in-flight deliveries to finish draining before the process exits (§5's
    /// graceful-shutdown note), matching the teacher's own
    /// `TaskTracker`-gated worker drain in its own binary.
    tracker: TaskTracker,
    /// Stops the reconcile tick loop itself on `shutdown`.
    shutdown_token: CancellationToken,
}

impl WebhookBroker {
    pub fn new(
        store: Arc<dyn Store>,
        consumers: Arc<ConsumerPool>,
        producers: Arc<ProducerPool>,
        guard: Arc<ClusterGuard>,
        http: HttpClient,
        tick_interval: Duration,
    ) -> Arc<Self> {
        Arc::new(WebhookBroker {
            store,
            consumers,
            producers,
            guard,
            http,
            workers: RwLock::new(HashMap::new()),
            tick_interval,
            tracker: TaskTracker::new(),
            shutdown_token: CancellationToken::new(),
        })
    }

    /// Spawns the periodic reconcile tick; returns immediately.
    pub fn spawn(self: &Arc<Self>) {
        let this = self.clone();
        tokio::spawn(async move {
            let mut ticker = interval(this.tick_interval);
            loop {
                tokio::select! {
                    _ = this.shutdown_token.cancelled() => return,
                    _ = ticker.tick() => this.tick().await,
                }
            }
        });
    }

    /// Stops the reconcile tick, cancels every live worker, and waits for
    /// their delivery tasks to drain (§5's graceful-shutdown note). A worker
    /// currently blocked in `receive`/POST finishes its own in-flight
    /// attempt before observing cancellation — the accepted limitation of
    /// §4.6/§9, not something `shutdown` forces open.
    pub async fn shutdown(&self) {
        self.shutdown_token.cancel();

        let signals: Vec<CloseSignal> = { self.workers.write().await.drain().map(|(_, s)| s).collect() };
        for signal in signals {
            let _ = signal.send(()).await;
        }

        self.tracker.close();
        self.tracker.wait().await;
    }

    async fn tick(&self) {
        let records = match self.store.load_all().await {
            Ok(records) => records,
            Err(e) => {
                log::error!("reconcile tick failed to load topic configs: {e}");
                return;
            }
        };

        let mut desired: HashMap<SubscriptionKey, DesiredWorker> = HashMap::new();
        for cfg in &records {
            let key = cfg.compute_key();
            for webhook in cfg.activated_webhooks() {
                let sk = SubscriptionKey::new(&key, &webhook.url);
                desired.insert(
                    sk,
                    DesiredWorker {
                        pulsar_url: cfg.pulsar_url.clone(),
                        token: cfg.token.clone(),
                        topic_full_name: cfg.topic_full_name.clone(),
                        webhook: webhook.clone(),
                    },
                );
            }
        }

        let live: HashSet<SubscriptionKey> = { self.workers.read().await.keys().cloned().collect() };
        let desired_keys: HashSet<SubscriptionKey> = desired.keys().cloned().collect();
        let (spawn_keys, cancel_keys) = diff_desired_live(&desired_keys, &live);

        let to_spawn: Vec<(SubscriptionKey, DesiredWorker)> = spawn_keys
            .into_iter()
            .filter_map(|sk| desired.get(&sk).cloned().map(|w| (sk, w)))
            .collect();
        let to_cancel: Vec<SubscriptionKey> = cancel_keys.into_iter().collect();

        for (sk, desired_worker) in to_spawn {
            let close_signal = WebhookWorker::spawn(
                &self.tracker,
                desired_worker.pulsar_url,
                desired_worker.token,
                desired_worker.topic_full_name,
                sk.clone(),
                desired_worker.webhook,
                self.consumers.clone(),
                self.producers.clone(),
                self.guard.clone(),
                self.http.clone(),
            );
            self.workers.write().await.insert(sk, close_signal);
        }

        for sk in to_cancel {
            let signal = { self.workers.write().await.remove(&sk) };
            if let Some(signal) = signal {
                let _ = signal.send(()).await;
            }
            self.consumers.cancel(&sk).await;
        }

        info!("reconcile tick: {} live workers", self.workers.read().await.len());
    }
}

#[derive(Clone)]
struct DesiredWorker {
    pulsar_url: String,
    token: String,
    topic_full_name: String,
    webhook: pulsar_beam_types::WebhookConfig,
}

/// Pure set-diff at the core of each reconcile tick (§4.5, §8 P5): workers
/// present in `desired` but not `live` need spawning, workers present in
/// `live` but not `desired` need cancelling. Kept free of the store/pool
/// types so the convergence property can be checked without a broker.
fn diff_desired_live(
    desired: &HashSet<SubscriptionKey>,
    live: &HashSet<SubscriptionKey>,
) -> (HashSet<SubscriptionKey>, HashSet<SubscriptionKey>) {
    let to_spawn = desired.difference(live).cloned().collect();
    let to_cancel = live.difference(desired).cloned().collect();
    (to_spawn, to_cancel)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulsar_beam_types::Key;

    fn sk(n: u8) -> SubscriptionKey {
        let key = Key::new(&format!("persistent://tenant/ns/topic-{n}"), "pulsar://localhost:6650");
        SubscriptionKey::new(&key, &format!("https://example.test/hook-{n}"))
    }

    #[test]
    fn converges_to_empty_diff_once_live_matches_desired() {
        let a = sk(1);
        let b = sk(2);
        let desired: HashSet<_> = [a.clone(), b.clone()].into_iter().collect();

        let (spawn, cancel) = diff_desired_live(&desired, &HashSet::new());
        assert_eq!(spawn, desired);
        assert!(cancel.is_empty());

        // Second tick: live now mirrors what the first tick spawned.
        let (spawn, cancel) = diff_desired_live(&desired, &desired.clone());
        assert!(spawn.is_empty());
        assert!(cancel.is_empty());
    }

    #[test]
    fn removed_webhook_is_scheduled_for_cancellation() {
        let a = sk(1);
        let b = sk(2);
        let live: HashSet<_> = [a.clone(), b.clone()].into_iter().collect();
        let desired: HashSet<_> = [a.clone()].into_iter().collect();

        let (spawn, cancel) = diff_desired_live(&desired, &live);
        assert!(spawn.is_empty());
        assert_eq!(cancel, [b].into_iter().collect());
    }

    #[test]
    fn disjoint_sets_spawn_and_cancel_independently() {
        let a = sk(1);
        let b = sk(2);
        let live: HashSet<_> = [a.clone()].into_iter().collect();
        let desired: HashSet<_> = [b.clone()].into_iter().collect();

        let (spawn, cancel) = diff_desired_live(&desired, &live);
        assert_eq!(spawn, [b].into_iter().collect());
        assert_eq!(cancel, [a].into_iter().collect());
    }
}
