use crate::echo;
use chrono::Utc;
use log::{error, info, warn};
use pulsar::consumer::Message;
use pulsar_beam_pool::{ConsumerPool, ConsumerSpec, ProducerPool};
use pulsar_beam_types::{ClusterGuard, SubscriptionKey, WebhookConfig};
use reqwest::Client as HttpClient;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tokio_util::task::TaskTracker;

/// Capacity of the close-signal channel: room for a redundant cancel without blocking (§5).
const CLOSE_SIGNAL_CAPACITY: usize = 2;

const MAX_RETRIES: u32 = 3;
const MIN_BACKOFF: Duration = Duration::from_secs(2);
const MAX_BACKOFF: Duration = Duration::from_secs(28);
const MAX_HTTP_RETRIES: u32 = 1;

/// Sender half of a worker's close-signal channel, held by `WebhookBroker`.
pub type CloseSignal = mpsc::Sender<()>;

/// One durable webhook delivery pump: one broker subscription, one HTTP sink.
pub struct WebhookWorker {
    pulsar_url: String,
    token: String,
    topic_full_name: String,
    subscription_key: SubscriptionKey,
    webhook: WebhookConfig,
    consumers: Arc<ConsumerPool>,
    producers: Arc<ProducerPool>,
    guard: Arc<ClusterGuard>,
    http: HttpClient,
}

impl WebhookWorker {
    #[allow(clippy::too_many_arguments)]
    pub fn spawn(
        tracker: &TaskTracker,
        pulsar_url: String,
        token: String,
        topic_full_name: String,
        subscription_key: SubscriptionKey,
        webhook: WebhookConfig,
        consumers: Arc<ConsumerPool>,
        producers: Arc<ProducerPool>,
        guard: Arc<ClusterGuard>,
        http: HttpClient,
    ) -> CloseSignal {
        let (close_tx, close_rx) = mpsc::channel(CLOSE_SIGNAL_CAPACITY);
        let worker = WebhookWorker {
            pulsar_url,
            token,
            topic_full_name,
            subscription_key,
            webhook,
            consumers,
            producers,
            guard,
            http,
        };
        tracker.spawn(worker.run(close_rx));
        close_tx
    }

    fn consumer_spec(&self) -> ConsumerSpec {
        ConsumerSpec {
            pulsar_url: self.pulsar_url.clone(),
            token: self.token.clone(),
            topic: self.topic_full_name.clone(),
            subscription_name: self.webhook.subscription.clone(),
            subscription_type: crate::convert::sub_type(self.webhook.subscription_type),
            initial_position: crate::convert::initial_position(self.webhook.initial_position),
        }
    }

    async fn run(self, mut close_rx: mpsc::Receiver<()>) {
        let sk = self.subscription_key.clone();
        let mut retry: u32 = 0;

        loop {
            if retry > MAX_RETRIES {
                warn!("worker {sk} giving up after {retry} retries; self-cancelling");
                self.consumers.cancel(&sk).await;
                return;
            }

            let spec = self.consumer_spec();
            // `try_next` can block indefinitely on an idle subscription. Racing it
            // against the close signal lets `cancel()` (which closes this entry's
            // consumer under the same lock `with_consumer` holds) make progress
            // instead of deadlocking: a cancellation drops this branch's future,
            // releasing the lock, so cancel's own `consumer.lock().await` can
            // complete. Without this race, a cancel arriving while the worker sits
            // in a blocking receive stalls forever and the reconcile loop along
            // with it.
            let received = tokio::select! {
                biased;
                _ = close_rx.recv() => {
                    info!("worker {sk} cancelled while waiting for a message");
                    return;
                }
                r = self.consumers.with_consumer(&sk, spec, |consumer| async move {
                    use tokio_stream::StreamExt;
                    consumer.try_next().await
                }) => r,
            };

            let msg = match received {
                Ok(Ok(Some(msg))) => msg,
                Ok(Ok(None)) | Ok(Err(_)) | Err(_) => {
                    retry += 1;
                    let wait = Duration::from_secs(2 * u64::from(retry));
                    tokio::select! {
                        _ = close_rx.recv() => {
                            info!("worker {sk} cancelled during reconnect wait");
                            return;
                        }
                        _ = sleep(wait) => {
                            let spec = self.consumer_spec();
                            if let Err(e) = self.consumers.ensure(&sk, spec).await {
                                error!("worker {sk} failed to reacquire consumer: {e}");
                                self.consumers.cancel(&sk).await;
                                return;
                            }
                        }
                    }
                    continue;
                }
            };

            retry = 0;
            self.deliver(msg).await;
        }
    }

    /// Builds the outbound request headers and POSTs the payload with a bounded
    /// retry (§4.6). Acks iff the response is `2xx` or `422`; on `2xx` spawns the
    /// echo task. Anything else is left unacked for broker redelivery.
    async fn deliver(&self, msg: Message<Vec<u8>>) {
        let sk = &self.subscription_key;
        let msg_id = msg.message_id().clone();
        let payload = msg.payload.data.clone();
        let metadata = &msg.payload.metadata;

        let mut headers = reqwest::header::HeaderMap::new();
        for (name, value) in self.webhook.parsed_headers() {
            let (Ok(name), Ok(value)) = (
                reqwest::header::HeaderName::from_bytes(name.as_bytes()),
                reqwest::header::HeaderValue::from_str(&value),
            ) else {
                continue;
            };
            headers.insert(name, value);
        }

        insert_header(&mut headers, "PulsarMessageId", &format!("{msg_id:?}"));
        insert_header(
            &mut headers,
            "PulsarPublishedTime",
            &publish_time_rfc3339(metadata.publish_time),
        );
        insert_header(&mut headers, "PulsarTopic", &self.topic_full_name);
        if let Some(event_time) = metadata.event_time.filter(|t| *t != 0) {
            insert_header(&mut headers, "PulsarEventTime", &event_time.to_string());
        }
        for kv in &metadata.properties {
            insert_header(&mut headers, &format!("PulsarProperties-{}", kv.key), &kv.value);
        }
        if serde_json::from_slice::<serde_json::Value>(&payload).is_ok() {
            insert_header(&mut headers, "content-type", "application/json");
        }

        let (status, response_headers, response_body) =
            self.post_with_retry(&headers, payload.clone()).await;

        let ackable = status.is_success() || status.as_u16() == 422;
        if ackable {
            match self
                .consumers
                .with_consumer(sk, self.consumer_spec(), |consumer| {
                    let msg_id = msg_id.clone();
                    let topic = self.topic_full_name.clone();
                    async move { consumer.ack_with_id(&topic, msg_id).await }
                })
                .await
            {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!("worker {sk} failed to ack message: {e}"),
                Err(e) => error!("worker {sk} ack failed to reach consumer: {e}"),
            }
            if status.is_success() {
                echo::spawn_if_present(
                    self.producers.clone(),
                    self.guard.clone(),
                    response_headers,
                    response_body,
                );
            }
        } else {
            warn!("worker {sk} delivery rejected with {status}; leaving unacked for redelivery");
        }
    }

    /// POSTs with a bounded retry (min 2s, max 28s backoff, at most one retry,
    /// §4.6). A network/DNS failure after retries is synthesized as a `500` so
    /// the ack-policy branch above has a uniform status to compare against.
    async fn post_with_retry(
        &self,
        headers: &reqwest::header::HeaderMap,
        payload: Vec<u8>,
    ) -> (reqwest::StatusCode, http::HeaderMap, Vec<u8>) {
        let mut backoff = MIN_BACKOFF;
        let mut attempt = 0u32;
        loop {
            let result = self
                .http
                .post(&self.webhook.url)
                .headers(headers.clone())
                .body(payload.clone())
                .send()
                .await;

            match result {
                Ok(response) => {
                    let status = response.status();
                    let response_headers = response.headers().clone();
                    let body = response.bytes().await.map(|b| b.to_vec()).unwrap_or_default();
                    return (status, response_headers, body);
                }
                Err(e) => {
                    if attempt >= MAX_HTTP_RETRIES {
                        error!("delivery to {} failed after retries: {e}", self.webhook.url);
                        return (
                            reqwest::StatusCode::INTERNAL_SERVER_ERROR,
                            http::HeaderMap::new(),
                            Vec::new(),
                        );
                    }
                    attempt += 1;
                    sleep(backoff.min(MAX_BACKOFF)).await;
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                }
            }
        }
    }
}

fn insert_header(headers: &mut reqwest::header::HeaderMap, name: &str, value: &str) {
    let (Ok(name), Ok(value)) = (
        reqwest::header::HeaderName::from_bytes(name.as_bytes()),
        reqwest::header::HeaderValue::from_str(value),
    ) else {
        return;
    };
    headers.insert(name, value);
}

fn publish_time_rfc3339(publish_time_millis: u64) -> String {
    chrono::DateTime::<Utc>::from_timestamp_millis(publish_time_millis as i64)
        .unwrap_or_else(Utc::now)
        .to_rfc3339()
}
