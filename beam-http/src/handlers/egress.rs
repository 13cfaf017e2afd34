use actix_web::{web, HttpRequest, HttpResponse};
use futures_util::stream;
use log::warn;
use pulsar_beam_pool::{ConsumerSpec, PulsarInitialPosition, PulsarSubType};
use pulsar_beam_types::{Key, SubscriptionKey};
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_stream::StreamExt as _;
use uuid::Uuid;

use crate::error::PbProblem;
use crate::handlers::ingress::token_and_cluster;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct EgressPath {
    pub persistent: String,
    pub tenant: String,
    pub namespace: String,
    pub topic: String,
}

impl EgressPath {
    fn topic_full_name(&self) -> String {
        format!(
            "{}://{}/{}/{}",
            self.persistent, self.tenant, self.namespace, self.topic
        )
    }
}

#[derive(Debug, Deserialize)]
pub struct EgressQuery {
    pub subscription: Option<String>,
}

fn consumer_spec(
    state: &AppState,
    topic: String,
    query: &EgressQuery,
    req: &HttpRequest,
) -> Result<(SubscriptionKey, ConsumerSpec), PbProblem> {
    let (token, pulsar_url) = token_and_cluster(&state.guard, req.headers())?;
    let subscription_name = query
        .subscription
        .clone()
        .unwrap_or_else(|| format!("egress-{}", Uuid::new_v4()));
    let sk = SubscriptionKey::new(&Key::new(&topic, &pulsar_url), &subscription_name);
    let spec = ConsumerSpec {
        pulsar_url,
        token,
        topic,
        subscription_name,
        subscription_type: PulsarSubType::Shared,
        initial_position: PulsarInitialPosition::Latest,
    };
    Ok((sk, spec))
}

/// `GET /v2/sse/{persistent}/{tenant}/{namespace}/{topic}` (§6.1): streams
/// broker messages as Server-Sent Events. A thin named-contract shim — no
/// replay/backfill semantics beyond the consumer's own `initial_position`.
pub async fn sse(
    state: web::Data<AppState>,
    path: web::Path<EgressPath>,
    query: web::Query<EgressQuery>,
    req: HttpRequest,
) -> Result<HttpResponse, PbProblem> {
    let topic = path.topic_full_name();
    let (sk, spec) = consumer_spec(&state, topic, &query, &req)?;

    state
        .consumers
        .ensure(&sk, spec.clone())
        .await
        .map_err(|e| PbProblem::ServiceUnavailable(e.to_string()))?;

    let (tx, rx) = mpsc::channel::<actix_web::web::Bytes>(16);
    let consumers = state.consumers.clone();
    tokio::spawn(async move {
        loop {
            let received = consumers
                .with_consumer(&sk, spec.clone(), |consumer| async move { consumer.try_next().await })
                .await;

            match received {
                Ok(Ok(Some(msg))) => {
                    let mut frame = Vec::with_capacity(msg.payload.data.len() + 8);
                    frame.extend_from_slice(b"data: ");
                    frame.extend_from_slice(&msg.payload.data);
                    frame.extend_from_slice(b"\n\n");
                    if tx.send(actix_web::web::Bytes::from(frame)).await.is_err() {
                        return;
                    }
                }
                Ok(Ok(None)) | Ok(Err(_)) | Err(_) => {
                    warn!("sse stream for {sk} ended");
                    return;
                }
            }
        }
    });

    let body = stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|chunk| (Ok::<_, actix_web::Error>(chunk), rx))
    });

    Ok(HttpResponse::Ok()
        .content_type("text/event-stream")
        .streaming(body))
}

#[derive(Debug, Deserialize)]
pub struct PollQuery {
    pub subscription: Option<String>,
    pub max_messages: Option<usize>,
    pub timeout_ms: Option<u64>,
}

/// `GET /v2/poll/{persistent}/{tenant}/{namespace}/{topic}` (§6.1): collects up
/// to `max_messages` (default 10) within `timeout_ms` (default 3000), `200`
/// with a JSON array of payloads if non-empty, `204` otherwise.
pub async fn poll(
    state: web::Data<AppState>,
    path: web::Path<EgressPath>,
    query: web::Query<PollQuery>,
    req: HttpRequest,
) -> Result<HttpResponse, PbProblem> {
    let topic = path.topic_full_name();
    let egress_query = EgressQuery {
        subscription: query.subscription.clone(),
    };
    let (sk, spec) = consumer_spec(&state, topic, &egress_query, &req)?;

    state
        .consumers
        .ensure(&sk, spec.clone())
        .await
        .map_err(|e| PbProblem::ServiceUnavailable(e.to_string()))?;

    let max_messages = query.max_messages.unwrap_or(10);
    let deadline = Duration::from_millis(query.timeout_ms.unwrap_or(3000));

    let mut batch = Vec::new();
    let result = timeout(deadline, async {
        while batch.len() < max_messages {
            let received = state
                .consumers
                .with_consumer(&sk, spec.clone(), |consumer| async move { consumer.try_next().await })
                .await;
            match received {
                Ok(Ok(Some(msg))) => batch.push(msg.payload.data),
                Ok(Ok(None)) | Ok(Err(_)) | Err(_) => break,
            }
        }
    })
    .await;

    if result.is_err() {
        // Deadline elapsed; return whatever was collected so far.
    }

    if batch.is_empty() {
        Ok(HttpResponse::NoContent().finish())
    } else {
        let payloads: Vec<String> = batch
            .into_iter()
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
            .collect();
        Ok(HttpResponse::Ok().json(payloads))
    }
}
