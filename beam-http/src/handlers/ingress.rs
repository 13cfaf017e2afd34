use actix_web::web::Bytes;
use actix_web::{web, HttpRequest, HttpResponse};
use log::info;
use pulsar_beam_types::{receiver_header, ClusterGuard, HeaderError};
use serde::Deserialize;

use crate::state::AppState;

/// Token and broker URL only, for routes where the topic comes from the path
/// rather than the `TopicFn` header (§6.1's `/v2/firehose/...` and the SSE/poll
/// egress routes, which share this header contract per §4.9).
pub(crate) fn token_and_cluster(
    guard: &ClusterGuard,
    headers: &actix_web::http::header::HeaderMap,
) -> Result<(String, String), HeaderError> {
    let token = headers
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .replacen("Bearer", "", 1)
        .trim()
        .to_owned();

    let mut pulsar_url = headers
        .get("PulsarUrl")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_owned();

    if !guard.is_empty() {
        if pulsar_url.is_empty() {
            pulsar_url = guard.first().unwrap_or_default().to_owned();
        } else if !guard.contains(&pulsar_url) {
            return Err(HeaderError::ClusterNotAllowed(pulsar_url));
        }
    }

    if pulsar_url.is_empty() {
        return Err(HeaderError::MissingRequiredFields);
    }

    Ok((token, pulsar_url))
}

/// `POST /v1/firehose` (§6.1): topic and credentials are carried entirely in
/// headers. Replies `200` on a successful publish, `401` if the header
/// contract is unsatisfied, `503` if the broker publish itself fails (§7: a
/// synchronous publish failure is surfaced, not retried, to the caller).
pub async fn receive(state: web::Data<AppState>, req: HttpRequest, body: Bytes) -> HttpResponse {
    let parsed = match receiver_header(&state.guard, req.headers()) {
        Ok(parsed) => parsed,
        Err(_) => return HttpResponse::Unauthorized().finish(),
    };

    info!(
        "firehose ingest topic={} url={}",
        parsed.topic_full_name, parsed.pulsar_url
    );

    match state
        .producers
        .send(
            &parsed.pulsar_url,
            &parsed.token,
            &parsed.topic_full_name,
            body.to_vec(),
            false,
        )
        .await
    {
        Ok(()) => HttpResponse::Ok().finish(),
        Err(_) => HttpResponse::ServiceUnavailable().finish(),
    }
}

#[derive(Debug, Deserialize)]
pub struct FirehosePath {
    pub persistent: String,
    pub tenant: String,
    pub namespace: String,
    pub topic: String,
}

#[derive(Debug, Deserialize)]
pub struct FirehoseQuery {
    pub mode: Option<String>,
}

impl FirehosePath {
    fn topic_full_name(&self) -> String {
        format!(
            "{}://{}/{}/{}",
            self.persistent, self.tenant, self.namespace, self.topic
        )
    }
}

/// `POST /v2/firehose/{persistent}/{tenant}/{namespace}/{topic}` (§6.1): topic
/// comes from the path, credentials still come from headers. `?mode=async` is
/// accepted but does not change the response: ingress always answers
/// synchronously with `200`, matching the reference (§9).
pub async fn receive_v2(
    state: web::Data<AppState>,
    path: web::Path<FirehosePath>,
    _query: web::Query<FirehoseQuery>,
    req: HttpRequest,
    body: Bytes,
) -> HttpResponse {
    let topic_full_name = path.topic_full_name();

    let (token, pulsar_url) = match token_and_cluster(&state.guard, req.headers()) {
        Ok(pair) => pair,
        Err(_) => return HttpResponse::Unauthorized().finish(),
    };

    match state
        .producers
        .send(&pulsar_url, &token, &topic_full_name, body.to_vec(), false)
        .await
    {
        Ok(()) => HttpResponse::Ok().finish(),
        Err(_) => HttpResponse::ServiceUnavailable().finish(),
    }
}
