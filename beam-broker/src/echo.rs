use log::warn;
use pulsar_beam_pool::ProducerPool;
use pulsar_beam_types::{receiver_header, ClusterGuard};
use std::sync::Arc;

/// On a `2xx` webhook response, the response headers may carry the ingress
/// triple again; if so and the pulsarURL is allowed, republish the response
/// body back into the broker, fire-and-forget (§4.7). Never retried.
pub fn spawn_if_present(
    producers: Arc<ProducerPool>,
    guard: Arc<ClusterGuard>,
    response_headers: http::HeaderMap,
    response_body: Vec<u8>,
) {
    let parsed = match receiver_header(&guard, &response_headers) {
        Ok(parsed) => parsed,
        Err(_) => return,
    };

    if parsed.topic_full_name.is_empty() {
        return;
    }

    tokio::spawn(async move {
        if let Err(e) = producers
            .send(
                &parsed.pulsar_url,
                &parsed.token,
                &parsed.topic_full_name,
                response_body,
                true,
            )
            .await
        {
            warn!("echo publish to {} failed: {e}", parsed.topic_full_name);
        }
    });
}
