use actix_web::{web, HttpResponse};

use crate::state::AppState;

/// Liveness probe (§6.1). `200` iff the configured store backend reports healthy.
pub async fn status(state: web::Data<AppState>) -> HttpResponse {
    if state.store.health().await {
        HttpResponse::Ok().body("OK")
    } else {
        HttpResponse::ServiceUnavailable().body("store unhealthy")
    }
}

/// Thin named-contract shim (§1): a `/metrics` stub, not a full Prometheus
/// exposition registry.
pub async fn metrics() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body("# pulsar-beam metrics exposition is not yet instrumented\n")
}
