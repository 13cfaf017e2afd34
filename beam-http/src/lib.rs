//! The ingress, egress and control HTTP surface for Pulsar Beam (§6.1).
//!
//! This crate only assembles routes and shared state; the actual reconcile
//! loop lives in `pulsar-beam-broker` and the connection pools in
//! `pulsar-beam-pool`. The process binary decides, per §6.5's mode table,
//! which of the [`RouteSets`] below to mount.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod rate_limit;
pub mod state;

pub use auth::{NoAuth, SuperRoles, TokenAuth};
pub use error::PbProblem;
pub use rate_limit::RateLimit;
pub use state::AppState;

use actix_web::web;

/// Which route groups a process mode mounts (§6.5).
#[derive(Debug, Clone, Copy)]
pub struct RouteSets {
    /// `receiver`/`hybrid`: `/v1/firehose`, `/v2/firehose/...`, SSE, long-poll.
    pub ingress_egress: bool,
    /// `rest`/`http`/`httpWithNoRest`/`hybrid`: the `/v2/topic` CRUD surface.
    pub control: bool,
    /// `tokenserver`/`http`/`httpWithNoRest`: `/subject/{sub}`.
    pub token_server: bool,
}

/// Mounts `/status` and `/metrics`, always present regardless of mode.
pub fn configure_common(cfg: &mut web::ServiceConfig) {
    cfg.route("/status", web::get().to(handlers::status::status))
        .route("/metrics", web::get().to(handlers::status::metrics));
}

/// Mounts the route groups selected by `routes`, per the process mode table
/// in §6.5.
pub fn configure(cfg: &mut web::ServiceConfig, routes: RouteSets) {
    configure_common(cfg);

    if routes.ingress_egress {
        cfg.route("/v1/firehose", web::post().to(handlers::ingress::receive))
            .route(
                "/v2/firehose/{persistent}/{tenant}/{namespace}/{topic}",
                web::post().to(handlers::ingress::receive_v2),
            )
            .route(
                "/v2/sse/{persistent}/{tenant}/{namespace}/{topic}",
                web::get().to(handlers::egress::sse),
            )
            .route(
                "/v2/poll/{persistent}/{tenant}/{namespace}/{topic}",
                web::get().to(handlers::egress::poll),
            );
    }

    if routes.control {
        cfg.service(
            web::resource("/v2/topic")
                .route(web::get().to(handlers::control::get_topic_by_body))
                .route(web::post().to(handlers::control::upsert_topic))
                .route(web::delete().to(handlers::control::delete_topic_by_body)),
        )
        .service(
            web::resource("/v2/topic/{key}")
                .route(web::get().to(handlers::control::get_topic))
                .route(web::delete().to(handlers::control::delete_topic)),
        );
    }

    if routes.token_server {
        cfg.route("/subject/{sub}", web::get().to(handlers::token::issue_token));
    }
}
