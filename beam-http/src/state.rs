use crate::auth::{SuperRoles, TokenAuth};
use pulsar_beam_pool::{ClientPool, ConsumerPool, ProducerPool};
use pulsar_beam_store::Store;
use pulsar_beam_types::ClusterGuard;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Shared state handed to every handler via `web::Data` (§4.5–§4.10).
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub clients: Arc<ClientPool>,
    pub producers: Arc<ProducerPool>,
    pub consumers: Arc<ConsumerPool>,
    pub guard: Arc<ClusterGuard>,
    pub token_auth: Arc<dyn TokenAuth>,
    pub super_roles: SuperRoles,
    /// Global in-flight-request limiter; the only cross-tenant quota enforced
    /// (§1 Non-goals), grounded in the reference's package-level semaphore.
    pub rate: Arc<Semaphore>,
}
