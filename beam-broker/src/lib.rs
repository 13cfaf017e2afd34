//! The webhook reconciliation loop (§4.5), the per-subscription delivery
//! worker (§4.6), and the echo-to-topic side effect (§4.7).

mod convert;
mod echo;
mod reconcile;
mod worker;

pub use reconcile::WebhookBroker;
pub use worker::{CloseSignal, WebhookWorker};
