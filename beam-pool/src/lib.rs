//! The three broker connection pools (§4.1–4.3) and the generic TTL cache (§4.8)
//! that backs `ProducerPool`.

mod client;
mod consumer;
mod error;
mod producer;
mod ttl;

pub use client::{ClientPool, ClientPoolConfig};
pub use consumer::{ConsumerPool, ConsumerSpec};
pub use error::PoolError;
pub use producer::{ProducerPool, PULSAR_BEAM_ID_PROPERTY};
pub use ttl::{Ttl, TtlCache};

pub use pulsar::consumer::InitialPosition as PulsarInitialPosition;
pub use pulsar::SubType as PulsarSubType;
