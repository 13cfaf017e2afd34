//! The `Store` trait (§4.4) and its three backends: `InMemoryStore` (tests,
//! `PbDbType=inmemory`), the Pulsar-backed `CompactedLogStore`
//! (`PbDbType=pulsarAsDb`), and the Postgres-backed `DocumentStore`
//! (`PbDbType=mongo`) — see `SPEC_FULL.md` §4.4.1 for why the latter is a
//! `sqlx`/Postgres substitution rather than a fresh MongoDB driver.

mod compacted_log;
mod document_store;
mod in_memory;
mod store;

pub use compacted_log::CompactedLogStore;
pub use document_store::DocumentStore;
pub use in_memory::InMemoryStore;
pub use store::Store;
