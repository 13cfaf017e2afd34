//! Data model, keys and error taxonomy for Pulsar Beam.
//!
//! This crate has no knowledge of Pulsar, HTTP, or storage backends: it is the
//! vocabulary every other `pulsar-beam-*` crate is built around.

mod error;
mod guard;
mod key;
mod status;
mod topic;
mod webhook;

pub use error::{HeaderError, StoreError};
pub use guard::{receiver_header, ClusterGuard, ReceiverHeaders};
pub use key::{Key, SubscriptionKey};
pub use status::Status;
pub use topic::{tenant_from_topic_full_name, TopicConfig, WEBHOOKS_SOFT_CAP};
pub use webhook::{InitialPosition, SubscriptionType, WebhookConfig, NON_RESUMABLE_PREFIX};
