use thiserror::Error;

/// Pool-level error taxonomy for the three broker pools (§4.1–4.3).
#[derive(Debug, Error)]
pub enum PoolError {
    /// The broker URL or credential could not even be parsed — synchronous, not
    /// retried by a force-reconnect.
    #[error("invalid broker url {0}")]
    InvalidUrl(String),

    /// The client/producer/consumer could not be established; callers retry
    /// exactly once through a forced reconnect (§4.1, §4.2, §4.3).
    #[error("connect failure: {0}")]
    Connect(#[source] anyhow::Error),

    /// A `pulsar+ssl://` URL was requested without a configured trust store.
    #[error("TLS trust store required for {0} but none configured")]
    MissingTrustStore(String),
}
