use thiserror::Error;

/// Store-level error taxonomy (§4.4). Backends add their own transport variants
/// through `Transport`, keeping the CRUD surface uniform across backends.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document not found")]
    DocNotFound,

    #[error("document already existed")]
    DocAlreadyExisted,

    #[error("unsupported database type: {0}")]
    UnsupportedDb(String),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("transport error: {0}")]
    Transport(#[from] anyhow::Error),
}

/// Header/guard validation error taxonomy (§4.9–4.10), surfaced as HTTP 422/403
/// at the ingress/egress/control boundary by `pulsar-beam-http`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HeaderError {
    #[error("missing required token or topic or pulsarURL")]
    MissingRequiredFields,

    #[error("pulsar cluster {0} is not allowed")]
    ClusterNotAllowed(String),
}
