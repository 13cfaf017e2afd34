use clap::{Parser, ValueEnum};
use std::time::Duration;

/// Process mode (§6.5): selects which route sets and the reconciliation loop
/// are enabled. `--mode` / `PB_MODE` generalize the reference's CLI-flag-or-env
/// convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[clap(rename_all = "camelCase")]
pub enum ProcessMode {
    Broker,
    Receiver,
    Rest,
    Hybrid,
    TokenServer,
    Http,
    HttpWithNoRest,
}

impl ProcessMode {
    /// `IsBrokerRequired` (§6.5): these modes start the `WebhookBroker`
    /// reconciliation loop.
    pub fn requires_broker(self) -> bool {
        matches!(self, ProcessMode::Broker | ProcessMode::Hybrid)
    }

    /// `IsHTTPRouterRequired` (§6.5): these modes start the HTTP listener.
    pub fn requires_http_router(self) -> bool {
        !matches!(self, ProcessMode::Broker)
    }

    pub fn route_sets(self) -> pulsar_beam_http::RouteSets {
        pulsar_beam_http::RouteSets {
            ingress_egress: matches!(self, ProcessMode::Receiver | ProcessMode::Hybrid | ProcessMode::HttpWithNoRest),
            control: matches!(
                self,
                ProcessMode::Rest | ProcessMode::Http | ProcessMode::HttpWithNoRest | ProcessMode::Hybrid
            ),
            token_server: matches!(
                self,
                ProcessMode::TokenServer | ProcessMode::Http | ProcessMode::HttpWithNoRest
            ),
        }
    }
}

/// The `PbDbType` backend selector (§6.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DbType {
    Mongo,
    PulsarAsDb,
    Inmemory,
}

/// Every key from §6.4, layered CLI-then-env per `clap`'s `env` attribute
/// convention.
#[derive(Debug, Clone, Parser)]
#[clap(author, about, version)]
pub struct Config {
    /// Process mode: which route sets and reconcile loop are enabled
    #[clap(long, env = "PB_MODE", value_enum, default_value = "hybrid")]
    pub mode: ProcessMode,

    /// Port the HTTP listener binds to
    #[clap(long, env = "PORT", default_value = "8085")]
    pub port: u16,

    /// Primary broker URL, prepended to the cluster allow-list
    #[clap(long, env = "CLUSTER")]
    pub cluster: Option<String>,

    /// Comma-separated broker URL allow-list
    #[clap(long, env = "PulsarClusters", default_value = "")]
    pub pulsar_clusters: String,

    /// Log level, mapped onto `env_logger`'s filter syntax if `RUST_LOG` is unset
    #[clap(long, env = "LogLevel", default_value = "info")]
    pub log_level: String,

    /// Backend selector for the `Store`
    #[clap(long, env = "PbDbType", value_enum, default_value = "inmemory")]
    pub pb_db_type: DbType,

    /// Database/schema name; recognized for parity with §6.4 but unused by
    /// the `DocumentStore` backend, which derives its schema from
    /// `DbConnectionStr` alone.
    #[clap(long, env = "DbName", default_value = "")]
    pub db_name: String,

    /// Postgres connection string, used when `PbDbType=mongo`
    #[clap(long, env = "DbConnectionStr")]
    pub db_connection_str: Option<String>,

    /// Broker URL the `pulsarAsDb` backend's compacted topic lives on
    #[clap(long, env = "PulsarBrokerURL")]
    pub pulsar_broker_url: Option<String>,

    /// Bearer token used to reach the `pulsarAsDb` backend's broker
    #[clap(long, env = "DbPassword", hide_env_values = true, default_value = "")]
    pub db_password: String,

    /// Fully-qualified name of the pre-created log-compacted topic
    #[clap(long, env = "PbDbPulsarTopic", default_value = "persistent://public/default/pulsar-beam-store")]
    pub pb_db_pulsar_topic: String,

    /// Comma-separated subjects allowed to mint tokens for other subjects
    #[clap(long, env = "SuperRoles", default_value = "")]
    pub super_roles: String,

    /// `noauth` bypasses JWT verification entirely
    #[clap(long, env = "HTTPAuthImpl", default_value = "noauth")]
    pub http_auth_impl: String,

    /// RSA public key used to verify signed JWTs; recognized for §6.4 parity.
    /// RSA JWT verification itself is out of scope (§1) — `TokenAuth` is the
    /// named seam a real implementation fills in with this key material.
    #[clap(long, env = "PulsarPublicKey")]
    pub pulsar_public_key: Option<String>,

    /// RSA private key used to sign issued JWTs; see `pulsar_public_key`.
    #[clap(long, env = "PulsarPrivateKey", hide_env_values = true)]
    pub pulsar_private_key: Option<String>,

    /// TLS certificate/key pair for directly terminating HTTPS; recognized
    /// for §6.4 parity. The reference typically sits behind a TLS-terminating
    /// proxy, and this implementation does the same (§1's thin-router scope),
    /// so these are accepted but not wired to the listener.
    #[clap(long, env = "CertFile")]
    pub cert_file: Option<String>,

    #[clap(long, env = "KeyFile", hide_env_values = true)]
    pub key_file: Option<String>,

    /// Reconcile tick interval
    #[clap(long, env = "PbDbInterval", value_parser = humantime::parse_duration, default_value = "180s")]
    pub pb_db_interval: Duration,

    /// Broker client operation timeout
    #[clap(long, env = "PulsarClientOperationTimeout", value_parser = humantime::parse_duration, default_value = "30s")]
    pub pulsar_client_operation_timeout: Duration,

    /// Broker client connection timeout
    #[clap(long, env = "PulsarClientConnectionTimeout", value_parser = humantime::parse_duration, default_value = "30s")]
    pub pulsar_client_connection_timeout: Duration,

    /// TLS trust-store path, required for `pulsar+ssl://` broker URLs
    #[clap(long, env = "TrustStore")]
    pub trust_store: Option<String>,

    #[clap(long, env = "PulsarTLSAllowInsecureConnection", default_value_t = false)]
    pub pulsar_tls_allow_insecure_connection: bool,

    #[clap(long, env = "PulsarTLSValidateHostname", default_value_t = true)]
    pub pulsar_tls_validate_hostname: bool,

    /// Optional Sentry DSN for error reporting
    #[clap(long, env = "SENTRY_DSN")]
    pub sentry_dsn: Option<String>,
}
