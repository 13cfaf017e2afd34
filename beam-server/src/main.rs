mod config;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use clap::{crate_name, Parser};
use config::{Config, DbType};
use log::{error, info, warn};
use pulsar_beam_broker::WebhookBroker;
use pulsar_beam_http::{AppState, NoAuth, RateLimit, SuperRoles};
use pulsar_beam_pool::{ClientPool, ClientPoolConfig, ConsumerPool, ProducerPool};
use pulsar_beam_store::{CompactedLogStore, DocumentStore, InMemoryStore, Store};
use pulsar_beam_types::ClusterGuard;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

/// Default producer TTL (§4.2) and its sweep pace.
const PRODUCER_TTL: Duration = Duration::from_secs(900);
const PRODUCER_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// The only cross-tenant quota enforced (§1 Non-goals): a single global
/// in-flight-request semaphore, grounded in the reference's package-level
/// rate-limiting middleware.
const GLOBAL_IN_FLIGHT_PERMITS: usize = 1024;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    if std::env::var("RUST_LOG").is_err() {
        unsafe { std::env::set_var("RUST_LOG", &config.log_level) };
    }
    // Return value *must* be kept in a variable or else it will be dropped and
    // Sentry integration won't work.
    let _sentry = pulsar_beam_sentry_integration::init(crate_name!(), &config.sentry_dsn, &None);

    // Several Pulsar client TLS paths require a process-wide crypto provider;
    // install it once up front before building any client.
    let _ = rustls::crypto::ring::default_provider().install_default();

    info!("Starting {} in {:?} mode", crate_name!(), config.mode);

    let guard = Arc::new(ClusterGuard::new(
        config.cluster.as_deref(),
        &config.pulsar_clusters,
    ));

    let clients = ClientPool::new(ClientPoolConfig {
        operation_timeout: config.pulsar_client_operation_timeout,
        connection_timeout: config.pulsar_client_connection_timeout,
        trust_store_path: config.trust_store.clone(),
        tls_allow_insecure_connection: config.pulsar_tls_allow_insecure_connection,
        tls_validate_hostname: config.pulsar_tls_validate_hostname,
    });
    let producers = ProducerPool::new(clients.clone(), PRODUCER_TTL, PRODUCER_SWEEP_INTERVAL);
    let consumers = ConsumerPool::new(clients.clone());

    let store: Arc<dyn Store> = build_store(&config, &clients).await?;
    store.init().await.map_err(|e| anyhow::anyhow!(e))?;

    if config.http_auth_impl != "noauth" {
        warn!(
            "HTTPAuthImpl={} requested but only 'noauth' is implemented; falling back to NoAuth",
            config.http_auth_impl
        );
    }
    if config.pulsar_public_key.is_some() || config.pulsar_private_key.is_some() {
        warn!("PulsarPublicKey/PulsarPrivateKey configured but RSA JWT signing is out of scope; ignored");
    }
    if config.cert_file.is_some() || config.key_file.is_some() {
        warn!("CertFile/KeyFile configured but this process does not terminate TLS itself; ignored");
    }

    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()?;

    let broker = WebhookBroker::new(
        store.clone(),
        consumers.clone(),
        producers.clone(),
        guard.clone(),
        http_client,
        config.pb_db_interval,
    );

    if config.mode.requires_broker() {
        broker.spawn();
        info!("webhook reconcile loop started (tick={:?})", config.pb_db_interval);
    }

    if !config.mode.requires_http_router() {
        // Broker-only mode: there is no HTTP listener to block on, so wait
        // directly for a termination signal.
        wait_for_shutdown_signal().await;
        info!("shutting down; draining in-flight webhook deliveries");
        if config.mode.requires_broker() {
            broker.shutdown().await;
        }
        return Ok(());
    }

    let state = web::Data::new(AppState {
        store,
        clients,
        producers,
        consumers,
        guard,
        token_auth: Arc::new(NoAuth),
        super_roles: SuperRoles::new(&config.super_roles),
        rate: Arc::new(Semaphore::new(GLOBAL_IN_FLIGHT_PERMITS)),
    });

    let route_sets = config.mode.route_sets();
    let port = config.port;
    let rate = state.rate.clone();

    info!("HTTP listener starting on 0.0.0.0:{port}");
    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(Logger::default())
            .wrap(RateLimit::new(rate.clone()))
            .wrap(Cors::permissive())
            .configure(|cfg| pulsar_beam_http::configure(cfg, route_sets))
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await?;

    if config.mode.requires_broker() {
        info!("HTTP listener stopped; draining in-flight webhook deliveries");
        broker.shutdown().await;
    }

    Ok(())
}

async fn build_store(config: &Config, clients: &Arc<ClientPool>) -> anyhow::Result<Arc<dyn Store>> {
    match config.pb_db_type {
        DbType::Inmemory => Ok(InMemoryStore::new()),
        DbType::PulsarAsDb => {
            let url = config
                .pulsar_broker_url
                .clone()
                .ok_or_else(|| anyhow::anyhow!("PulsarBrokerURL is required when PbDbType=pulsarAsDb"))?;
            Ok(CompactedLogStore::new(
                clients.clone(),
                url,
                config.db_password.clone(),
                config.pb_db_pulsar_topic.clone(),
            ))
        }
        DbType::Mongo => {
            let url = config
                .db_connection_str
                .clone()
                .ok_or_else(|| anyhow::anyhow!("DbConnectionStr is required when PbDbType=mongo"))?;
            let store = DocumentStore::connect(&url)
                .await
                .map_err(|e| anyhow::anyhow!(e))?;
            Ok(Arc::new(store))
        }
    }
}

async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut hangup = match signal(SignalKind::hangup()) {
        Ok(s) => s,
        Err(e) => {
            error!("could not listen for SIGHUP: {e}");
            return;
        }
    };
    let mut interrupt = match signal(SignalKind::interrupt()) {
        Ok(s) => s,
        Err(e) => {
            error!("could not listen for SIGINT: {e}");
            return;
        }
    };
    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            error!("could not listen for SIGTERM: {e}");
            return;
        }
    };

    tokio::select! {
        _ = hangup.recv() => {}
        _ = interrupt.recv() => {}
        _ = terminate.recv() => {}
    }
}
