use anyhow::Context;
use clap::Parser;
use shrink_gateway::cli::{GeneratorArg, StorageBackendArg, CLI};
use shrink_gateway::telemetry::init_tracing;
use shrink_gateway::{App, AppState};
use shrink_generator::{Generator, RandomGenerator, SeqGenerator};
use shrink_limiter::{select_counter_store, AdmissionController, LocalCounterStore};
use shrink_shortener::{Shortener, ShortenerService};
use shrink_storage::{InMemoryRepository, MySqlRepository, Repository, TimeoutRepository};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, trace};

const SWEEP_INTERVAL: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CLI::parse();
    init_tracing(config.log_format)?;

    info!(
        listen_addr = %config.listen_addr,
        storage_backend = %config.storage,
        generator = %config.generator,
        "starting shrink gateway"
    );

    let shortener = build_shortener(&config).await?;

    let limiter_settings = config.limiter_settings();
    let counters = select_counter_store(&limiter_settings).await;
    spawn_sweeper(counters.local.clone());
    let admission = Arc::new(AdmissionController::new(counters.store, &limiter_settings));

    let state = AppState::new(shortener, admission)
        .with_public_base_url(config.public_base_url.clone())
        .with_shared_counters(limiter_settings.redis_url.is_some());

    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;
    info!(listen_addr = %listener.local_addr()?, "listening");

    axum::serve(
        listener,
        App::router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("shrink gateway stopped");
    Ok(())
}

async fn build_shortener(config: &CLI) -> anyhow::Result<Arc<dyn Shortener>> {
    let timeout = config.store_timeout();

    match config.storage {
        StorageBackendArg::InMemory => Ok(with_generator(
            TimeoutRepository::new(InMemoryRepository::new(), timeout),
            config,
        )),
        StorageBackendArg::Mysql => {
            let dsn = config
                .mysql_dsn
                .as_deref()
                .context("mysql dsn is required when storage backend is mysql")?;
            let repository = MySqlRepository::connect(dsn, timeout)
                .await
                .context("failed to connect to mysql")?;
            repository
                .ensure_schema()
                .await
                .context("failed to create mysql schema")?;
            Ok(with_generator(
                TimeoutRepository::new(repository, timeout),
                config,
            ))
        }
    }
}

fn with_generator<R: Repository>(repository: R, config: &CLI) -> Arc<dyn Shortener> {
    match config.generator {
        GeneratorArg::Random => service(repository, RandomGenerator::new(), config),
        GeneratorArg::Seq => service(repository, SeqGenerator::new(), config),
    }
}

fn service<R: Repository, G: Generator>(
    repository: R,
    generator: G,
    config: &CLI,
) -> Arc<dyn Shortener> {
    Arc::new(ShortenerService::new(repository, generator).with_max_attempts(config.max_attempts))
}

fn spawn_sweeper(local: LocalCounterStore) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            let removed = local.sweep_expired();
            trace!(removed, remaining = local.len(), "throttle window sweep");
        }
    });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl+C, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
