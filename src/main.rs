//! CAE job diary - Main entry point.
//!
//! Runs the ingest loop and the status refresh loop until Ctrl-C or SIGTERM.

use std::process::ExitCode;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use jobdiary_lib::config::Config;
use jobdiary_lib::db::DbPool;
use jobdiary_lib::error::AppResult;
use jobdiary_lib::services::{
    CancellableLoop, NewJobIngestor, PollDirWatcher, StatusRefresher, StatusResolver,
};
use jobdiary_lib::store::JobStore;

#[tokio::main]
async fn main() -> ExitCode {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return ExitCode::FAILURE;
    }

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    info!("========================================");
    info!("  CAE job diary");
    info!("  Environment: {}", config.environment);
    info!("========================================");

    if config.is_development() {
        warn!("Running in DEVELOPMENT mode - do not use in production!");
    }

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Job diary stopped with error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Config) -> AppResult<()> {
    let pool = DbPool::new(&config).await?;
    info!("Database connection established");

    pool.run_migrations().await?;

    let store: Arc<dyn JobStore> = Arc::new(pool);
    let token = CancellationToken::new();
    tokio::spawn(shutdown_on_signal(token.clone()));

    info!("Watching {} for submission logs", config.poll_dir.display());
    let ingestor = NewJobIngestor::new(store.clone(), StatusResolver::default())
        .with_max_race_retries(config.ingest_race_retries);
    let mut watcher = PollDirWatcher::new(config.poll_dir.clone(), ingestor);
    let ingest_loop = CancellableLoop::new(config.poll_interval_secs, token.clone());
    let ingest: JoinHandle<AppResult<()>> =
        tokio::spawn(async move { ingest_loop.run(&mut watcher).await });

    let mut refresher = StatusRefresher::new(store, StatusResolver::default());
    let update_loop = CancellableLoop::new(config.update_interval_secs, token.clone());
    let update: JoinHandle<AppResult<()>> =
        tokio::spawn(async move { update_loop.run(&mut refresher).await });

    let (ingest_result, update_result) = tokio::join!(
        wait_for("ingest", ingest, &token),
        wait_for("update", update, &token)
    );

    info!("Job diary shut down");
    ingest_result.and(update_result)
}

/// Wait for a loop task. A loop that ends on its own stops the other one too.
async fn wait_for(
    name: &str,
    handle: JoinHandle<AppResult<()>>,
    token: &CancellationToken,
) -> AppResult<()> {
    let result = match handle.await {
        Ok(result) => result,
        Err(e) => {
            error!("{} loop task panicked: {}", name, e);
            Err(std::io::Error::other(format!("{} loop task failed", name)).into())
        }
    };
    token.cancel();
    result
}

async fn shutdown_on_signal(token: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => info!("Received Ctrl-C"),
                    _ = sigterm.recv() => info!("Received SIGTERM"),
                }
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                if let Err(e) = tokio::signal::ctrl_c().await {
                    warn!("Failed to listen for Ctrl-C: {}", e);
                    return;
                }
                info!("Received Ctrl-C");
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            return;
        }
        info!("Received Ctrl-C");
    }

    info!("Shutting down, finishing current pass...");
    token.cancel();
}
