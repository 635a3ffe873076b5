use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use rss_post_scheduler::config::Config;
use rss_post_scheduler::gitlab::GitLabClient;
use rss_post_scheduler::scheduler::Scheduler;
use rss_post_scheduler::store::GitLabPostStore;
use rss_post_scheduler::web;
use rss_post_scheduler::workflow::PublicationWorkflow;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    // Initialize logging
    init_tracing()?;

    info!("Starting rss-post-scheduler");

    // Load and validate configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    info!(
        project = %config.store_project,
        branch = %config.store_branch,
        interval_ms = config.poll_interval.as_millis() as u64,
        "Configuration loaded"
    );

    let client = GitLabClient::new(&config.gitlab_base_url);
    let store = GitLabPostStore::new(
        client,
        config.store_project.clone(),
        config.store_branch.clone(),
        config.store_file_path.clone(),
        config.archive_file_path.clone(),
        config.store_token.clone(),
    );
    let workflow = PublicationWorkflow::new(store);

    let cycles_completed = Arc::new(AtomicU64::new(0));
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let scheduler = Scheduler::new(
        workflow,
        config.poll_interval,
        cycles_completed.clone(),
        shutdown_rx,
    );

    // Start health server in background
    let web_config = config.clone();
    let web_state = web::AppState {
        started_at: Instant::now(),
        cycles_completed,
    };
    let web_handle = tokio::spawn(async move {
        if let Err(e) = web::serve(&web_config, web_state).await {
            error!("Health server error: {e:#}");
        }
    });

    // Start the publication scheduler
    let scheduler_handle = tokio::spawn(async move {
        scheduler.run().await;
    });

    // Wait for shutdown signal
    shutdown_signal().await;

    info!("Shutting down...");

    // Signal the scheduler and let any in-flight cycle finish naturally;
    // the loop only checks the signal between cycles.
    let _ = shutdown_tx.send(true);
    if let Err(e) = scheduler_handle.await {
        error!("Scheduler task failed: {e}");
    }
    web_handle.abort();

    info!("Shutdown complete");

    Ok(())
}

fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,rss_post_scheduler=debug"));

    // Check if JSON logging is requested
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| matches!(v.to_lowercase().as_str(), "json" | "structured"))
        .unwrap_or(false);

    if use_json {
        // Structured JSON logging for production
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;
    } else {
        // Pretty-printed logging for development
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
