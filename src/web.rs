//! Health endpoint: process liveness, uptime, cycle count, memory.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::Config;

/// Shared state for the health server.
#[derive(Clone)]
pub struct AppState {
    pub started_at: Instant,
    pub cycles_completed: Arc<AtomicU64>,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    cycles_completed: u64,
    memory_resident_bytes: Option<u64>,
}

/// Start the health server. Runs until the task is aborted.
///
/// # Errors
///
/// Returns an error if the listener cannot bind or the server fails.
pub async fn serve(config: &Config, state: AppState) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.web_host, config.web_port)
        .parse()
        .context("Invalid health server address")?;

    let app = Router::new()
        .route("/healthz", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    info!(addr = %addr, "Starting health endpoint");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind health endpoint")?;

    axum::serve(listener, app)
        .await
        .context("Health server error")?;

    Ok(())
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: state.started_at.elapsed().as_secs(),
        cycles_completed: state.cycles_completed.load(Ordering::Relaxed),
        memory_resident_bytes: resident_memory_bytes(),
    })
}

/// Resident set size, best-effort. Linux only; assumes 4 KiB pages.
#[cfg(target_os = "linux")]
fn resident_memory_bytes() -> Option<u64> {
    let statm = std::fs::read_to_string("/proc/self/statm").ok()?;
    let pages: u64 = statm.split_whitespace().nth(1)?.parse().ok()?;
    Some(pages * 4096)
}

#[cfg(not(target_os = "linux"))]
fn resident_memory_bytes() -> Option<u64> {
    None
}
