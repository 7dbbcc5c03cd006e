//! Startup helpers for the EmbedHub server.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use crate::auth::SessionSweeper;
use crate::core::config::AppConfig;
use crate::core::errors::HubResult;
use crate::server::{self, AppState};

/// Run the server (used by the `embedhub-server` binary).
///
/// # Returns
/// `ExitCode::SUCCESS` on graceful shutdown, `1` on failure.
#[must_use]
pub fn run() -> ExitCode {
    // Missing .env is fine; the process environment still applies.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("Starting EmbedHub v{}", env!("CARGO_PKG_VERSION"));

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {e}");
            return ExitCode::from(1);
        }
    };

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to create runtime: {e}");
            return ExitCode::from(1);
        }
    };

    if let Err(e) = rt.block_on(serve(config)) {
        tracing::error!("Server error: {e}");
        return ExitCode::from(1);
    }

    ExitCode::SUCCESS
}

/// Initialize application state without starting the server.
///
/// # Errors
/// Returns an error if a backend cannot be built.
pub async fn initialize(config: AppConfig) -> HubResult<Arc<AppState>> {
    tracing::info!(public_url = %config.server.public_url, "Initializing EmbedHub");
    AppState::new(config).await
}

async fn serve(config: AppConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let sweep_interval = Duration::from_secs(config.auth.sweep_interval_seconds);
    let state = initialize(config).await?;

    let sweeper = SessionSweeper::new(Arc::clone(&state.sessions), sweep_interval);
    let stop_sweeper = sweeper.shutdown_notifier();
    let sweeper_task = sweeper.spawn();

    let result = server::run_server(state).await;

    stop_sweeper.notify_one();
    if let Err(e) = sweeper_task.await {
        tracing::warn!("Session sweeper ended abnormally: {e}");
    }
    result
}
