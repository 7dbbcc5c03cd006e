//! HTTP server for the EmbedHub API.
//!
//! Provides REST endpoints for:
//! - GitHub and Google sign-in
//! - Repository and Drive browsing, scraping and archives
//! - Embedding, search and namespace deletion

pub mod error;
pub mod extract;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Start the HTTP server, stopping on Ctrl+C.
///
/// # Errors
/// Returns an error if the server fails to start.
pub async fn run_server(state: Arc<AppState>) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    run_server_with_shutdown(state, shutdown_signal()).await
}

/// Start the HTTP server with graceful shutdown support.
///
/// The server will stop accepting new connections when `shutdown_signal` completes.
///
/// # Errors
/// Returns an error if the server fails to start.
pub async fn run_server_with_shutdown<F>(
    state: Arc<AppState>,
    shutdown_signal: F,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
where
    F: Future<Output = ()> + Send + 'static,
{
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let port = state.config.server.port;
    let app: Router = create_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("EmbedHub listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    Ok(())
}

/// Resolves on Ctrl+C.
pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl+C: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
