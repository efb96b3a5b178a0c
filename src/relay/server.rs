//! HTTP server setup and configuration.

use axum::Router;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;

use super::handlers;
use crate::config::Config;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub http_client: Client,
    pub config: Arc<Config>,
}

/// Create the axum router.
///
/// The relay answers at every path, so the single handler is installed as
/// the fallback rather than on a fixed route. Method dispatch (OPTIONS /
/// POST / 405) happens inside the handler.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .fallback(handlers::relay)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Run the HTTP server.
pub async fn run_server(config: Config) -> anyhow::Result<()> {
    let listen_addr = config.server.listen.clone();

    // Create HTTP client with reasonable defaults
    let http_client = Client::builder()
        .timeout(Duration::from_secs(120))
        .connect_timeout(Duration::from_secs(10))
        .build()?;

    let state = AppState {
        http_client,
        config: Arc::new(config),
    };

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    tracing::info!(address = %listen_addr, "Starting imgrelay server");

    axum::serve(listener, app).await?;

    Ok(())
}
