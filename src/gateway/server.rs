//! HTTP server lifecycle

use crate::api::build_app;
use crate::config::DataBotConfig;
use crate::error::{Error, Result};
use crate::gateway::AppState;
use tokio::net::TcpListener;

/// Bind the configured address and serve until Ctrl+C.
///
/// The memory snapshot, when configured, is written once more on shutdown.
pub async fn serve(config: &DataBotConfig, state: AppState) -> Result<()> {
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| Error::Gateway(format!("failed to bind {addr}: {e}")))?;

    tracing::info!(%addr, "DataBot API listening");

    let app = build_app(state.clone(), &config.server.cors_origins);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutting down...");
    let snapshot = {
        let memory = state.memory.lock().await;
        state.snapshot_of(&memory)
    };
    state.persist(snapshot).await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
