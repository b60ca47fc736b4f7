//! Incident tracker server binary.

use std::net::SocketAddr;

use incident_server::{
    bootstrap_admin, config::Config, create_app, create_notifier, create_state, init_tracing,
};
use incident_store::{MemoryIncidentStore, SqliteIncidentStore, Store};
use tokio::signal;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env if present
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    init_tracing(&config.log_level, config.log_json);

    tracing::info!(
        auth_mode = ?config.auth_mode,
        persistent = config.database_url.is_some(),
        "Starting incident server"
    );

    match config.database_url.clone() {
        Some(url) => {
            let store = SqliteIncidentStore::connect(&url).await?;
            serve(config, store).await
        }
        None => {
            tracing::warn!("DATABASE_URL not set, incidents are kept in memory only");
            serve(config, MemoryIncidentStore::new()).await
        }
    }
}

async fn serve<S: Store + 'static>(config: Config, store: S) -> anyhow::Result<()> {
    let notifier = create_notifier(&config)?;
    let state = create_state(config.clone(), store, notifier)?;
    if let (Some(admin), Some(manager)) = (bootstrap_admin(&state).await?, &state.jwt_manager) {
        // Goes to the operator's terminal only, never to the log sink.
        println!(
            "Bootstrap admin token for {} (renew via POST /api/user/token):\n{}",
            admin.email,
            manager.generate_token(&admin)?
        );
    }

    let app = create_app(state.clone());
    let addr: SocketAddr = config.server_addr().parse()?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!(
        in_flight = state.controller.dispatcher().in_flight(),
        "Draining notifications"
    );
    state.controller.dispatcher().shutdown().await;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
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
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, shutting down");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, shutting down");
        }
    }
}
