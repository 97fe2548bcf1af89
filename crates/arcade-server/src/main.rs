//! Arcade Server - Main entry point

use anyhow::{Context, Result};
use arcade_common::logging::{init_logging, LogConfig};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::signal;
use tracing::info;

use arcade_server::{
    api,
    catalog::{CatalogStore, MemoryCatalog, PgCatalog},
    config::{CatalogBackend, Config},
    db,
    features::{FeatureState, GamePublisher},
    ingest::StagingArea,
    storage::StorageLayout,
};

#[tokio::main]
async fn main() -> Result<()> {
    let log_config = LogConfig::builder()
        .log_file_prefix("arcade-server")
        .filter_directives("arcade_server=debug,tower_http=debug,sqlx=warn")
        .build()
        // environment variables take precedence
        .merge_env()?;

    let _logging = init_logging(&log_config)?;

    info!("Starting Arcade Server");

    let config = Config::load()?;
    info!(
        "Configuration loaded - server will bind to {}:{}",
        config.server.host, config.server.port
    );

    let layout = StorageLayout::new(&config.storage);
    layout
        .ensure_dirs()
        .await
        .context("Failed to create storage directories")?;
    StagingArea::new(&layout).purge().await;

    let catalog = connect_catalog(&config).await?;

    let publisher = GamePublisher::new(layout, Arc::clone(&catalog), config.ingest.clone());
    let state = FeatureState {
        catalog,
        publisher,
        upload_body_limit: config.upload_body_limit(),
    };

    let app = api::create_router(state, &config);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(config.server.shutdown_timeout_secs))
        .await?;

    info!("Server shut down gracefully");

    Ok(())
}

async fn connect_catalog(config: &Config) -> Result<Arc<dyn CatalogStore>> {
    match config.catalog {
        CatalogBackend::Memory => {
            info!("Using in-memory catalog; records will not survive a restart");
            Ok(Arc::new(MemoryCatalog::new()))
        },
        CatalogBackend::Postgres => {
            let pool = db::connect_with_retry(&config.database, &config.retry).await?;
            db::run_migrations(&pool).await?;
            info!("Database connection pool established");
            Ok(Arc::new(PgCatalog::new(pool)))
        },
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal(timeout_secs: u64) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        },
    }

    // in-flight publishes run on their own tasks; give them a moment
    info!("Waiting up to {} seconds for connections to close", timeout_secs);
    tokio::time::sleep(Duration::from_secs(timeout_secs.min(5))).await;
}
