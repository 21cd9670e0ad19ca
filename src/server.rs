//! HTTP server initialization and runtime setup.
//!
//! Handles storage setup, the background sweeper, and the Axum server lifecycle.

use crate::application::services::{CleanupService, LinkService, VisitService};
use crate::config::{Config, StorageBackend};
use crate::domain::repositories::{LinkRepository, VisitRepository};
use crate::infrastructure::memory::{MemoryLinkRepository, MemoryVisitRepository};
use crate::infrastructure::persistence::{PgLinkRepository, PgVisitRepository};
use crate::routes::app_router;
use crate::state::AppState;

use anyhow::{Context, Result};
use axum::ServiceExt;
use axum::extract::Request;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Link and visit stores selected by configuration.
pub struct Storage {
    pub links: Arc<dyn LinkRepository>,
    pub visits: Arc<dyn VisitRepository>,
}

/// Creates a PostgreSQL pool with the configured limits.
///
/// # Errors
///
/// Returns an error if no connection can be established.
pub async fn connect_pool(config: &Config, database_url: &str) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_connect_timeout))
        .idle_timeout(Duration::from_secs(config.db_idle_timeout))
        .max_lifetime(Duration::from_secs(config.db_max_lifetime))
        .connect(database_url)
        .await
        .context("Failed to connect to database")?;

    Ok(pool)
}

/// Builds the configured storage backend.
///
/// For PostgreSQL, embedded migrations (tables and lookup indexes) run before
/// the stores are constructed.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub async fn build_storage(config: &Config) -> Result<Storage> {
    match config.storage_backend {
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage, data will not survive a restart");
            Ok(Storage {
                links: Arc::new(MemoryLinkRepository::new()),
                visits: Arc::new(MemoryVisitRepository::new()),
            })
        }
        StorageBackend::Postgres => {
            let database_url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL is required for the postgres storage backend")?;

            let pool = connect_pool(config, database_url).await?;
            tracing::info!("Connected to database");

            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .context("Failed to run database migrations")?;
            tracing::info!("Database migrations applied");

            let pool = Arc::new(pool);
            Ok(Storage {
                links: Arc::new(PgLinkRepository::new(pool.clone())),
                visits: Arc::new(PgVisitRepository::new(pool)),
            })
        }
    }
}

/// Runs the HTTP server with the given configuration.
///
/// Initializes:
/// - Storage backend (PostgreSQL pool and migrations, or in-memory)
/// - Link, visit and cleanup services
/// - Background expiration sweeper
/// - Axum HTTP server with graceful shutdown
///
/// On SIGINT/SIGTERM the server stops accepting connections, the sweeper is
/// cancelled, and in-flight visit writes are drained for up to
/// `SHUTDOWN_DRAIN_SECS`.
///
/// # Errors
///
/// Returns an error if:
/// - Storage initialization fails
/// - Server bind fails
/// - Server runtime error occurs
pub async fn run(config: Config) -> Result<()> {
    let storage = build_storage(&config).await?;

    let link_service = Arc::new(LinkService::new(storage.links.clone()));
    let visit_service = Arc::new(VisitService::with_retry_policy(
        storage.links.clone(),
        storage.visits.clone(),
        config.visit_retry_policy(),
    ));
    let cleanup_service = Arc::new(CleanupService::new(
        storage.links.clone(),
        config.cleanup_interval(),
        config.cleanup_timeout(),
    ));

    let shutdown = CancellationToken::new();

    let sweeper = tokio::spawn({
        let cleanup_service = cleanup_service.clone();
        let shutdown = shutdown.clone();
        async move { cleanup_service.run(shutdown).await }
    });

    let state = AppState::new(
        link_service,
        visit_service.clone(),
        shutdown.clone(),
        cleanup_service.subscribe(),
        config.behind_proxy,
        config.visit_wait(),
    );

    let app = app_router(state, &config.router_options());

    let addr: SocketAddr = config
        .listen_addr
        .parse()
        .with_context(|| format!("Invalid listen address '{}'", config.listen_addr))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{addr}");

    axum::serve(
        listener,
        ServiceExt::<Request>::into_make_service_with_connect_info::<SocketAddr>(app),
    )
    .with_graceful_shutdown({
        let shutdown = shutdown.clone();
        async move {
            shutdown_signal().await;
            shutdown.cancel();
        }
    })
    .await?;

    tracing::info!("Server stopped accepting connections");

    shutdown.cancel();
    if let Err(e) = sweeper.await {
        tracing::error!(error = %e, "Sweeper task failed");
    }

    let in_flight = visit_service.in_flight();
    if in_flight > 0 {
        tracing::info!(in_flight, "Draining visit writes");
    }
    visit_service.drain(config.shutdown_drain()).await;

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C, or on SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
