mod config;
mod db;
mod errors;
mod forms;
mod logging;
mod models;
mod routes;
mod schema;
mod security;
mod session;
mod state;
mod templates;
mod validator;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::serve;
use clap::Parser;
use tokio::net::TcpListener;
use tokio::signal;
use tower_sessions::MemoryStore;
use tracing_subscriber::EnvFilter;

use config::{Config, SessionBackend};
use db::establish_pool;
use models::{PgSnippetRepository, PgUserRepository};
use routes::create_router;
use session::{PgSessionStore, session_layer, spawn_cleanup};
use state::AppState;
use templates::TemplateCache;

const SESSION_CLEANUP_PERIOD: Duration = Duration::from_secs(5 * 60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();

    let pool = establish_pool(&config.database_url).await?;
    let templates = TemplateCache::new().context("failed to build template cache")?;

    let state = AppState {
        snippets: Arc::new(PgSnippetRepository::new(pool.clone())),
        users: Arc::new(PgUserRepository::new(pool.clone())),
        templates: Arc::new(templates),
        debug: config.debug,
    };

    let lifetime = time::Duration::hours(i64::from(config.session_lifetime_hours));
    let request_timeout = Duration::from_secs(config.request_timeout_secs);

    let (router, cleanup) = match config.session_store {
        SessionBackend::Postgres => {
            let store = PgSessionStore::new(pool);
            let cleanup = spawn_cleanup(store.clone(), SESSION_CLEANUP_PERIOD);
            let sessions = session_layer(store, lifetime, config.secure_cookies);
            (
                create_router(state, sessions, &config.static_dir, request_timeout),
                Some(cleanup),
            )
        }
        SessionBackend::Memory => {
            tracing::warn!("Sessions are kept in memory and will not survive a restart");
            let sessions = session_layer(MemoryStore::default(), lifetime, config.secure_cookies);
            (
                create_router(state, sessions, &config.static_dir, request_timeout),
                None,
            )
        }
    };
    let app = router.into_make_service_with_connect_info::<SocketAddr>();

    let listener = TcpListener::bind(&config.addr)
        .await
        .with_context(|| format!("failed to bind {}", config.addr))?;
    tracing::info!(
        addr = %config.addr,
        debug = config.debug,
        session_store = ?config.session_store,
        "Starting server"
    );

    serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    if let Some(cleanup) = cleanup {
        cleanup.abort();
    }
    tracing::info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(error = %err, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
        tracing::info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                tracing::info!("Received terminate signal, shutting down");
            }
            Err(err) => {
                tracing::error!(error = %err, "Failed to install signal handler");
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
}
