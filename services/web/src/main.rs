use anyhow::{Context, Result};
use std::{net::SocketAddr, path::Path, sync::Arc, time::Duration};
use tracing::{Level, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

mod config;
mod context;
mod csrf;
mod error;
mod forms;
mod handlers;
mod middleware;
mod routes;
mod session;
mod state;
mod templates;
#[cfg(test)]
mod testutils;

use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use common::{cache::RedisPool, database, repositories::Repositories};
use tokio::net::TcpListener;

use crate::{
    config::AppConfig,
    session::{MemoryStore, RedisStore, SessionManager, SessionStore},
    state::AppState,
    templates::TemplateCache,
};

/// Time given to in-flight requests once shutdown starts
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::from_env()?;

    // Initialize logging
    let level = if config.debug { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_file(config.debug)
        .with_line_number(config.debug)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("setting default subscriber failed")?;

    info!("Starting snippetbox");

    // Initialize database connection pool
    let pool = database::init_pool(&config.database()).await?;
    if database::health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }
    database::run_migrations(&pool).await?;

    let store: Arc<dyn SessionStore> = match &config.redis_url {
        Some(url) => {
            let redis = RedisPool::connect(url).await?;
            redis.health_check().await.context("Redis health check")?;
            Arc::new(RedisStore::new(redis))
        }
        None => {
            warn!("REDIS_URL is not set, sessions are kept in memory");
            Arc::new(MemoryStore::default())
        }
    };

    let state = AppState {
        repositories: Repositories::postgres(pool),
        templates: Arc::new(TemplateCache::new().context("parse templates")?),
        sessions: SessionManager::new(store, config.session_lifetime()),
    };

    let app = routes::create_router(state, &config.static_dir);
    let addr = config.listen_addr()?;

    match config.tls() {
        Some((cert, key)) => serve_tls(app, addr, cert, key).await?,
        None => serve(app, addr).await?,
    }

    info!("Snippetbox stopped");
    Ok(())
}

async fn serve(app: Router, addr: SocketAddr) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind {}", addr))?;
    info!(%addr, "starting server");

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn serve_tls(app: Router, addr: SocketAddr, cert: &Path, key: &Path) -> Result<()> {
    let tls = RustlsConfig::from_pem_file(cert, key)
        .await
        .context("load TLS certificate and key")?;

    let handle = axum_server::Handle::new();
    let shutdown = handle.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        shutdown.graceful_shutdown(Some(SHUTDOWN_GRACE));
    });

    info!(%addr, "starting server with TLS");
    axum_server::bind_rustls(addr, tls)
        .handle(handle)
        .serve(app.into_make_service_with_connect_info::<SocketAddr>())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
