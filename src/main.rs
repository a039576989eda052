//! daebak - Korean reading practice

use anyhow::Result;
use std::path::Path;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use daebak::{
    api::{self, AppState},
    config::Config,
    db::{self, DatabasePool},
    services::secrets::random_bytes,
};

/// How often expired password resets are purged
const RESET_CLEANUP_INTERVAL_SECS: u64 = 600;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "daebak=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting daebak...");

    // Load configuration
    let config = Config::load_with_env(Path::new("config.yml"))?;
    tracing::info!("Configuration loaded");

    let cookie_secret = if config.security.cookie_secret.is_empty() {
        tracing::warn!(
            "security.cookie_secret is not set; using an ephemeral secret, sessions will not survive a restart"
        );
        random_bytes(32)?
    } else {
        config.security.cookie_secret.as_bytes().to_vec()
    };

    // Initialize database
    let pool = db::create_pool(&config.database).await?;
    pool.ping().await?;
    tracing::info!("Database connected: {:?}", config.database.driver);

    // Run migrations
    if db::migrations::is_up_to_date(&pool).await? {
        tracing::info!("Database schema is up to date");
    } else {
        let pending = db::migrations::pending_count(&pool).await?;
        tracing::info!("Applying {} pending migration(s)", pending);
        db::migrations::run_migrations(&pool).await?;
        tracing::info!("Database migrations completed");
    }

    let state = AppState::new(pool.clone(), &config, &cookie_secret)?;

    // Purge expired password resets (runs every 10 minutes)
    {
        let resets = state.password_reset_service.clone();
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(tokio::time::Duration::from_secs(RESET_CLEANUP_INTERVAL_SECS));
            loop {
                interval.tick().await;
                match resets.purge_expired().await {
                    Ok(count) => tracing::debug!("Purged {} expired password resets", count),
                    Err(e) => tracing::error!("Failed to purge password resets: {}", e),
                }
            }
        });
    }

    // Build router
    let app = api::build_router(state, &config.server.cors_origin);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Closing database connections");
    pool.close().await;

    Ok(())
}

/// Wait for Ctrl+C, or SIGTERM on unix
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
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
                tracing::error!("Failed to listen for SIGTERM: {}", e);
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
