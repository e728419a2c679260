mod config;

use std::sync::Arc;

use tracing::{info, warn};

use futurebox_api::accounts::AccountService;
use futurebox_api::identity::SystemClock;
use futurebox_api::lifecycle::CapsuleService;
use futurebox_api::session::SessionKeys;
use futurebox_api::{AppState, AppStateInner};
use futurebox_crypto::{ContentSealer, MasterSecret};
use futurebox_db::Database;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "futurebox=debug,futurebox_api=debug,futurebox_db=info,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;
    if config.uses_dev_jwt_secret() {
        warn!("FUTUREBOX_JWT_SECRET is unset, sessions are signed with the development placeholder");
    }

    // Init database
    let db = Arc::new(Database::open(&config.db_path)?);

    // Shared state
    let secret = MasterSecret::from_config(config.crypto_secret.as_deref());
    if secret.is_fallback() {
        warn!("FUTUREBOX_CRYPTO_SECRET is unset, capsule content is sealed with the development fallback");
    }
    let state: AppState = Arc::new(AppStateInner {
        accounts: AccountService::new(db.clone(), config.passwords)?,
        capsules: CapsuleService::new(db, ContentSealer::new(secret)),
        sessions: SessionKeys::new(&config.jwt_secret, chrono::Duration::days(config.session_days)),
        clock: Arc::new(SystemClock),
    });

    let app = futurebox_api::router(state);

    let addr = config.addr()?;
    info!("FutureBox server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(e) => {
                warn!("Could not install SIGTERM handler: {}", e);
                ctrl_c.await.ok();
                info!("Received Ctrl+C, shutting down...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
