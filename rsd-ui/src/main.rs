//! rsd-ui - Review sentiment dashboard server
//!
//! Startup order: configuration, logging, identity provider, history
//! backend, prediction backend, HTTP server.

use anyhow::{Context, Result};
use clap::Parser;
use rsd_common::config::{ConfigResolver, HistoryBackend};
use rsd_common::DashboardConfig;
use rsd_ui::db::{init_history_database, SqliteHistoryStore};
use rsd_ui::services::{
    HistoryStore, HttpPredictionBackend, RemoteHistoryStore, SupabaseIdentity,
};
use rsd_ui::session::{AuthEvent, DEFAULT_IDLE_TIMEOUT_MINS};
use rsd_ui::{build_router, AppState};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "rsd-ui")]
#[command(about = "Review sentiment dashboard")]
#[command(version)]
struct Args {
    /// Config file path (overrides RSD_CONFIG and the default location)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Listen address (overrides config and RSD_BIND_ADDR)
    #[arg(short, long, value_name = "ADDR")]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Config first: it carries the default log level
    let mut config = ConfigResolver::new(args.config)
        .resolve()
        .context("Failed to load configuration")?;
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }

    // RUST_LOG wins over the configured level
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .init();

    info!(
        "Starting Review Sentiment Dashboard (rsd-ui) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    info!("Prediction service: {}", config.api_url);
    info!(
        "Models: {}",
        config
            .enabled_models()
            .iter()
            .map(|m| m.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );
    info!("Batch mode: {:?}", config.batch_mode);

    let identity = SupabaseIdentity::from_config(&config)
        .context("Identity provider is not configured (set RSD_IDENTITY_URL and RSD_IDENTITY_ANON_KEY)")?;
    let history = open_history_store(&config).await?;
    let backend = HttpPredictionBackend::new(&config)?;

    let bind_addr = config.bind_addr.clone();
    let state = AppState::new(config, Arc::new(backend), Arc::new(identity), history);
    spawn_auth_event_logger(&state);
    spawn_session_sweeper(&state);

    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", bind_addr))?;
    info!("rsd-ui listening on http://{}", bind_addr);
    info!("Health check: http://{}/health", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

async fn open_history_store(config: &DashboardConfig) -> Result<Arc<dyn HistoryStore>> {
    match config.history.backend {
        HistoryBackend::Remote => {
            info!("History backend: identity provider (reviews_history)");
            Ok(Arc::new(RemoteHistoryStore::from_config(config)?))
        }
        HistoryBackend::Sqlite => {
            let path = match &config.history.database_path {
                Some(path) => path.clone(),
                None => dirs::data_local_dir()
                    .context("No local data directory; set history.database_path")?
                    .join("rsd")
                    .join("history.db"),
            };
            info!("History backend: SQLite {}", path.display());
            let pool = init_history_database(&path).await?;
            Ok(Arc::new(SqliteHistoryStore::new(pool)))
        }
    }
}

/// How often idle sessions are swept
const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// Periodically drop sessions idle for longer than the idle window
fn spawn_session_sweeper(state: &AppState) {
    let sessions = state.sessions.clone();
    let idle = chrono::Duration::minutes(DEFAULT_IDLE_TIMEOUT_MINS);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(SESSION_SWEEP_INTERVAL);
        // First tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            sessions.evict_idle(idle).await;
        }
    });
}

/// Log authentication state changes for the life of the process
fn spawn_auth_event_logger(state: &AppState) {
    let mut events = state.sessions.on_auth_state_change();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(AuthEvent::SignedIn { user_id }) => info!(user_id = %user_id, "Auth: signed in"),
                Ok(AuthEvent::SignedOut { user_id }) => info!(user_id = %user_id, "Auth: signed out"),
                Ok(AuthEvent::TokenRefreshed { user_id }) => {
                    info!(user_id = %user_id, "Auth: token refreshed")
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Auth event logger lagged")
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}
