//! rsd-ui library - Review sentiment dashboard
//!
//! Server-rendered dashboard over an external sentiment prediction service:
//! single-review analysis, multi-model comparison and batch analysis with
//! CSV export, behind email/password accounts with per-user history.

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use rsd_common::DashboardConfig;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod db;
pub mod error;
pub mod render;
pub mod services;
pub mod session;

pub use error::{ApiError, ApiResult};

use services::{
    BatchAnalyzer, HistoryStore, IdentityProvider, ModelComparator, PredictionBackend,
    PredictionClient,
};
use session::SessionManager;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Resolved configuration (immutable after startup)
    pub config: Arc<DashboardConfig>,
    /// Validating prediction client
    pub predictions: PredictionClient,
    /// Multi-model comparison
    pub comparator: ModelComparator,
    /// Batch analysis
    pub batch: BatchAnalyzer,
    /// Signed-in browser sessions
    pub sessions: SessionManager,
    /// Prediction history backend
    pub history: Arc<dyn HistoryStore>,
    /// Server start time, for uptime
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    /// Wire every component from the configuration and its three backends
    pub fn new(
        config: DashboardConfig,
        backend: Arc<dyn PredictionBackend>,
        identity: Arc<dyn IdentityProvider>,
        history: Arc<dyn HistoryStore>,
    ) -> Self {
        let config = Arc::new(config);
        let predictions = PredictionClient::new(backend, Arc::clone(&config));

        Self {
            comparator: ModelComparator::new(predictions.clone()),
            batch: BatchAnalyzer::new(predictions.clone(), config.batch_mode),
            sessions: SessionManager::new(identity),
            predictions,
            history,
            config,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
///
/// Public: health, login/signup, stylesheet. Everything else requires a
/// session; HTML routes redirect to `/login`, JSON routes answer 401.
pub fn build_router(state: AppState) -> Router {
    let pages = Router::new()
        .route("/", get(api::dashboard_page))
        .route("/predict", post(api::submit_prediction))
        .route("/compare", post(api::submit_comparison))
        .route("/batch", post(api::submit_batch))
        .route("/batch/export.csv", get(api::export_batch_csv))
        .route("/logout", post(api::logout))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::require_page_session,
        ));

    let json_api = Router::new()
        .route("/api/predict", post(api::api_predict))
        .route("/api/compare", post(api::api_compare))
        .route("/api/batch", post(api::api_batch))
        .route("/api/history", get(api::api_history))
        .route("/api/predictor/health", get(api::api_predictor_health))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::require_api_session,
        ));

    let public = Router::new()
        .route("/login", get(api::login_page).post(api::login))
        .route("/signup", post(api::signup))
        .route("/static/rsd.css", get(api::serve_css))
        .merge(api::health_routes());

    Router::new()
        .merge(pages)
        .merge(json_api)
        .merge(public)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
