//! JSON API (session-protected)

use axum::{extract::State, Extension, Json};
use rsd_common::types::{BatchResult, ComparisonOutcome, HistoryRecord, PredictionResult};
use rsd_common::ModelId;
use serde::Deserialize;

use super::analysis::predict_and_record;
use super::auth::CurrentSession;
use crate::error::ApiResult;
use crate::services::PredictorHealth;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct PredictBody {
    pub text: String,
    pub model: ModelId,
    pub product_name: String,
}

#[derive(Debug, Deserialize)]
pub struct CompareBody {
    pub text: String,
    pub product_name: String,
}

/// `reviews` is raw multi-line text, one review per line
#[derive(Debug, Deserialize)]
pub struct BatchBody {
    pub reviews: String,
    pub model: ModelId,
    pub product_name: String,
}

/// POST /api/predict
pub async fn api_predict(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
    Json(body): Json<PredictBody>,
) -> ApiResult<Json<PredictionResult>> {
    let result = predict_and_record(
        &state,
        &current.session,
        &body.text,
        body.model,
        &body.product_name,
    )
    .await?;
    Ok(Json(result))
}

/// POST /api/compare
pub async fn api_compare(
    State(state): State<AppState>,
    Json(body): Json<CompareBody>,
) -> Json<Vec<ComparisonOutcome>> {
    let outcomes = state
        .comparator
        .compare_all(&body.text, &body.product_name, &state.config.enabled_models())
        .await;
    Json(outcomes)
}

/// POST /api/batch
///
/// The result also becomes the session's exportable batch.
pub async fn api_batch(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
    Json(body): Json<BatchBody>,
) -> ApiResult<Json<BatchResult>> {
    let result = state
        .batch
        .run_batch(&body.reviews, body.model, &body.product_name)
        .await?;

    let stored = result.clone();
    state
        .sessions
        .update_dashboard(current.id, |dashboard| {
            dashboard.product_name = Some(body.product_name);
            dashboard.batch_text = body.reviews;
            dashboard.batch = Some(stored);
            dashboard.batch_error = None;
        })
        .await;

    Ok(Json(result))
}

/// GET /api/history
pub async fn api_history(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
) -> ApiResult<Json<Vec<HistoryRecord>>> {
    let rows = state
        .history
        .recent(&current.session, state.config.history.limit)
        .await?;
    Ok(Json(rows))
}

/// GET /api/predictor/health
pub async fn api_predictor_health(
    State(state): State<AppState>,
) -> ApiResult<Json<PredictorHealth>> {
    Ok(Json(state.predictions.health().await?))
}
