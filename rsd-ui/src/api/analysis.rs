//! Dashboard form submissions
//!
//! Each handler runs the analysis, stores the outcome (or its user-facing
//! error) in the session's dashboard state and redirects back to the
//! matching view (post/redirect/get).

use axum::{
    extract::State,
    response::Redirect,
    Extension, Form,
};
use rsd_common::types::{ComparisonOutcome, NewHistoryEntry, PredictionResult, Session};
use rsd_common::{Error, ModelId, Result};
use serde::Deserialize;

use super::auth::CurrentSession;
use crate::render::ViewMode;
use crate::services::history_store::record_prediction;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct PredictForm {
    pub product: String,
    pub model: String,
    pub review: String,
}

#[derive(Debug, Deserialize)]
pub struct CompareForm {
    pub product: String,
    pub review: String,
}

#[derive(Debug, Deserialize)]
pub struct BatchForm {
    pub product: String,
    pub model: String,
    pub reviews: String,
}

fn back_to(view: ViewMode) -> Redirect {
    Redirect::to(&format!("/?view={}", view.as_str()))
}

/// Message for a comparison that produced no rows
fn comparison_error(review: &str, outcomes: &[ComparisonOutcome]) -> Option<String> {
    if review.trim().is_empty() {
        Some("El texto no puede estar vacío".to_string())
    } else if outcomes.is_empty() {
        Some("Ningún modelo pudo analizar la reseña".to_string())
    } else {
        None
    }
}

fn parse_model(value: &str) -> Result<ModelId> {
    value
        .parse::<ModelId>()
        .map_err(|_| Error::InvalidInput(format!("Modelo no disponible: {}", value.trim())))
}

/// Single prediction followed by a best-effort history write
pub(crate) async fn predict_and_record(
    state: &AppState,
    session: &Session,
    text: &str,
    model: ModelId,
    product_name: &str,
) -> Result<PredictionResult> {
    let result = state.predictions.predict(text, model, product_name).await?;
    let entry = NewHistoryEntry::from_prediction(&session.user.id, text, &result);
    record_prediction(state.history.as_ref(), session, &entry).await;
    Ok(result)
}

/// POST /predict
pub async fn submit_prediction(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
    Form(form): Form<PredictForm>,
) -> Redirect {
    let outcome = match parse_model(&form.model) {
        Ok(model) => {
            predict_and_record(&state, &current.session, &form.review, model, &form.product).await
        }
        Err(e) => Err(e),
    };

    state
        .sessions
        .update_dashboard(current.id, |dashboard| {
            dashboard.product_name = Some(form.product);
            dashboard.review_text = form.review;
            match outcome {
                Ok(result) => {
                    dashboard.prediction = Some(result);
                    dashboard.prediction_error = None;
                }
                Err(e) => {
                    dashboard.prediction = None;
                    dashboard.prediction_error = Some(e.user_message());
                }
            }
        })
        .await;

    back_to(ViewMode::Simple)
}

/// POST /compare
pub async fn submit_comparison(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
    Form(form): Form<CompareForm>,
) -> Redirect {
    let outcomes = state
        .comparator
        .compare_all(&form.review, &form.product, &state.config.enabled_models())
        .await;
    let error = comparison_error(&form.review, &outcomes);

    state
        .sessions
        .update_dashboard(current.id, |dashboard| {
            dashboard.product_name = Some(form.product);
            dashboard.review_text = form.review;
            dashboard.comparison = outcomes;
            dashboard.comparison_error = error;
        })
        .await;

    back_to(ViewMode::Compare)
}

/// POST /batch
pub async fn submit_batch(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentSession>,
    Form(form): Form<BatchForm>,
) -> Redirect {
    let outcome = match parse_model(&form.model) {
        Ok(model) => state.batch.run_batch(&form.reviews, model, &form.product).await,
        Err(e) => Err(e),
    };

    state
        .sessions
        .update_dashboard(current.id, |dashboard| {
            dashboard.product_name = Some(form.product);
            dashboard.batch_text = form.reviews;
            match outcome {
                Ok(result) => {
                    dashboard.batch = Some(result);
                    dashboard.batch_error = None;
                }
                Err(e) => {
                    dashboard.batch = None;
                    dashboard.batch_error = Some(e.user_message());
                }
            }
        })
        .await;

    back_to(ViewMode::Batch)
}
