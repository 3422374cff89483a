//! Multi-model comparison
//!
//! Sends the same review to every enabled model at once and keeps whatever
//! succeeds. A failing model only costs its own row: the error is logged and
//! the remaining outcomes are returned in model-table order.

use super::prediction_client::PredictionClient;
use futures::future::join_all;
use rsd_common::types::ComparisonOutcome;
use rsd_common::ModelId;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Concurrent per-model prediction runner
#[derive(Clone)]
pub struct ModelComparator {
    client: PredictionClient,
}

impl ModelComparator {
    pub fn new(client: PredictionClient) -> Self {
        Self { client }
    }

    /// Predict `text` with every model in `enabled_models`
    ///
    /// # Returns
    /// Successful outcomes in `enabled_models` order (never completion
    /// order). Blank text returns an empty list without any request.
    pub async fn compare_all(
        &self,
        text: &str,
        product_name: &str,
        enabled_models: &[ModelId],
    ) -> Vec<ComparisonOutcome> {
        if text.trim().is_empty() {
            debug!("Comparison skipped: blank review text");
            return Vec::new();
        }

        let futures = enabled_models.iter().map(|&model| async move {
            let started = Instant::now();
            let result = self.client.predict(text, model, product_name).await;
            let elapsed_millis = (started.elapsed().as_secs_f64() * 1000.0).round() as u64;

            match result {
                Ok(prediction) => {
                    debug!(model = %model, elapsed_ms = elapsed_millis, "Model comparison call succeeded");
                    Some(ComparisonOutcome {
                        model,
                        score: prediction.score,
                        sentiment: prediction.sentiment,
                        elapsed_millis,
                    })
                }
                Err(e) => {
                    warn!(
                        model = %model,
                        product = %product_name,
                        error = %e,
                        "Model comparison call failed, dropping result"
                    );
                    None
                }
            }
        });

        // join_all yields in input order regardless of completion order
        let outcomes: Vec<ComparisonOutcome> =
            join_all(futures).await.into_iter().flatten().collect();

        info!(
            product = %product_name,
            requested = enabled_models.len(),
            succeeded = outcomes.len(),
            "Model comparison complete"
        );
        outcomes
    }
}
