//! Batch review analysis
//!
//! Splits a multi-line submission into reviews, predicts them with one
//! model and aggregates the results. Any transport or service failure aborts
//! the whole batch; there are no partial results.

use super::prediction_client::{BatchPredictionResponse, BatchResponseItem, PredictionClient};
use futures::future::join_all;
use rsd_common::config::BatchMode;
use rsd_common::types::{BatchItem, BatchResult, BatchStatistics};
use rsd_common::{Error, ModelId, Result};
use tracing::{debug, info, warn};

/// Suffix the predictor appends when it shortens a text for display
const TRUNCATION_SUFFIX: &str = "...";

/// One review per non-blank line, trimmed
pub fn split_reviews(raw_text: &str) -> Vec<String> {
    raw_text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Batch prediction runner
#[derive(Clone)]
pub struct BatchAnalyzer {
    client: PredictionClient,
    mode: BatchMode,
}

impl BatchAnalyzer {
    pub fn new(client: PredictionClient, mode: BatchMode) -> Self {
        Self { client, mode }
    }

    /// Analyze every non-blank line of `raw_text` with `model`
    ///
    /// # Errors
    /// - `EmptyInput` when no line survives trimming (no request is made)
    /// - `OrderMismatch` when the service response cannot be paired with the
    ///   submitted lines
    /// - `BatchAnalysis` wrapping any transport, service or decoding failure
    pub async fn run_batch(
        &self,
        raw_text: &str,
        model: ModelId,
        product_name: &str,
    ) -> Result<BatchResult> {
        let reviews = split_reviews(raw_text);
        if reviews.is_empty() {
            return Err(Error::EmptyInput);
        }
        self.client.ensure_enabled(model)?;

        info!(
            model = %model,
            product = %product_name,
            reviews = reviews.len(),
            mode = ?self.mode,
            "Starting batch analysis"
        );

        let items = match self.mode {
            BatchMode::Native => self.predict_native(&reviews, model, product_name).await,
            BatchMode::PerItem => self.predict_per_item(&reviews, model, product_name).await,
        }
        .map_err(|e| {
            warn!(model = %model, error = %e, "Batch analysis failed");
            e.into_batch_error()
        })?;

        let result = BatchResult::new(items, model, product_name);
        info!(
            model = %model,
            total = result.total_reviews,
            average = %result.statistics.average_display(),
            "Batch analysis complete"
        );
        Ok(result)
    }

    async fn predict_native(
        &self,
        reviews: &[String],
        model: ModelId,
        product_name: &str,
    ) -> Result<Vec<BatchItem>> {
        let response = self
            .client
            .predict_batch(reviews, model, product_name)
            .await?;
        let items = correlate(reviews, &response.results)?;
        log_statistics_disagreement(&response, &items);
        Ok(items)
    }

    /// One `/predict` per review, issued together; first failure wins
    async fn predict_per_item(
        &self,
        reviews: &[String],
        model: ModelId,
        product_name: &str,
    ) -> Result<Vec<BatchItem>> {
        let futures = reviews
            .iter()
            .map(|text| self.client.predict(text, model, product_name));

        join_all(futures)
            .await
            .into_iter()
            .zip(reviews)
            .enumerate()
            .map(|(i, (result, text))| {
                result.map(|prediction| BatchItem {
                    index: i + 1,
                    text: text.clone(),
                    score: prediction.score,
                    sentiment: prediction.sentiment,
                })
            })
            .collect()
    }
}

/// Pair response element `i` with submitted review `i`
///
/// The service must answer in submission order with 1-based indices. Its
/// `text` may be the display-truncated form; the item keeps the full text.
fn correlate(reviews: &[String], results: &[BatchResponseItem]) -> Result<Vec<BatchItem>> {
    if results.len() != reviews.len() {
        return Err(Error::OrderMismatch {
            position: reviews.len().min(results.len()) + 1,
            expected: format!("{} results", reviews.len()),
            received: format!("{} results", results.len()),
        });
    }

    reviews
        .iter()
        .zip(results)
        .enumerate()
        .map(|(i, (text, result))| {
            let position = i + 1;
            if result.index != position {
                return Err(Error::OrderMismatch {
                    position,
                    expected: format!("index {}", position),
                    received: format!("index {}", result.index),
                });
            }
            if !text_matches(text, &result.text) {
                return Err(Error::OrderMismatch {
                    position,
                    expected: text.clone(),
                    received: result.text.clone(),
                });
            }
            Ok(BatchItem {
                index: position,
                text: text.clone(),
                score: result.score,
                sentiment: result.sentiment,
            })
        })
        .collect()
}

/// Exact match, or a non-empty strict prefix followed by `...`
fn text_matches(original: &str, returned: &str) -> bool {
    if original == returned {
        return true;
    }
    match returned.strip_suffix(TRUNCATION_SUFFIX) {
        Some(prefix) => {
            !prefix.is_empty() && prefix.len() < original.len() && original.starts_with(prefix)
        }
        None => false,
    }
}

fn log_statistics_disagreement(response: &BatchPredictionResponse, items: &[BatchItem]) {
    let Some(reported) = &response.statistics else {
        return;
    };
    let computed = BatchStatistics::from_items(items);
    if reported.sentiment_distribution != computed.sentiment_distribution
        || reported.score_distribution != computed.score_distribution
        || (reported.average_score - computed.average_score).abs() > 0.005
    {
        debug!(
            reported_average = reported.average_score,
            computed_average = computed.average_score,
            "Service batch statistics differ from local aggregation; using local"
        );
    }
}
