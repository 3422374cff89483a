//! Prediction service client
//!
//! Talks to the external sentiment predictor:
//! - `POST /predict`: one text, one model
//! - `POST /predict-batch`: many texts, one model
//! - `GET /health`: which models the predictor has loaded
//!
//! The transport sits behind [`PredictionBackend`] so the comparator and the
//! batch aggregator can run against in-process fakes. [`PredictionClient`]
//! adds input validation and logging on top of any backend.

use async_trait::async_trait;
use rsd_common::config::DashboardConfig;
use rsd_common::types::{BatchStatistics, PredictionRequest, PredictionResult};
use rsd_common::{Error, ModelId, Result, Score, Sentiment};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const USER_AGENT: &str = concat!("rsd-ui/", env!("CARGO_PKG_VERSION"));

/// Body of `POST /predict-batch`
#[derive(Debug, Clone, Serialize)]
pub struct BatchPredictionRequest<'a> {
    pub reviews: &'a [String],
    pub model: ModelId,
    pub product_name: &'a str,
}

/// One element of the `/predict-batch` `results` array
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResponseItem {
    pub index: usize,
    pub text: String,
    pub score: Score,
    pub sentiment: Sentiment,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probs: Option<Vec<f64>>,
}

/// `/predict-batch` response
///
/// Only `results` is relied upon; the service's own statistics are kept for
/// diagnostics and never displayed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchPredictionResponse {
    pub results: Vec<BatchResponseItem>,
    #[serde(default)]
    pub statistics: Option<BatchStatistics>,
    #[serde(default)]
    pub total_reviews: Option<usize>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub product_name: Option<String>,
}

/// `GET /health` response of the predictor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictorHealth {
    pub status: String,
    #[serde(default)]
    pub models: BTreeMap<String, bool>,
}

/// Raw transport to the prediction service
#[async_trait]
pub trait PredictionBackend: Send + Sync {
    async fn predict(&self, request: &PredictionRequest) -> Result<PredictionResult>;

    async fn predict_batch(
        &self,
        reviews: &[String],
        model: ModelId,
        product_name: &str,
    ) -> Result<BatchPredictionResponse>;

    async fn health(&self) -> Result<PredictorHealth>;
}

/// reqwest-based backend for the real service
pub struct HttpPredictionBackend {
    http_client: reqwest::Client,
    base_url: String,
}

impl HttpPredictionBackend {
    /// Build from config; no timeout unless `request_timeout_secs` is set
    pub fn new(config: &DashboardConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http_client = builder
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: config.api_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send and decode, mapping transport and status failures
    async fn read_json(&self, request: reqwest::RequestBuilder) -> Result<Value> {
        let response = request
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(Error::Service {
                status: status.as_u16(),
                message: error_detail(&body),
            });
        }

        let value: Value = serde_json::from_str(&body)
            .map_err(|e| Error::MalformedResponse(format!("invalid JSON: {}", e)))?;

        // The reference service reports some failures as 200 + {"error": ...}
        if let Some(message) = value.get("error").and_then(Value::as_str) {
            return Err(Error::Service {
                status: status.as_u16(),
                message: message.to_string(),
            });
        }

        Ok(value)
    }
}

/// Human-readable failure detail from an error body
///
/// FastAPI puts it under `detail`; anything else is passed through verbatim.
fn error_detail(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.get("detail")
                .or_else(|| v.get("error"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.trim().to_string())
}

#[async_trait]
impl PredictionBackend for HttpPredictionBackend {
    async fn predict(&self, request: &PredictionRequest) -> Result<PredictionResult> {
        let value = self
            .read_json(self.http_client.post(self.url("/predict")).json(request))
            .await?;
        serde_json::from_value(value).map_err(|e| Error::MalformedResponse(e.to_string()))
    }

    async fn predict_batch(
        &self,
        reviews: &[String],
        model: ModelId,
        product_name: &str,
    ) -> Result<BatchPredictionResponse> {
        let body = BatchPredictionRequest {
            reviews,
            model,
            product_name,
        };
        let value = self
            .read_json(self.http_client.post(self.url("/predict-batch")).json(&body))
            .await?;
        serde_json::from_value(value).map_err(|e| Error::MalformedResponse(e.to_string()))
    }

    async fn health(&self) -> Result<PredictorHealth> {
        let value = self
            .read_json(self.http_client.get(self.url("/health")))
            .await?;
        serde_json::from_value(value).map_err(|e| Error::MalformedResponse(e.to_string()))
    }
}

/// Validating client shared by all analysis components
#[derive(Clone)]
pub struct PredictionClient {
    backend: Arc<dyn PredictionBackend>,
    config: Arc<DashboardConfig>,
}

impl PredictionClient {
    pub fn new(backend: Arc<dyn PredictionBackend>, config: Arc<DashboardConfig>) -> Self {
        Self { backend, config }
    }

    /// Reject models that are unknown to or disabled in the model table
    pub fn ensure_enabled(&self, model: ModelId) -> Result<()> {
        if self.config.is_enabled(model) {
            Ok(())
        } else {
            Err(Error::InvalidInput(format!(
                "Modelo no disponible: {}",
                model
            )))
        }
    }

    /// Single prediction; no network call for blank text or a disabled model
    pub async fn predict(
        &self,
        text: &str,
        model: ModelId,
        product_name: &str,
    ) -> Result<PredictionResult> {
        if text.trim().is_empty() {
            return Err(Error::InvalidInput(
                "El texto no puede estar vacío".to_string(),
            ));
        }
        self.ensure_enabled(model)?;

        let request = PredictionRequest {
            text: text.to_string(),
            model,
            product_name: product_name.to_string(),
        };

        debug!(model = %model, product = %product_name, chars = text.len(), "Requesting prediction");
        let result = self.backend.predict(&request).await?;
        debug!(
            model = %model,
            score = result.score.value(),
            sentiment = %result.sentiment,
            "Prediction received"
        );
        Ok(result)
    }

    /// One `/predict-batch` call for an already-split review list
    pub async fn predict_batch(
        &self,
        reviews: &[String],
        model: ModelId,
        product_name: &str,
    ) -> Result<BatchPredictionResponse> {
        self.ensure_enabled(model)?;
        debug!(model = %model, reviews = reviews.len(), "Requesting batch prediction");
        self.backend.predict_batch(reviews, model, product_name).await
    }

    /// Predictor model availability
    pub async fn health(&self) -> Result<PredictorHealth> {
        self.backend.health().await
    }
}
