//! Domain types shared between the dashboard service and its tests
//!
//! Wire names follow the prediction service contract (snake_case fields,
//! lowercase model ids, Spanish sentiment labels).

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Models, scores, sentiments
// ============================================================================

/// External prediction model identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelId {
    Logreg,
    Lstm,
    Bert,
}

impl ModelId {
    pub const ALL: [ModelId; 3] = [ModelId::Logreg, ModelId::Lstm, ModelId::Bert];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelId::Logreg => "logreg",
            ModelId::Lstm => "lstm",
            ModelId::Bert => "bert",
        }
    }

    /// Default display name (overridable per model in config)
    pub fn display_name(&self) -> &'static str {
        match self {
            ModelId::Logreg => "Regresión Logística",
            ModelId::Lstm => "LSTM",
            ModelId::Bert => "BERT",
        }
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelId {
    type Err = String;

    /// Case-insensitive, surrounding whitespace ignored
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "logreg" => Ok(ModelId::Logreg),
            "lstm" => Ok(ModelId::Lstm),
            "bert" => Ok(ModelId::Bert),
            other => Err(format!("Unknown model: {}", other)),
        }
    }
}

/// Predicted star rating, always within 1..=5
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Score(u8);

impl Score {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn new(value: u8) -> Option<Self> {
        (Self::MIN..=Self::MAX).contains(&value).then_some(Score(value))
    }

    pub fn value(&self) -> u8 {
        self.0
    }

    /// All valid scores in ascending order
    pub fn all() -> impl DoubleEndedIterator<Item = Score> {
        (Self::MIN..=Self::MAX).map(Score)
    }
}

impl TryFrom<i64> for Score {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u8::try_from(value)
            .ok()
            .and_then(Score::new)
            .ok_or_else(|| format!("score {} outside 1..=5", value))
    }
}

impl From<Score> for u8 {
    fn from(score: Score) -> u8 {
        score.0
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Sentiment category assigned by the prediction service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sentiment {
    Positivo,
    Negativo,
    Neutro,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positivo => "Positivo",
            Sentiment::Negativo => "Negativo",
            Sentiment::Neutro => "Neutro",
        }
    }

    /// Score band used by the reference prediction service
    pub fn for_score(score: Score) -> Self {
        match score.value() {
            1 | 2 => Sentiment::Negativo,
            3 => Sentiment::Neutro,
            _ => Sentiment::Positivo,
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sentiment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Positivo" => Ok(Sentiment::Positivo),
            "Negativo" => Ok(Sentiment::Negativo),
            "Neutro" => Ok(Sentiment::Neutro),
            other => Err(format!("Unknown sentiment: {}", other)),
        }
    }
}

// ============================================================================
// Prediction request/response
// ============================================================================

/// Body of `POST /predict`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRequest {
    pub text: String,
    pub model: ModelId,
    pub product_name: String,
}

/// Normalized single prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub score: Score,
    pub sentiment: Sentiment,
    pub model: ModelId,
    pub product_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probs: Option<Vec<f64>>,
}

/// One successful call of a multi-model comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonOutcome {
    pub model: ModelId,
    pub score: Score,
    pub sentiment: Sentiment,
    pub elapsed_millis: u64,
}

// ============================================================================
// Batch analysis
// ============================================================================

/// One analyzed review of a batch; `index` is 1-based
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchItem {
    pub index: usize,
    pub text: String,
    pub score: Score,
    pub sentiment: Sentiment,
}

/// Count per sentiment category
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentimentDistribution {
    #[serde(rename = "Negativo")]
    pub negative: usize,
    #[serde(rename = "Neutro")]
    pub neutral: usize,
    #[serde(rename = "Positivo")]
    pub positive: usize,
}

impl SentimentDistribution {
    pub fn increment(&mut self, sentiment: Sentiment) {
        match sentiment {
            Sentiment::Positivo => self.positive += 1,
            Sentiment::Negativo => self.negative += 1,
            Sentiment::Neutro => self.neutral += 1,
        }
    }

    pub fn get(&self, sentiment: Sentiment) -> usize {
        match sentiment {
            Sentiment::Positivo => self.positive,
            Sentiment::Negativo => self.negative,
            Sentiment::Neutro => self.neutral,
        }
    }

    pub fn total(&self) -> usize {
        self.positive + self.negative + self.neutral
    }
}

/// Count per star value; serialized as `{"1": n, ..., "5": n}`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<String, usize>",
    into = "BTreeMap<String, usize>"
)]
pub struct ScoreDistribution {
    counts: [usize; 5],
}

impl ScoreDistribution {
    pub fn increment(&mut self, score: Score) {
        self.counts[usize::from(score.value() - 1)] += 1;
    }

    pub fn get(&self, score: Score) -> usize {
        self.counts[usize::from(score.value() - 1)]
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    /// (score, count) pairs in ascending score order
    pub fn iter(&self) -> impl Iterator<Item = (Score, usize)> + '_ {
        Score::all().map(move |score| (score, self.get(score)))
    }
}

impl TryFrom<BTreeMap<String, usize>> for ScoreDistribution {
    type Error = String;

    fn try_from(map: BTreeMap<String, usize>) -> Result<Self, Self::Error> {
        let mut dist = ScoreDistribution::default();
        for (key, count) in map {
            let score = key
                .parse::<i64>()
                .map_err(|_| format!("invalid score key: {}", key))
                .and_then(Score::try_from)?;
            dist.counts[usize::from(score.value() - 1)] = count;
        }
        Ok(dist)
    }
}

impl From<ScoreDistribution> for BTreeMap<String, usize> {
    fn from(dist: ScoreDistribution) -> Self {
        dist.iter()
            .map(|(score, count)| (score.to_string(), count))
            .collect()
    }
}

/// Aggregate over a full batch, recomputed from scratch on every aggregation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchStatistics {
    /// Arithmetic mean at full precision; see [`BatchStatistics::average_display`]
    pub average_score: f64,
    pub sentiment_distribution: SentimentDistribution,
    pub score_distribution: ScoreDistribution,
}

impl BatchStatistics {
    /// Single pass over all items
    pub fn from_items(items: &[BatchItem]) -> Self {
        let mut sentiment_distribution = SentimentDistribution::default();
        let mut score_distribution = ScoreDistribution::default();
        let mut sum: u64 = 0;

        for item in items {
            sentiment_distribution.increment(item.sentiment);
            score_distribution.increment(item.score);
            sum += u64::from(item.score.value());
        }

        let average_score = if items.is_empty() {
            0.0
        } else {
            sum as f64 / items.len() as f64
        };

        Self {
            average_score,
            sentiment_distribution,
            score_distribution,
        }
    }

    /// Average fixed to two decimals
    pub fn average_display(&self) -> String {
        format!("{:.2}", self.average_score)
    }
}

/// Complete result of one batch submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    pub items: Vec<BatchItem>,
    pub statistics: BatchStatistics,
    pub total_reviews: usize,
    pub model: ModelId,
    pub product_name: String,
}

impl BatchResult {
    pub fn new(items: Vec<BatchItem>, model: ModelId, product_name: impl Into<String>) -> Self {
        let statistics = BatchStatistics::from_items(&items);
        Self {
            total_reviews: items.len(),
            items,
            statistics,
            model,
            product_name: product_name.into(),
        }
    }
}

// ============================================================================
// Identity and history
// ============================================================================

/// Authenticated user as reported by the identity provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Provider session (tokens plus user)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    pub user: User,
}

impl Session {
    /// True when the access token expires within `margin` of now
    pub fn expires_within(&self, margin: Duration) -> bool {
        self.expires_at <= Utc::now() + margin
    }
}

/// Row to insert after a completed single prediction
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewHistoryEntry {
    pub user_id: String,
    pub product_name: String,
    pub review_text: String,
    pub model_used: ModelId,
    pub predicted_score: Score,
    pub predicted_sentiment: Sentiment,
}

impl NewHistoryEntry {
    pub fn from_prediction(user_id: &str, review_text: &str, result: &PredictionResult) -> Self {
        Self {
            user_id: user_id.to_string(),
            product_name: result.product_name.clone(),
            review_text: review_text.to_string(),
            model_used: result.model,
            predicted_score: result.score,
            predicted_sentiment: result.sentiment,
        }
    }
}

/// Stored history row
///
/// Kept loosely typed: rows written by other clients may carry values this
/// build does not know.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,
    pub user_id: String,
    pub product_name: String,
    pub review_text: String,
    pub model_used: String,
    pub predicted_score: i64,
    pub predicted_sentiment: String,
    pub created_at: DateTime<Utc>,
}

/// Row ids are uuids on the managed store and integers in SQLite
fn id_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!("invalid id: {}", other))),
    }
}
