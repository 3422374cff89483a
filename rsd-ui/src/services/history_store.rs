//! Per-user prediction history
//!
//! Two backends:
//! - [`RemoteHistoryStore`]: the provider's PostgREST table
//!   `reviews_history`, scoped by the signed-in user's token
//! - `db::SqliteHistoryStore`: a local SQLite file
//!
//! Writes happen after each completed single prediction. Callers treat
//! insert failures as non-fatal (see [`record_prediction`]).

use async_trait::async_trait;
use rsd_common::types::{HistoryRecord, NewHistoryEntry, Session};
use rsd_common::{DashboardConfig, Error, Result};
use tracing::{debug, error};

const HISTORY_TABLE: &str = "reviews_history";

/// Storage for completed predictions
#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn insert(&self, session: &Session, entry: &NewHistoryEntry) -> Result<()>;

    /// Most recent rows of the session's user, newest first
    async fn recent(&self, session: &Session, limit: usize) -> Result<Vec<HistoryRecord>>;
}

/// Insert a history row, logging and swallowing any failure
pub async fn record_prediction(store: &dyn HistoryStore, session: &Session, entry: &NewHistoryEntry) {
    match store.insert(session, entry).await {
        Ok(()) => debug!(user_id = %entry.user_id, model = %entry.model_used, "History entry saved"),
        Err(e) => error!(
            user_id = %entry.user_id,
            model = %entry.model_used,
            error = %e,
            "Failed to save history entry"
        ),
    }
}

/// PostgREST-backed history on the identity provider
pub struct RemoteHistoryStore {
    http_client: reqwest::Client,
    table_url: String,
    anon_key: String,
}

impl RemoteHistoryStore {
    pub fn new(base_url: &str, anon_key: &str) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("rsd-ui/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            table_url: format!(
                "{}/rest/v1/{}",
                base_url.trim_end_matches('/'),
                HISTORY_TABLE
            ),
            anon_key: anon_key.to_string(),
        })
    }

    pub fn from_config(config: &DashboardConfig) -> Result<Self> {
        let (url, key) = config.identity.require()?;
        Self::new(url, key)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(Error::History(format!("HTTP {}: {}", status.as_u16(), body.trim())))
    }
}

#[async_trait]
impl HistoryStore for RemoteHistoryStore {
    async fn insert(&self, session: &Session, entry: &NewHistoryEntry) -> Result<()> {
        let response = self
            .http_client
            .post(&self.table_url)
            .header("apikey", &self.anon_key)
            .header("Prefer", "return=minimal")
            .bearer_auth(&session.access_token)
            .json(entry)
            .send()
            .await
            .map_err(|e| Error::History(e.to_string()))?;

        Self::check(response).await?;
        Ok(())
    }

    async fn recent(&self, session: &Session, limit: usize) -> Result<Vec<HistoryRecord>> {
        let user_filter = format!("eq.{}", session.user.id);
        let limit = limit.to_string();

        let response = self
            .http_client
            .get(&self.table_url)
            .header("apikey", &self.anon_key)
            .bearer_auth(&session.access_token)
            .query(&[
                ("select", "*"),
                ("user_id", user_filter.as_str()),
                ("order", "created_at.desc"),
                ("limit", limit.as_str()),
            ])
            .send()
            .await
            .map_err(|e| Error::History(e.to_string()))?;

        Self::check(response)
            .await?
            .json::<Vec<HistoryRecord>>()
            .await
            .map_err(|e| Error::History(format!("Unexpected history response: {}", e)))
    }
}
