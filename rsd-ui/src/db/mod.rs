//! Local SQLite history backend
//!
//! Same columns as the provider's `reviews_history` table, keyed by the
//! provider user id.

use crate::services::HistoryStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rsd_common::types::{HistoryRecord, NewHistoryEntry, Session};
use rsd_common::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Open (creating if needed) the history database at `db_path`
pub async fn init_history_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new history database: {}", db_path.display());
    } else {
        info!("Opened existing history database: {}", db_path.display());
    }

    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;
    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    create_history_table(&pool).await?;
    Ok(pool)
}

/// Single-connection in-memory database (each connection would otherwise
/// get its own empty database)
pub async fn init_in_memory_database() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    create_history_table(&pool).await?;
    Ok(pool)
}

async fn create_history_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS reviews_history (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id TEXT NOT NULL,
            product_name TEXT NOT NULL,
            review_text TEXT NOT NULL,
            model_used TEXT NOT NULL,
            predicted_score INTEGER NOT NULL CHECK (predicted_score BETWEEN 1 AND 5),
            predicted_sentiment TEXT NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_reviews_history_user_created \
         ON reviews_history(user_id, created_at DESC)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

type HistoryRow = (i64, String, String, String, String, i64, String, DateTime<Utc>);

/// History rows in a local SQLite database
pub struct SqliteHistoryStore {
    pool: SqlitePool,
}

impl SqliteHistoryStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HistoryStore for SqliteHistoryStore {
    async fn insert(&self, _session: &Session, entry: &NewHistoryEntry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO reviews_history
                (user_id, product_name, review_text, model_used,
                 predicted_score, predicted_sentiment, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&entry.user_id)
        .bind(&entry.product_name)
        .bind(&entry.review_text)
        .bind(entry.model_used.as_str())
        .bind(i64::from(entry.predicted_score.value()))
        .bind(entry.predicted_sentiment.as_str())
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn recent(&self, session: &Session, limit: usize) -> Result<Vec<HistoryRecord>> {
        let rows: Vec<HistoryRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, product_name, review_text, model_used,
                   predicted_score, predicted_sentiment, created_at
            FROM reviews_history
            WHERE user_id = ?
            ORDER BY created_at DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(&session.user.id)
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(
                |(id, user_id, product_name, review_text, model_used, score, sentiment, created_at)| {
                    HistoryRecord {
                        id: id.to_string(),
                        user_id,
                        product_name,
                        review_text,
                        model_used,
                        predicted_score: score,
                        predicted_sentiment: sentiment,
                        created_at,
                    }
                },
            )
            .collect())
    }
}
