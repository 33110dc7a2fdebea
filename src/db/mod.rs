pub mod sqlite_schema;

use std::path::Path;
use std::str::FromStr;
use std::time::{Duration, Instant};

use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use thiserror::Error;

use crate::db::sqlite_schema::{split_sql_statements, RESULTS_SCHEMA_SQL};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("score must be 0 or 1, got {0}")]
    InvalidScore(i64),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Outcome of one quiz attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreRecord {
    pub user_id: String,
    pub lesson_id: i64,
    pub score: i64,
}

/// Append-only quiz results table in an embedded SQLite file.
#[derive(Debug, Clone)]
pub struct ResultStore {
    pool: SqlitePool,
}

impl ResultStore {
    /// Opens (creating if missing) the database at `path` and ensures the schema.
    pub async fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(30));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.ensure_schema().await?;
        tracing::info!(path = %path.display(), "result store ready");
        Ok(store)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Idempotent; safe on every startup.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        for stmt in split_sql_statements(RESULTS_SCHEMA_SQL) {
            sqlx::query(&stmt).execute(&self.pool).await?;
        }
        Ok(())
    }

    pub async fn record(&self, record: &ScoreRecord) -> Result<(), StoreError> {
        if !(0..=1).contains(&record.score) {
            return Err(StoreError::InvalidScore(record.score));
        }

        sqlx::query(r#"INSERT INTO "results" ("user_id", "ders_id", "score") VALUES (?, ?, ?)"#)
            .bind(&record.user_id)
            .bind(record.lesson_id)
            .bind(record.score)
            .execute(&self.pool)
            .await?;

        tracing::info!(
            user_id = %record.user_id,
            lesson_id = record.lesson_id,
            score = record.score,
            "quiz result recorded"
        );
        Ok(())
    }

    pub async fn count(&self) -> Result<i64, StoreError> {
        let count: i64 = sqlx::query_scalar(r#"SELECT COUNT(*) FROM "results""#)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Round-trip latency of a trivial query.
    pub async fn ping(&self) -> Result<Duration, StoreError> {
        let started = Instant::now();
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(started.elapsed())
    }
}
