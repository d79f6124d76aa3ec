//! SQLite-backed run history

use crate::history::{HistoryStore, RunRecord, StepRecord};
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

/// SQLite run history store
pub struct SqliteHistoryStore {
    pool: SqlitePool,
}

impl SqliteHistoryStore {
    /// Open (or create) a history database at `db_path`
    pub async fn new(db_path: &str) -> Result<Self> {
        let pool = SqlitePool::connect(&format!("sqlite:{}?mode=rwc", db_path))
            .await
            .context("Failed to open history database")?;

        let store = Self { pool };
        store.init().await?;

        Ok(store)
    }

    /// History database under `~/.chorus/history.db`
    pub async fn with_default_path() -> Result<Self> {
        let home = dirs::home_dir().unwrap_or_else(|| std::path::PathBuf::from("."));
        let db_dir = home.join(".chorus");
        std::fs::create_dir_all(&db_dir)?;

        let db_path = db_dir.join("history.db");
        Self::new(&db_path.to_string_lossy()).await
    }

    async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS runs (
                id TEXT PRIMARY KEY,
                pipeline TEXT NOT NULL,
                status TEXT NOT NULL,
                final_text TEXT NOT NULL,
                steps TEXT NOT NULL,
                started_at TEXT NOT NULL,
                finished_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_runs_pipeline ON runs(pipeline);
            CREATE INDEX IF NOT EXISTS idx_runs_started_at ON runs(started_at);
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    fn to_naive(dt: DateTime<Utc>) -> NaiveDateTime {
        dt.naive_utc()
    }

    fn from_naive(dt: NaiveDateTime) -> DateTime<Utc> {
        DateTime::from_naive_utc_and_offset(dt, Utc)
    }

    fn record_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<RunRecord> {
        let steps: Vec<StepRecord> = serde_json::from_str(&row.get::<String, _>("steps"))
            .context("Corrupt step trace in history row")?;

        Ok(RunRecord {
            run_id: Uuid::parse_str(&row.get::<String, _>("id"))?,
            pipeline: row.get("pipeline"),
            status: row.get("status"),
            final_text: row.get("final_text"),
            steps,
            started_at: Self::from_naive(row.get("started_at")),
            finished_at: Self::from_naive(row.get("finished_at")),
        })
    }
}

#[async_trait::async_trait]
impl HistoryStore for SqliteHistoryStore {
    async fn save_run(&self, record: &RunRecord) -> Result<()> {
        let steps = serde_json::to_string(&record.steps)?;

        sqlx::query(
            r#"
            INSERT OR REPLACE INTO runs
            (id, pipeline, status, final_text, steps, started_at, finished_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(record.run_id.to_string())
        .bind(&record.pipeline)
        .bind(&record.status)
        .bind(&record.final_text)
        .bind(steps)
        .bind(Self::to_naive(record.started_at))
        .bind(Self::to_naive(record.finished_at))
        .execute(&self.pool)
        .await
        .context("Failed to save run")?;

        Ok(())
    }

    async fn load_run(&self, run_id: Uuid) -> Result<Option<RunRecord>> {
        let row = sqlx::query(
            r#"
            SELECT id, pipeline, status, final_text, steps, started_at, finished_at
            FROM runs
            WHERE id = ?1
            "#,
        )
        .bind(run_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to load run")?;

        row.as_ref().map(Self::record_from_row).transpose()
    }

    async fn list_runs(&self, pipeline: Option<&str>, limit: usize) -> Result<Vec<RunRecord>> {
        let rows = match pipeline {
            Some(pipeline) => {
                sqlx::query(
                    r#"
                    SELECT id, pipeline, status, final_text, steps, started_at, finished_at
                    FROM runs
                    WHERE pipeline = ?1
                    ORDER BY started_at DESC
                    LIMIT ?2
                    "#,
                )
                .bind(pipeline)
                .bind(limit as i64)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query(
                    r#"
                    SELECT id, pipeline, status, final_text, steps, started_at, finished_at
                    FROM runs
                    ORDER BY started_at DESC
                    LIMIT ?1
                    "#,
                )
                .bind(limit as i64)
                .fetch_all(&self.pool)
                .await
            }
        }
        .context("Failed to list runs")?;

        rows.iter().map(Self::record_from_row).collect()
    }

    async fn list_pipelines(&self) -> Result<Vec<String>> {
        let rows = sqlx::query(
            r#"
            SELECT DISTINCT pipeline
            FROM runs
            ORDER BY pipeline ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list pipelines")?;

        Ok(rows.iter().map(|row| row.get("pipeline")).collect())
    }
}
