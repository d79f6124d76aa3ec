//! Run history persistence

#[cfg(feature = "sqlite")]
pub mod store;

#[cfg(feature = "sqlite")]
pub use store::SqliteHistoryStore;

use crate::core::{PipelineResult, RunStatus};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One step of a persisted run trace
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    pub index: usize,
    pub role: String,
    pub model_id: String,
    pub output: String,
    /// Rendered step error, `None` for successful steps
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Persisted record of one pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: Uuid,

    pub pipeline: String,

    /// "ok", "partial", or "failed"
    pub status: String,

    pub final_text: String,

    pub steps: Vec<StepRecord>,

    pub started_at: DateTime<Utc>,

    pub finished_at: DateTime<Utc>,
}

impl RunRecord {
    pub fn from_result(result: &PipelineResult) -> Self {
        Self {
            run_id: result.run_id,
            pipeline: result.pipeline.clone(),
            status: result.status.to_string(),
            final_text: result.final_text.clone(),
            steps: result
                .steps
                .iter()
                .map(|s| StepRecord {
                    index: s.index,
                    role: s.role.clone(),
                    model_id: s.model_id.clone(),
                    output: s.output.clone(),
                    error: s.error.as_ref().map(|e| e.to_string()),
                    started_at: s.started_at,
                    finished_at: s.finished_at,
                })
                .collect(),
            started_at: result.started_at,
            finished_at: result.finished_at,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.status == RunStatus::Ok.to_string()
    }
}

/// Trait for history backends
#[async_trait::async_trait]
pub trait HistoryStore: Send + Sync {
    /// Save a completed run
    async fn save_run(&self, record: &RunRecord) -> Result<()>;

    /// Load a run by ID
    async fn load_run(&self, run_id: Uuid) -> Result<Option<RunRecord>>;

    /// List recent runs, newest first, optionally filtered by pipeline
    async fn list_runs(&self, pipeline: Option<&str>, limit: usize) -> Result<Vec<RunRecord>>;

    /// Distinct pipeline names with recorded runs
    async fn list_pipelines(&self) -> Result<Vec<String>>;
}

/// In-memory history (for testing or ephemeral use)
pub struct InMemoryHistory {
    runs: tokio::sync::RwLock<Vec<RunRecord>>,
}

impl InMemoryHistory {
    pub fn new() -> Self {
        Self {
            runs: tokio::sync::RwLock::new(Vec::new()),
        }
    }
}

impl Default for InMemoryHistory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl HistoryStore for InMemoryHistory {
    async fn save_run(&self, record: &RunRecord) -> Result<()> {
        let mut runs = self.runs.write().await;
        runs.push(record.clone());
        Ok(())
    }

    async fn load_run(&self, run_id: Uuid) -> Result<Option<RunRecord>> {
        let runs = self.runs.read().await;
        Ok(runs.iter().find(|r| r.run_id == run_id).cloned())
    }

    async fn list_runs(&self, pipeline: Option<&str>, limit: usize) -> Result<Vec<RunRecord>> {
        let runs = self.runs.read().await;
        let mut matched: Vec<RunRecord> = runs
            .iter()
            .filter(|r| pipeline.map_or(true, |p| r.pipeline == p))
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        matched.truncate(limit);
        Ok(matched)
    }

    async fn list_pipelines(&self) -> Result<Vec<String>> {
        let runs = self.runs.read().await;
        let mut names: Vec<String> = runs.iter().map(|r| r.pipeline.clone()).collect();
        names.sort();
        names.dedup();
        Ok(names)
    }
}
