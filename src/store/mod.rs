//! Prediction/feedback record store.
//!
//! Every `predict` call leaves one record behind; the feedback endpoint
//! attaches a review verdict to it and the metrics endpoint aggregates the
//! counts. Records are stored as documents (detections as a JSON payload)
//! and only ever queried by equality filters.

use std::path::Path;
use std::str::FromStr;

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use tracing::info;
use uuid::Uuid;

use crate::detector::Detection;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionStatus {
    /// Stored by the predict endpoint, not reviewed yet.
    Predicted,
    /// A feedback verdict has been attached.
    Reviewed,
}

impl PredictionStatus {
    pub fn as_str(&self) -> &str {
        match self {
            PredictionStatus::Predicted => "predicted",
            PredictionStatus::Reviewed => "reviewed",
        }
    }
}

impl FromStr for PredictionStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "predicted" => Ok(PredictionStatus::Predicted),
            "reviewed" => Ok(PredictionStatus::Reviewed),
            other => anyhow::bail!("unknown prediction status: {}", other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Correct,
    Incorrect,
}

impl Verdict {
    pub fn as_str(&self) -> &str {
        match self {
            Verdict::Correct => "correct",
            Verdict::Incorrect => "incorrect",
        }
    }
}

impl FromStr for Verdict {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "correct" => Ok(Verdict::Correct),
            "incorrect" => Ok(Verdict::Incorrect),
            other => anyhow::bail!("unknown verdict: {}", other),
        }
    }
}

/// One stored prediction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub model: String,
    pub status: PredictionStatus,
    pub verdict: Option<Verdict>,
    pub detections: Vec<Detection>,
}

/// Aggregated counts served by the metrics endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeedbackMetrics {
    pub total: i64,
    pub predicted: i64,
    pub reviewed: i64,
    pub correct: i64,
    pub incorrect: i64,
}

#[derive(Clone)]
pub struct FeedbackStore {
    pool: SqlitePool,
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS prediction (
    id TEXT PRIMARY KEY,
    created_at TEXT NOT NULL,
    model TEXT NOT NULL,
    status TEXT NOT NULL,
    verdict TEXT,
    detections TEXT NOT NULL
)
"#;

impl FeedbackStore {
    /// Open (and create if missing) the store at the given sqlite file.
    pub async fn open(path: &Path) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new().connect_with(options).await?;
        sqlx::query(SCHEMA).execute(&pool).await?;
        info!("Feedback store ready at {:?}", path);
        Ok(Self { pool })
    }

    /// In-memory store, one connection so every query sees the same db.
    pub async fn open_in_memory() -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::new().in_memory(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        sqlx::query(SCHEMA).execute(&pool).await?;
        Ok(Self { pool })
    }

    /// Persist a fresh prediction with status `predicted`.
    pub async fn insert_prediction(
        &self,
        model: &str,
        detections: &[Detection],
    ) -> anyhow::Result<PredictionRecord> {
        let record = PredictionRecord {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            model: model.to_string(),
            status: PredictionStatus::Predicted,
            verdict: None,
            detections: detections.to_vec(),
        };

        let payload = serde_json::to_string(&record.detections)?;
        sqlx::query(
            "INSERT INTO prediction (id, created_at, model, status, verdict, detections)
             VALUES ($1, $2, $3, $4, NULL, $5)",
        )
        .bind(record.id.to_string())
        .bind(record.created_at)
        .bind(&record.model)
        .bind(record.status.as_str())
        .bind(payload)
        .execute(&self.pool)
        .await?;

        Ok(record)
    }

    /// Attach a review verdict; returns false when the id is unknown.
    pub async fn record_feedback(&self, id: Uuid, verdict: Verdict) -> anyhow::Result<bool> {
        let result = sqlx::query(
            "UPDATE prediction SET status = $1, verdict = $2 WHERE id = $3",
        )
        .bind(PredictionStatus::Reviewed.as_str())
        .bind(verdict.as_str())
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn get(&self, id: Uuid) -> anyhow::Result<Option<PredictionRecord>> {
        let row = sqlx::query(
            "SELECT id, created_at, model, status, verdict, detections
             FROM prediction WHERE id = $1",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let id: String = row.try_get("id")?;
        let status: String = row.try_get("status")?;
        let verdict: Option<String> = row.try_get("verdict")?;
        let detections: String = row.try_get("detections")?;

        Ok(Some(PredictionRecord {
            id: Uuid::parse_str(&id).context("malformed prediction id in store")?,
            created_at: row.try_get("created_at")?,
            model: row.try_get("model")?,
            status: status.parse()?,
            verdict: verdict.as_deref().map(str::parse).transpose()?,
            detections: serde_json::from_str(&detections)?,
        }))
    }

    async fn count_where(&self, column: &str, value: &str) -> anyhow::Result<i64> {
        // Column names come from the two fixed call sites below.
        let sql = format!("SELECT COUNT(*) AS n FROM prediction WHERE {} = $1", column);
        let row = sqlx::query(&sql).bind(value).fetch_one(&self.pool).await?;
        Ok(row.try_get("n")?)
    }

    /// Aggregate counts by status and verdict. Equality filters only.
    pub async fn metrics(&self) -> anyhow::Result<FeedbackMetrics> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM prediction")
            .fetch_one(&self.pool)
            .await?;
        let total: i64 = row.try_get("n")?;

        Ok(FeedbackMetrics {
            total,
            predicted: self
                .count_where("status", PredictionStatus::Predicted.as_str())
                .await?,
            reviewed: self
                .count_where("status", PredictionStatus::Reviewed.as_str())
                .await?,
            correct: self.count_where("verdict", Verdict::Correct.as_str()).await?,
            incorrect: self
                .count_where("verdict", Verdict::Incorrect.as_str())
                .await?,
        })
    }
}
