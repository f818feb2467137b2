use chrono::{DateTime, Utc};
use gleaner_core::error::AppError;
use gleaner_core::models::{JobPosting, NewJobPosting};
use sqlx::{PgPool, Pool, Postgres};
use uuid::Uuid;

/// Repository for normalized job postings in PostgreSQL.
#[derive(Clone)]
pub struct JobPostingRepository {
    pool: Pool<Postgres>,
}

impl JobPostingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Save a new posting. Returns the generated UUID.
    pub async fn save(&self, posting: &NewJobPosting) -> Result<Uuid, AppError> {
        let row: (Uuid,) = sqlx::query_as(
            r#"
            INSERT INTO job_postings (url, data, completion_state, score, config_id, content_hash, data_hash)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(&posting.url)
        .bind(&posting.data)
        .bind(posting.completion_state.as_str())
        .bind(posting.score)
        .bind(posting.config_id)
        .bind(&posting.content_hash)
        .bind(&posting.data_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        Ok(row.0)
    }

    /// Get the most recent posting for a URL.
    pub async fn get_latest(&self, url: &str) -> Result<Option<JobPosting>, AppError> {
        let row = sqlx::query_as::<_, JobPostingRow>(
            r#"
            SELECT id, url, data, completion_state, score, config_id, content_hash, data_hash, created_at
            FROM job_postings
            WHERE url = $1
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(url)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        row.map(TryInto::try_into).transpose()
    }

    /// Get posting history for a URL, newest first.
    pub async fn get_history(&self, url: &str, limit: usize) -> Result<Vec<JobPosting>, AppError> {
        let rows = sqlx::query_as::<_, JobPostingRow>(
            r#"
            SELECT id, url, data, completion_state, score, config_id, content_hash, data_hash, created_at
            FROM job_postings
            WHERE url = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(url)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        rows.into_iter().map(TryInto::try_into).collect()
    }
}

// -- Internal row type for sqlx deserialization --

#[derive(sqlx::FromRow)]
struct JobPostingRow {
    id: Uuid,
    url: String,
    data: serde_json::Value,
    completion_state: String,
    score: f64,
    config_id: Option<Uuid>,
    content_hash: String,
    data_hash: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<JobPostingRow> for JobPosting {
    type Error = AppError;

    fn try_from(row: JobPostingRow) -> Result<Self, AppError> {
        let completion_state = row
            .completion_state
            .parse()
            .map_err(|e: String| AppError::DatabaseError(format!("Posting {}: {e}", row.id)))?;

        Ok(JobPosting {
            id: row.id,
            url: row.url,
            data: row.data,
            completion_state,
            score: row.score,
            config_id: row.config_id,
            content_hash: row.content_hash,
            data_hash: row.data_hash,
            created_at: row.created_at,
        })
    }
}

// -- Trait implementation --

impl gleaner_core::traits::JobStore for JobPostingRepository {
    async fn save(&self, posting: &NewJobPosting) -> Result<Uuid, AppError> {
        JobPostingRepository::save(self, posting).await
    }

    async fn get_latest(&self, url: &str) -> Result<Option<JobPosting>, AppError> {
        JobPostingRepository::get_latest(self, url).await
    }

    async fn get_history(&self, url: &str, limit: usize) -> Result<Vec<JobPosting>, AppError> {
        JobPostingRepository::get_history(self, url, limit).await
    }
}
