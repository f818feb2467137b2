use chrono::{DateTime, Utc};
use gleaner_core::error::AppError;
use gleaner_core::models::ExtractionConfig;
use sqlx::{PgPool, Pool, Postgres};
use uuid::Uuid;

const CONFIG_COLUMNS: &str =
    "id, name, version, match_patterns, match_hash, extract_rules, created_at";

/// Repository for learned extraction configs in PostgreSQL.
#[derive(Clone)]
pub struct ConfigRepository {
    pool: Pool<Postgres>,
}

impl ConfigRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a config unless `(match_hash, version)` is already stored.
    ///
    /// Returns the stored row, or `None` on conflict.
    pub async fn insert(
        &self,
        config: &ExtractionConfig,
    ) -> Result<Option<ExtractionConfig>, AppError> {
        let match_patterns = serde_json::to_value(&config.match_patterns)?;
        let extract_rules = serde_json::to_value(&config.extract_rules)?;

        let row = sqlx::query_as::<_, ConfigRow>(&format!(
            r#"
            INSERT INTO extraction_configs (id, name, version, match_patterns, match_hash, extract_rules, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (match_hash, version) DO NOTHING
            RETURNING {CONFIG_COLUMNS}
            "#
        ))
        .bind(config.id)
        .bind(&config.name)
        .bind(config.version)
        .bind(&match_patterns)
        .bind(&config.match_hash)
        .bind(&extract_rules)
        .bind(config.created_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        row.map(TryInto::try_into).transpose()
    }

    /// All configs in match priority order: newest version first, then
    /// newest row.
    pub async fn list_all(&self) -> Result<Vec<ExtractionConfig>, AppError> {
        let rows = sqlx::query_as::<_, ConfigRow>(&format!(
            r#"
            SELECT {CONFIG_COLUMNS}
            FROM extraction_configs
            ORDER BY version DESC, created_at DESC
            "#
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Every version stored for one match signature, newest first.
    pub async fn get_versions(&self, match_hash: &str) -> Result<Vec<ExtractionConfig>, AppError> {
        let rows = sqlx::query_as::<_, ConfigRow>(&format!(
            r#"
            SELECT {CONFIG_COLUMNS}
            FROM extraction_configs
            WHERE match_hash = $1
            ORDER BY version DESC
            "#
        ))
        .bind(match_hash)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        rows.into_iter().map(TryInto::try_into).collect()
    }
}

// -- Internal row type for sqlx deserialization --

#[derive(sqlx::FromRow)]
struct ConfigRow {
    id: Uuid,
    name: String,
    version: i32,
    match_patterns: serde_json::Value,
    match_hash: String,
    extract_rules: serde_json::Value,
    created_at: DateTime<Utc>,
}

impl TryFrom<ConfigRow> for ExtractionConfig {
    type Error = AppError;

    fn try_from(row: ConfigRow) -> Result<Self, AppError> {
        let id = row.id;
        let corrupt = |what: &str, e: serde_json::Error| {
            AppError::DatabaseError(format!("Config {id} has invalid {what}: {e}"))
        };
        Ok(ExtractionConfig {
            id,
            name: row.name,
            version: row.version,
            match_patterns: serde_json::from_value(row.match_patterns)
                .map_err(|e| corrupt("match_patterns", e))?,
            match_hash: row.match_hash,
            extract_rules: serde_json::from_value(row.extract_rules)
                .map_err(|e| corrupt("extract_rules", e))?,
            created_at: row.created_at,
        })
    }
}

// -- Trait implementation --

impl gleaner_core::traits::ConfigStore for ConfigRepository {
    async fn list_all(&self) -> Result<Vec<ExtractionConfig>, AppError> {
        ConfigRepository::list_all(self).await
    }

    async fn insert(
        &self,
        config: &ExtractionConfig,
    ) -> Result<Option<ExtractionConfig>, AppError> {
        ConfigRepository::insert(self, config).await
    }
}
