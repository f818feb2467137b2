use std::future::Future;

use uuid::Uuid;

use crate::document::FetchedDocument;
use crate::error::{AppError, SchemaError};
use crate::job::ExtractedJobData;
use crate::models::{ExtractionConfig, JobPosting, NewJobPosting};

/// Fetches a raw document and its content type from a URL.
pub trait Fetcher: Send + Sync + Clone {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<FetchedDocument, AppError>> + Send;
}

/// Converts raw HTML into clean Markdown text for the AI extractor.
pub trait Cleaner: Send + Sync + Clone {
    fn clean(&self, html: &str) -> Result<String, AppError>;
}

/// AI-assisted structured extraction. A black box: document text and a
/// target schema in, a job record or a [`SchemaError`] out.
///
/// Timeouts belong to the implementation; callers do not retry.
pub trait Extractor: Send + Sync + Clone {
    fn extract_structured(
        &self,
        document_text: &str,
        url: &str,
        schema: &serde_json::Value,
    ) -> impl Future<Output = Result<ExtractedJobData, SchemaError>> + Send;
}

/// Persists and lists extraction configs.
pub trait ConfigStore: Send + Sync + Clone {
    /// All known configs, in match priority order.
    fn list_all(&self) -> impl Future<Output = Result<Vec<ExtractionConfig>, AppError>> + Send;

    /// Insert unless a config with the same `(match_hash, version)` exists.
    /// Returns the stored record, or `None` when it was already present.
    fn insert(
        &self,
        config: &ExtractionConfig,
    ) -> impl Future<Output = Result<Option<ExtractionConfig>, AppError>> + Send;
}

/// Persists normalized job postings.
pub trait JobStore: Send + Sync + Clone {
    /// Save a new posting. Returns the generated UUID.
    fn save(&self, posting: &NewJobPosting) -> impl Future<Output = Result<Uuid, AppError>> + Send;

    /// Most recent posting stored for a URL.
    fn get_latest(
        &self,
        url: &str,
    ) -> impl Future<Output = Result<Option<JobPosting>, AppError>> + Send;

    /// Posting history for a URL, newest first.
    fn get_history(
        &self,
        url: &str,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<JobPosting>, AppError>> + Send;
}

/// A ConfigStore that knows no configs and keeps nothing.
#[derive(Debug, Clone)]
pub struct NullConfigStore;

impl ConfigStore for NullConfigStore {
    async fn list_all(&self) -> Result<Vec<ExtractionConfig>, AppError> {
        Ok(vec![])
    }

    async fn insert(
        &self,
        _config: &ExtractionConfig,
    ) -> Result<Option<ExtractionConfig>, AppError> {
        Ok(None)
    }
}

/// A no-op JobStore for use when persistence is not needed.
#[derive(Debug, Clone)]
pub struct NullJobStore;

impl JobStore for NullJobStore {
    async fn save(&self, _posting: &NewJobPosting) -> Result<Uuid, AppError> {
        Ok(Uuid::nil())
    }

    async fn get_latest(&self, _url: &str) -> Result<Option<JobPosting>, AppError> {
        Ok(None)
    }

    async fn get_history(&self, _url: &str, _limit: usize) -> Result<Vec<JobPosting>, AppError> {
        Ok(vec![])
    }
}
