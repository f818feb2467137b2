//! Test utilities: mock implementations of all core traits.
//!
//! Handwritten mocks for dependency injection in unit tests.
//! All mocks use `Arc<Mutex<_>>` for interior mutability, allowing
//! test assertions on recorded calls.

use std::sync::{Arc, Mutex};

use uuid::Uuid;

use crate::document::FetchedDocument;
use crate::error::{AppError, SchemaError};
use crate::job::ExtractedJobData;
use crate::models::{ExtractionConfig, JobPosting, NewJobPosting};
use crate::pipeline::{PipelineEvent, PipelineReporter};
use crate::traits::{Cleaner, ConfigStore, Extractor, Fetcher, JobStore};

// ---------------------------------------------------------------------------
// MockFetcher
// ---------------------------------------------------------------------------

/// Mock fetcher that returns a configurable document.
#[derive(Clone)]
pub struct MockFetcher {
    /// Queue of responses. Each call pops the first element.
    /// If empty, returns a default HTML document.
    responses: Arc<Mutex<Vec<Result<FetchedDocument, AppError>>>>,
}

impl MockFetcher {
    pub fn new(html: &str) -> Self {
        Self::with_document("text/html; charset=utf-8", html)
    }

    pub fn with_document(content_type: &str, body: &str) -> Self {
        Self {
            responses: Arc::new(Mutex::new(vec![Ok(FetchedDocument {
                url: String::new(),
                body: body.to_string(),
                content_type: content_type.to_string(),
            })])),
        }
    }

    pub fn with_error(error: AppError) -> Self {
        Self {
            responses: Arc::new(Mutex::new(vec![Err(error)])),
        }
    }
}

impl Fetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedDocument, AppError> {
        let mut responses = self.responses.lock().unwrap();
        let response = if responses.is_empty() {
            Ok(FetchedDocument {
                url: String::new(),
                body: "<html><body>default</body></html>".to_string(),
                content_type: "text/html".to_string(),
            })
        } else {
            responses.remove(0)
        };
        response.map(|doc| FetchedDocument {
            url: url.to_string(),
            ..doc
        })
    }
}

// ---------------------------------------------------------------------------
// MockCleaner
// ---------------------------------------------------------------------------

/// Mock cleaner that returns its input unchanged.
#[derive(Clone)]
pub struct MockCleaner {
    error: Arc<Mutex<Option<AppError>>>,
}

impl MockCleaner {
    pub fn passthrough() -> Self {
        Self {
            error: Arc::new(Mutex::new(None)),
        }
    }

    pub fn with_error(error: AppError) -> Self {
        Self {
            error: Arc::new(Mutex::new(Some(error))),
        }
    }
}

impl Cleaner for MockCleaner {
    fn clean(&self, html: &str) -> Result<String, AppError> {
        let mut err = self.error.lock().unwrap();
        if let Some(e) = err.take() {
            return Err(e);
        }
        Ok(html.to_string())
    }
}

// ---------------------------------------------------------------------------
// MockExtractor
// ---------------------------------------------------------------------------

/// Mock AI extractor with a queue of canned results. Counts calls.
#[derive(Clone)]
pub struct MockExtractor {
    responses: Arc<Mutex<Vec<Result<ExtractedJobData, SchemaError>>>>,
    calls: Arc<Mutex<usize>>,
}

impl MockExtractor {
    pub fn new(data: ExtractedJobData) -> Self {
        Self::with_responses(vec![Ok(data)])
    }

    pub fn with_responses(responses: Vec<Result<ExtractedJobData, SchemaError>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            calls: Arc::new(Mutex::new(0)),
        }
    }

    pub fn call_count(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

impl Extractor for MockExtractor {
    async fn extract_structured(
        &self,
        _document_text: &str,
        _url: &str,
        _schema: &serde_json::Value,
    ) -> Result<ExtractedJobData, SchemaError> {
        *self.calls.lock().unwrap() += 1;
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Err(SchemaError::api("MockExtractor has no response queued"))
        } else {
            responses.remove(0)
        }
    }
}

// ---------------------------------------------------------------------------
// MockConfigStore
// ---------------------------------------------------------------------------

/// Mock config store with fixed contents that records inserts.
#[derive(Clone)]
pub struct MockConfigStore {
    configs: Arc<Mutex<Vec<ExtractionConfig>>>,
    inserted: Arc<Mutex<Vec<ExtractionConfig>>>,
    insert_error: Arc<Mutex<Option<AppError>>>,
}

impl MockConfigStore {
    pub fn new(configs: Vec<ExtractionConfig>) -> Self {
        Self {
            configs: Arc::new(Mutex::new(configs)),
            inserted: Arc::new(Mutex::new(Vec::new())),
            insert_error: Arc::new(Mutex::new(None)),
        }
    }

    /// Store that returns an error on insert.
    pub fn with_insert_error(error: AppError) -> Self {
        let store = Self::new(vec![]);
        *store.insert_error.lock().unwrap() = Some(error);
        store
    }

    pub fn inserted(&self) -> Vec<ExtractionConfig> {
        self.inserted.lock().unwrap().clone()
    }
}

impl ConfigStore for MockConfigStore {
    async fn list_all(&self) -> Result<Vec<ExtractionConfig>, AppError> {
        Ok(self.configs.lock().unwrap().clone())
    }

    async fn insert(
        &self,
        config: &ExtractionConfig,
    ) -> Result<Option<ExtractionConfig>, AppError> {
        if let Some(e) = self.insert_error.lock().unwrap().take() {
            return Err(e);
        }
        let mut configs = self.configs.lock().unwrap();
        if configs
            .iter()
            .any(|c| c.match_hash == config.match_hash && c.version == config.version)
        {
            return Ok(None);
        }
        configs.push(config.clone());
        self.inserted.lock().unwrap().push(config.clone());
        Ok(Some(config.clone()))
    }
}

// ---------------------------------------------------------------------------
// MockJobStore
// ---------------------------------------------------------------------------

/// Mock posting store that records saves and returns a configurable latest.
#[derive(Clone)]
pub struct MockJobStore {
    saved: Arc<Mutex<Vec<NewJobPosting>>>,
    latest: Arc<Mutex<Option<JobPosting>>>,
    save_error: Arc<Mutex<Option<AppError>>>,
}

impl MockJobStore {
    /// Empty store: first posting for every URL.
    pub fn empty() -> Self {
        Self {
            saved: Arc::new(Mutex::new(Vec::new())),
            latest: Arc::new(Mutex::new(None)),
            save_error: Arc::new(Mutex::new(None)),
        }
    }

    /// Store with a previous posting (for change detection tests).
    pub fn with_latest(posting: JobPosting) -> Self {
        let store = Self::empty();
        *store.latest.lock().unwrap() = Some(posting);
        store
    }

    /// Store that returns an error on save.
    pub fn with_save_error(error: AppError) -> Self {
        let store = Self::empty();
        *store.save_error.lock().unwrap() = Some(error);
        store
    }

    pub fn saved(&self) -> Vec<NewJobPosting> {
        self.saved.lock().unwrap().clone()
    }
}

impl JobStore for MockJobStore {
    async fn save(&self, posting: &NewJobPosting) -> Result<Uuid, AppError> {
        if let Some(e) = self.save_error.lock().unwrap().take() {
            return Err(e);
        }
        self.saved.lock().unwrap().push(posting.clone());
        Ok(Uuid::new_v4())
    }

    async fn get_latest(&self, _url: &str) -> Result<Option<JobPosting>, AppError> {
        Ok(self.latest.lock().unwrap().clone())
    }

    async fn get_history(&self, _url: &str, _limit: usize) -> Result<Vec<JobPosting>, AppError> {
        Ok(self.latest.lock().unwrap().iter().cloned().collect())
    }
}

// ---------------------------------------------------------------------------
// MockReporter
// ---------------------------------------------------------------------------

/// Reporter that records event names in order.
#[derive(Clone, Default)]
pub struct MockReporter {
    events: Arc<Mutex<Vec<String>>>,
}

impl MockReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl PipelineReporter for MockReporter {
    fn report(&self, event: PipelineEvent<'_>) {
        self.events.lock().unwrap().push(event.name().to_string());
    }
}
