use serde::Serialize;
use uuid::Uuid;

use crate::deterministic::extract;
use crate::document::DocumentKind;
use crate::error::AppError;
use crate::generator::ConfigGenerator;
use crate::job::ExtractedJobData;
use crate::matcher::find_match;
use crate::models::{ExtractionConfig, NewJobPosting, compute_hash};
use crate::normalize::normalize_job;
use crate::scoring::{CompletionState, ScoringResult};
use crate::settings::PipelineSettings;
use crate::traits::{Cleaner, ConfigStore, Extractor, Fetcher, JobStore};

/// Events emitted by the pipeline for monitoring/logging.
#[derive(Debug, Clone)]
pub enum PipelineEvent<'a> {
    Fetched {
        url: &'a str,
        bytes: usize,
        kind: &'a DocumentKind,
    },
    ConfigMatched {
        config: &'a ExtractionConfig,
    },
    NoConfigMatched {
        url: &'a str,
        candidates: usize,
    },
    DeterministicAccepted {
        config: &'a ExtractionConfig,
        state: CompletionState,
    },
    Escalated {
        config: &'a ExtractionConfig,
        state: CompletionState,
        threshold: CompletionState,
    },
    ConfigGenerated {
        config: &'a ExtractionConfig,
        state: CompletionState,
    },
    ExtractionFailed {
        url: &'a str,
        error: &'a str,
    },
    ConfigRejected {
        config: &'a ExtractionConfig,
        reason: &'static str,
    },
    ConfigStored {
        config: &'a ExtractionConfig,
    },
    ConfigAlreadyKnown {
        config: &'a ExtractionConfig,
    },
    ConfigStoreFailed {
        config: &'a ExtractionConfig,
        error: &'a str,
    },
    PostingSaved {
        id: Uuid,
        changed: bool,
        first: bool,
    },
}

impl PipelineEvent<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            PipelineEvent::Fetched { .. } => "fetched",
            PipelineEvent::ConfigMatched { .. } => "config_matched",
            PipelineEvent::NoConfigMatched { .. } => "no_config_matched",
            PipelineEvent::DeterministicAccepted { .. } => "deterministic_accepted",
            PipelineEvent::Escalated { .. } => "escalated",
            PipelineEvent::ConfigGenerated { .. } => "config_generated",
            PipelineEvent::ExtractionFailed { .. } => "extraction_failed",
            PipelineEvent::ConfigRejected { .. } => "config_rejected",
            PipelineEvent::ConfigStored { .. } => "config_stored",
            PipelineEvent::ConfigAlreadyKnown { .. } => "config_already_known",
            PipelineEvent::ConfigStoreFailed { .. } => "config_store_failed",
            PipelineEvent::PostingSaved { .. } => "posting_saved",
        }
    }
}

/// Trait for receiving pipeline events (decoupled logging).
pub trait PipelineReporter: Send + Sync {
    fn report(&self, event: PipelineEvent<'_>) {
        let _ = event;
    }
}

/// Reporter that uses the `tracing` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingPipelineReporter;

impl PipelineReporter for TracingPipelineReporter {
    fn report(&self, event: PipelineEvent<'_>) {
        match event {
            PipelineEvent::Fetched { url, bytes, kind } => {
                tracing::info!(%url, bytes, ?kind, "Fetched document");
            }
            PipelineEvent::ConfigMatched { config } => {
                tracing::info!(config = %config.name, version = config.version, "Config matched");
            }
            PipelineEvent::NoConfigMatched { url, candidates } => {
                tracing::info!(%url, candidates, "No config matched");
            }
            PipelineEvent::DeterministicAccepted { config, state } => {
                tracing::info!(config = %config.name, %state, "Deterministic extraction accepted");
            }
            PipelineEvent::Escalated {
                config,
                state,
                threshold,
            } => {
                tracing::info!(
                    config = %config.name,
                    %state,
                    %threshold,
                    "Deterministic extraction below threshold, escalating to AI"
                );
            }
            PipelineEvent::ConfigGenerated { config, state } => {
                tracing::info!(
                    config = %config.name,
                    version = config.version,
                    rules = config.rule_count(),
                    %state,
                    "Config generated"
                );
            }
            PipelineEvent::ExtractionFailed { url, error } => {
                tracing::warn!(%url, %error, "AI extraction failed");
            }
            PipelineEvent::ConfigRejected { config, reason } => {
                tracing::info!(config = %config.name, %reason, "Generated config not stored");
            }
            PipelineEvent::ConfigStored { config } => {
                tracing::info!(config_id = %config.id, version = config.version, "Config stored");
            }
            PipelineEvent::ConfigAlreadyKnown { config } => {
                tracing::info!(
                    match_hash = %config.match_hash,
                    version = config.version,
                    "Config already stored"
                );
            }
            PipelineEvent::ConfigStoreFailed { config, error } => {
                tracing::warn!(config = %config.name, %error, "Failed to store generated config");
            }
            PipelineEvent::PostingSaved { id, changed, first } => {
                if first {
                    tracing::info!(%id, "First posting for URL, saved");
                } else if changed {
                    tracing::info!(%id, "Posting CHANGED, saved new version");
                } else {
                    tracing::info!(%id, "Posting unchanged, saved snapshot");
                }
            }
        }
    }
}

/// Outcome of one job-extraction request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobExtraction {
    pub data: ExtractedJobData,
    pub completion_state: CompletionState,
    pub scoring: ScoringResult,
    /// Config that produced `data`. For a generated config this is the
    /// unsaved proposal.
    pub used_config: Option<ExtractionConfig>,
    pub was_config_generated: bool,
    /// Whether `used_config` accepts the page it was applied to. Always true
    /// for a matched config.
    pub config_matches_source: bool,
}

/// Routes a document through deterministic extraction, escalating to the
/// config generator when no config matches or the result scores too low.
#[derive(Clone)]
pub struct JobPipeline<C, E>
where
    C: Cleaner,
    E: Extractor,
{
    generator: ConfigGenerator<C, E>,
    settings: PipelineSettings,
}

impl<C, E> JobPipeline<C, E>
where
    C: Cleaner,
    E: Extractor,
{
    pub fn new(cleaner: C, extractor: E) -> Self {
        Self::with_settings(cleaner, extractor, PipelineSettings::default())
    }

    pub fn with_settings(cleaner: C, extractor: E, settings: PipelineSettings) -> Self {
        Self {
            generator: ConfigGenerator::new(cleaner, extractor),
            settings,
        }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Extract a job from `html`, reporting progress through `tracing`.
    pub async fn extract_job(
        &self,
        html: &str,
        url: &str,
        known_configs: &[ExtractionConfig],
    ) -> Result<JobExtraction, AppError> {
        self.extract_job_with(html, url, known_configs, &TracingPipelineReporter)
            .await
    }

    /// Extract a job from `html`.
    ///
    /// 1. Match `known_configs` against the document (first match wins)
    /// 2. On a match, extract deterministically and accept if the result
    ///    reaches the configured threshold
    /// 3. Otherwise run the config generator once
    ///
    /// A low-scoring AI result is still `Ok`; only a failed AI call is an error.
    pub async fn extract_job_with<R: PipelineReporter>(
        &self,
        html: &str,
        url: &str,
        known_configs: &[ExtractionConfig],
        reporter: &R,
    ) -> Result<JobExtraction, AppError> {
        let previous = match find_match(html, url, known_configs) {
            Some(config) => {
                reporter.report(PipelineEvent::ConfigMatched { config });
                let result = extract(html, url, config);
                let state = result.completion_state;

                if state >= self.settings.accept_state {
                    reporter.report(PipelineEvent::DeterministicAccepted { config, state });
                    return Ok(JobExtraction {
                        data: result.data,
                        completion_state: state,
                        scoring: result.scoring,
                        used_config: Some(config.clone()),
                        was_config_generated: false,
                        config_matches_source: true,
                    });
                }

                reporter.report(PipelineEvent::Escalated {
                    config,
                    state,
                    threshold: self.settings.accept_state,
                });
                Some(config)
            }
            None => {
                reporter.report(PipelineEvent::NoConfigMatched {
                    url,
                    candidates: known_configs.len(),
                });
                None
            }
        };

        let generated = match self.generator.regenerate(html, url, previous).await {
            Ok(generated) => generated,
            Err(e) => {
                reporter.report(PipelineEvent::ExtractionFailed {
                    url,
                    error: &e.to_string(),
                });
                return Err(e);
            }
        };

        reporter.report(PipelineEvent::ConfigGenerated {
            config: &generated.config,
            state: generated.completion_state,
        });

        Ok(JobExtraction {
            data: generated.extraction_result.data,
            completion_state: generated.completion_state,
            scoring: generated.extraction_result.scoring,
            used_config: Some(generated.config),
            was_config_generated: true,
            config_matches_source: generated.matches_source,
        })
    }
}

/// Result of ingesting one URL.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestResult {
    /// Normalized job record.
    pub data: ExtractedJobData,
    pub completion_state: CompletionState,
    pub score: f64,
    pub config_id: Option<Uuid>,
    pub was_config_generated: bool,
    pub config_stored: bool,
    pub content_hash: String,
    pub data_hash: String,
    pub changed: bool,
    pub posting_id: Option<Uuid>,
}

/// Orchestrates the full ingest: fetch → match/extract → normalize → persist.
///
/// Generic over all external dependencies via traits, so it runs in tests
/// without real HTTP, AI or database calls.
pub struct IngestService<F, C, E, CS, JS>
where
    F: Fetcher,
    C: Cleaner,
    E: Extractor,
    CS: ConfigStore,
    JS: JobStore,
{
    fetcher: F,
    pipeline: JobPipeline<C, E>,
    configs: CS,
    store: Option<JS>,
}

impl<F, C, E, CS, JS> IngestService<F, C, E, CS, JS>
where
    F: Fetcher,
    C: Cleaner,
    E: Extractor,
    CS: ConfigStore,
    JS: JobStore,
{
    /// Create an IngestService that does not persist postings.
    pub fn new(fetcher: F, pipeline: JobPipeline<C, E>, configs: CS) -> Self {
        Self {
            fetcher,
            pipeline,
            configs,
            store: None,
        }
    }

    /// Create an IngestService that persists postings.
    pub fn with_store(fetcher: F, pipeline: JobPipeline<C, E>, configs: CS, store: JS) -> Self {
        Self {
            fetcher,
            pipeline,
            configs,
            store: Some(store),
        }
    }

    pub async fn ingest(&self, url: &str) -> Result<IngestResult, AppError> {
        self.ingest_with(url, &TracingPipelineReporter).await
    }

    /// Run the ingest for a URL.
    ///
    /// 1. Fetch the document and reject non-markup content
    /// 2. Load known configs and run the job pipeline
    /// 3. Normalize the job record
    /// 4. Store a newly generated config that is worth keeping (failures are
    ///    reported, not returned)
    /// 5. Hash, compare with the latest posting, and save (if store available)
    pub async fn ingest_with<R: PipelineReporter>(
        &self,
        url: &str,
        reporter: &R,
    ) -> Result<IngestResult, AppError> {
        // 1. Fetch
        let document = self.fetcher.fetch(url).await?;
        let kind = document.kind();
        reporter.report(PipelineEvent::Fetched {
            url,
            bytes: document.body.len(),
            kind: &kind,
        });
        if !kind.is_markup() {
            return Err(AppError::ValidationError(format!(
                "Unsupported document type {kind:?} for {url}"
            )));
        }

        // 2. Extract
        let known = self.configs.list_all().await?;
        let extraction = self
            .pipeline
            .extract_job_with(&document.body, url, &known, reporter)
            .await?;

        // 3. Normalize
        let data = normalize_job(extraction.data);

        // 4. Store config
        let mut config_stored = false;
        let config_id = match &extraction.used_config {
            Some(config) if extraction.was_config_generated => {
                let rejected = if extraction.completion_state == CompletionState::Failed {
                    Some("extraction failed")
                } else if config.rule_count() == 0 {
                    Some("no traceable rules")
                } else if !extraction.config_matches_source {
                    Some("does not match its source page")
                } else {
                    None
                };

                if let Some(reason) = rejected {
                    reporter.report(PipelineEvent::ConfigRejected { config, reason });
                    None
                } else {
                    match self.configs.insert(config).await {
                        Ok(Some(stored)) => {
                            reporter.report(PipelineEvent::ConfigStored { config: &stored });
                            config_stored = true;
                            Some(stored.id)
                        }
                        Ok(None) => {
                            reporter.report(PipelineEvent::ConfigAlreadyKnown { config });
                            None
                        }
                        Err(e) => {
                            reporter.report(PipelineEvent::ConfigStoreFailed {
                                config,
                                error: &e.to_string(),
                            });
                            None
                        }
                    }
                }
            }
            Some(config) => Some(config.id),
            None => None,
        };

        // 5. Hash + persist
        let data_value = serde_json::to_value(&data)?;
        let content_hash = compute_hash(&document.body);
        let data_hash = compute_hash(&data_value.to_string());
        tracing::info!(
            content_hash = %&content_hash[..8],
            data_hash = %&data_hash[..8],
            state = %extraction.completion_state,
            "Job extraction complete"
        );

        let (changed, posting_id) = if let Some(store) = &self.store {
            let previous = store.get_latest(url).await?;
            let changed = match &previous {
                Some(prev) => prev.data_hash != data_hash,
                None => true,
            };

            let posting = NewJobPosting {
                url: url.to_string(),
                data: data_value,
                completion_state: extraction.completion_state,
                score: extraction.scoring.score,
                config_id,
                content_hash: content_hash.clone(),
                data_hash: data_hash.clone(),
            };
            let id = store.save(&posting).await?;
            reporter.report(PipelineEvent::PostingSaved {
                id,
                changed,
                first: previous.is_none(),
            });

            (changed, Some(id))
        } else {
            (true, None)
        };

        Ok(IngestResult {
            data,
            completion_state: extraction.completion_state,
            score: extraction.scoring.score,
            config_id,
            was_config_generated: extraction.was_config_generated,
            config_stored,
            content_hash,
            data_hash,
            changed,
            posting_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::error::SchemaError;
    use crate::job::JobField;
    use crate::models::{ExtractionRule, JobPosting, MatchPattern};
    use crate::testutil::*;
    use crate::traits::NullJobStore;

    const URL: &str = "https://careers.acme.com/jobs/7";

    const SIMPLE_PAGE: &str = r#"<html><body>
        <h1>Engineer</h1>
        <p>Acme Corp</p>
        <p>A role description long enough</p>
    </body></html>"#;

    const STRUCTURED_PAGE: &str = r#"<html><body>
        <h1 class="title">Senior Rust Engineer</h1>
        <span class="company">Acme Corporation</span>
        <div class="description">Build reliable data pipelines for hiring teams.</div>
        <span class="location">Remote, EU</span>
    </body></html>"#;

    fn ai_job() -> ExtractedJobData {
        ExtractedJobData {
            title: "Engineer".into(),
            company_name: Some("Acme Corp".into()),
            description: Some("A role description long enough".into()),
            ..Default::default()
        }
    }

    fn css(selector: &str) -> Vec<ExtractionRule> {
        vec![ExtractionRule::Css {
            selector: selector.into(),
            attribute: None,
        }]
    }

    fn acme_config() -> ExtractionConfig {
        let rules = BTreeMap::from([
            (JobField::Title, css("h1.title")),
            (JobField::CompanyName, css("span.company")),
            (JobField::Description, css("div.description")),
            (JobField::Location, css("span.location")),
        ]);
        ExtractionConfig::new(
            "careers.acme.com",
            vec![MatchPattern::UrlPattern {
                pattern: r"careers\.acme\.com".into(),
            }],
            rules,
        )
    }

    fn pipeline(extractor: MockExtractor) -> JobPipeline<MockCleaner, MockExtractor> {
        JobPipeline::new(MockCleaner::passthrough(), extractor)
    }

    #[tokio::test]
    async fn no_config_generates_with_ai() {
        let extractor = MockExtractor::new(ai_job());
        let reporter = MockReporter::new();

        let result = pipeline(extractor.clone())
            .extract_job_with(SIMPLE_PAGE, URL, &[], &reporter)
            .await
            .unwrap();

        assert!(result.was_config_generated);
        assert_eq!(result.completion_state, CompletionState::Partial);
        assert_eq!(result.scoring.earned_points, 60);
        assert_eq!(result.data, ai_job());
        assert!(result.used_config.is_some());
        assert_eq!(extractor.call_count(), 1);
        assert_eq!(
            reporter.events(),
            vec!["no_config_matched", "config_generated"]
        );
    }

    #[tokio::test]
    async fn matched_config_above_threshold_skips_ai() {
        let extractor = MockExtractor::new(ai_job());
        let config = acme_config();

        let result = pipeline(extractor.clone())
            .extract_job(STRUCTURED_PAGE, URL, std::slice::from_ref(&config))
            .await
            .unwrap();

        assert!(!result.was_config_generated);
        assert_eq!(result.completion_state, CompletionState::Sufficient);
        assert_eq!(result.data.title, "Senior Rust Engineer");
        assert_eq!(result.used_config.map(|c| c.id), Some(config.id));
        assert_eq!(extractor.call_count(), 0);
    }

    #[tokio::test]
    async fn first_matching_config_wins() {
        let extractor = MockExtractor::new(ai_job());
        let mut blocked = acme_config();
        blocked.match_patterns.push(MatchPattern::CssExists {
            selector: "div.apply-widget".into(),
            contains: None,
        });
        let config = acme_config();

        let result = pipeline(extractor)
            .extract_job(STRUCTURED_PAGE, URL, &[blocked, config.clone()])
            .await
            .unwrap();
        assert_eq!(result.used_config.map(|c| c.id), Some(config.id));
    }

    #[tokio::test]
    async fn low_score_escalates_and_bumps_version() {
        let extractor = MockExtractor::new(ai_job());
        let reporter = MockReporter::new();
        let config = acme_config();
        let settings = PipelineSettings::default().with_accept_state(CompletionState::Complete);
        let pipeline =
            JobPipeline::with_settings(MockCleaner::passthrough(), extractor.clone(), settings);

        let result = pipeline
            .extract_job_with(STRUCTURED_PAGE, URL, std::slice::from_ref(&config), &reporter)
            .await
            .unwrap();

        assert!(result.was_config_generated);
        assert_eq!(extractor.call_count(), 1);
        assert_eq!(
            reporter.events(),
            vec!["config_matched", "escalated", "config_generated"]
        );
        assert!(result.used_config.is_some());
    }

    #[tokio::test]
    async fn ai_failure_is_the_only_error() {
        let extractor = MockExtractor::with_responses(vec![Err(SchemaError::api("HTTP 500"))]);
        let reporter = MockReporter::new();

        let err = pipeline(extractor)
            .extract_job_with(SIMPLE_PAGE, URL, &[], &reporter)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Schema(SchemaError::ApiError { .. })));
        assert!(err.to_string().contains("HTTP 500"));
        assert_eq!(reporter.events(), vec!["no_config_matched", "extraction_failed"]);
    }

    #[tokio::test]
    async fn failed_ai_result_is_returned_not_raised() {
        let extractor = MockExtractor::new(ExtractedJobData {
            title: "Engineer".into(),
            ..Default::default()
        });

        let result = pipeline(extractor)
            .extract_job(SIMPLE_PAGE, URL, &[])
            .await
            .unwrap();
        assert_eq!(result.completion_state, CompletionState::Failed);
        assert!(result.was_config_generated);
    }

    // -----------------------------------------------------------------------
    // IngestService
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn ingest_stores_generated_config_and_posting() {
        let configs = MockConfigStore::new(vec![]);
        let store = MockJobStore::empty();
        let service = IngestService::with_store(
            MockFetcher::new(SIMPLE_PAGE),
            pipeline(MockExtractor::new(ai_job())),
            configs.clone(),
            store.clone(),
        );

        let result = service.ingest(URL).await.unwrap();

        assert!(result.was_config_generated);
        assert!(result.config_stored);
        assert!(result.changed);
        assert!(result.posting_id.is_some());
        assert_eq!(result.content_hash, compute_hash(SIMPLE_PAGE));

        let inserted = configs.inserted();
        assert_eq!(inserted.len(), 1);
        assert_eq!(result.config_id, Some(inserted[0].id));

        let saved = store.saved();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].url, URL);
        assert_eq!(saved[0].config_id, result.config_id);
        assert_eq!(saved[0].data["companyName"], "Acme Corp");
        assert_eq!(saved[0].completion_state, CompletionState::Partial);
    }

    #[tokio::test]
    async fn ingest_normalizes_job_data() {
        let raw = ExtractedJobData {
            title: "  Engineer ".into(),
            company_name: Some("Acme Corp ".into()),
            description: Some("A role description long enough".into()),
            salary_min: Some(90000.0),
            salary_max: Some(70000.0),
            qualifications: vec!["Rust".into(), "rust ".into()],
            ..Default::default()
        };
        let service = IngestService::<_, _, _, _, NullJobStore>::new(
            MockFetcher::new(SIMPLE_PAGE),
            pipeline(MockExtractor::new(raw)),
            MockConfigStore::new(vec![]),
        );

        let result = service.ingest(URL).await.unwrap();
        assert_eq!(result.data.title, "Engineer");
        assert_eq!(result.data.company_name.as_deref(), Some("Acme Corp"));
        assert_eq!(result.data.salary_min, Some(70000.0));
        assert_eq!(result.data.qualifications, vec!["Rust"]);
        assert_eq!(result.posting_id, None);
    }

    #[tokio::test]
    async fn config_store_failure_does_not_fail_ingest() {
        let configs = MockConfigStore::with_insert_error(AppError::DatabaseError("db down".into()));
        let store = MockJobStore::empty();
        let reporter = MockReporter::new();
        let service = IngestService::with_store(
            MockFetcher::new(SIMPLE_PAGE),
            pipeline(MockExtractor::new(ai_job())),
            configs,
            store.clone(),
        );

        let result = service.ingest_with(URL, &reporter).await.unwrap();

        assert!(!result.config_stored);
        assert_eq!(result.config_id, None);
        assert_eq!(result.completion_state, CompletionState::Partial);
        assert_eq!(store.saved().len(), 1);
        assert!(reporter.events().contains(&"config_store_failed".to_string()));
    }

    #[tokio::test]
    async fn failed_extraction_config_is_not_stored() {
        let configs = MockConfigStore::new(vec![]);
        let service = IngestService::<_, _, _, _, NullJobStore>::new(
            MockFetcher::new(SIMPLE_PAGE),
            pipeline(MockExtractor::new(ExtractedJobData {
                title: "Engineer".into(),
                ..Default::default()
            })),
            configs.clone(),
        );

        let result = service.ingest(URL).await.unwrap();
        assert_eq!(result.completion_state, CompletionState::Failed);
        assert!(!result.config_stored);
        assert!(configs.inserted().is_empty());
    }

    #[tokio::test]
    async fn config_not_matching_its_source_is_not_stored() {
        let configs = MockConfigStore::new(vec![]);
        let reporter = MockReporter::new();
        let service = IngestService::<_, _, _, _, NullJobStore>::new(
            MockFetcher::new(SIMPLE_PAGE),
            pipeline(MockExtractor::new(ai_job())),
            configs.clone(),
        );

        // Userinfo in the URL defeats the host pattern of the derived config.
        let result = service
            .ingest_with("https://bot@careers.acme.com/jobs/7", &reporter)
            .await
            .unwrap();

        assert!(result.was_config_generated);
        assert_eq!(result.completion_state, CompletionState::Partial);
        assert!(!result.config_stored);
        assert_eq!(result.config_id, None);
        assert!(configs.inserted().is_empty());
        assert!(reporter.events().contains(&"config_rejected".to_string()));
    }

    #[tokio::test]
    async fn known_config_is_reused_and_not_reinserted() {
        let config = acme_config();
        let configs = MockConfigStore::new(vec![config.clone()]);
        let extractor = MockExtractor::new(ai_job());
        let service = IngestService::<_, _, _, _, NullJobStore>::new(
            MockFetcher::new(STRUCTURED_PAGE),
            pipeline(extractor.clone()),
            configs.clone(),
        );

        let result = service.ingest(URL).await.unwrap();
        assert!(!result.was_config_generated);
        assert_eq!(result.config_id, Some(config.id));
        assert!(configs.inserted().is_empty());
        assert_eq!(extractor.call_count(), 0);
    }

    #[tokio::test]
    async fn unchanged_posting_is_detected() {
        let first = MockJobStore::empty();
        let service = IngestService::with_store(
            MockFetcher::new(STRUCTURED_PAGE),
            pipeline(MockExtractor::new(ai_job())),
            MockConfigStore::new(vec![acme_config()]),
            first.clone(),
        );
        let initial = service.ingest(URL).await.unwrap();

        let previous = JobPosting {
            id: Uuid::new_v4(),
            url: URL.into(),
            data: serde_json::to_value(&initial.data).unwrap(),
            completion_state: initial.completion_state,
            score: initial.score,
            config_id: initial.config_id,
            content_hash: initial.content_hash.clone(),
            data_hash: initial.data_hash.clone(),
            created_at: chrono::Utc::now(),
        };
        let service = IngestService::with_store(
            MockFetcher::new(STRUCTURED_PAGE),
            pipeline(MockExtractor::new(ai_job())),
            MockConfigStore::new(vec![acme_config()]),
            MockJobStore::with_latest(previous),
        );

        let again = service.ingest(URL).await.unwrap();
        assert!(!again.changed);
        assert_eq!(again.data_hash, initial.data_hash);
    }

    #[tokio::test]
    async fn non_markup_document_is_rejected() {
        let extractor = MockExtractor::new(ai_job());
        let service = IngestService::<_, _, _, _, NullJobStore>::new(
            MockFetcher::with_document("application/pdf", "%PDF-1.7"),
            pipeline(extractor.clone()),
            MockConfigStore::new(vec![]),
        );

        let err = service.ingest(URL).await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
        assert_eq!(extractor.call_count(), 0);
    }

    #[tokio::test]
    async fn fetch_error_propagates() {
        let service = IngestService::<_, _, _, _, NullJobStore>::new(
            MockFetcher::with_error(AppError::HttpError("connection refused".into())),
            pipeline(MockExtractor::new(ai_job())),
            MockConfigStore::new(vec![]),
        );

        let err = service.ingest(URL).await.unwrap_err();
        assert!(matches!(err, AppError::HttpError(_)));
    }

    #[tokio::test]
    async fn store_save_error_propagates() {
        let service = IngestService::with_store(
            MockFetcher::new(SIMPLE_PAGE),
            pipeline(MockExtractor::new(ai_job())),
            MockConfigStore::new(vec![]),
            MockJobStore::with_save_error(AppError::DatabaseError("disk full".into())),
        );

        let err = service.ingest(URL).await.unwrap_err();
        assert!(matches!(err, AppError::DatabaseError(_)));
    }
}
