pub mod deterministic;
pub mod document;
pub mod error;
pub mod file_store;
pub mod generator;
pub mod job;
pub mod matcher;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod resume;
pub mod scoring;
pub mod settings;
pub mod traits;
mod util;

#[cfg(test)]
pub(crate) mod testutil;

pub use document::{DocumentKind, FetchedDocument};
pub use error::{AppError, SchemaError};
pub use file_store::FileConfigStore;
pub use generator::{ConfigGenerator, GenerationResult};
pub use job::{ExtractedJobData, JobField, job_schema};
pub use matcher::find_match;
pub use models::{
    ExtractionConfig, ExtractionResult, ExtractionRule, JobPosting, MatchPattern, NewJobPosting,
    compute_hash,
};
pub use normalize::{Normalize, normalize_job, normalize_resume};
pub use pipeline::{
    IngestResult, IngestService, JobExtraction, JobPipeline, PipelineEvent, PipelineReporter,
    TracingPipelineReporter,
};
pub use resume::ExtractedResumeData;
pub use scoring::{CompletionState, ScoringResult, score, score_extracted_data};
pub use settings::PipelineSettings;
pub use traits::{Cleaner, ConfigStore, Extractor, Fetcher, JobStore};
