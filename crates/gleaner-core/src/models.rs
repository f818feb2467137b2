use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::job::{ExtractedJobData, JobField};
use crate::scoring::{CompletionState, ScoringResult};

/// A predicate over a document and its URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum MatchPattern {
    /// CSS selector is present, optionally with a substring in the matched content.
    #[serde(rename_all = "camelCase")]
    CssExists {
        selector: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        contains: Option<String>,
    },
    /// URL matches a regex.
    UrlPattern { pattern: String },
    /// Raw document contains a literal, or matches a regex when `regex` is set.
    ContentContains {
        pattern: String,
        #[serde(default)]
        regex: bool,
    },
}

/// A single field-extraction instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "camelCase")]
pub enum ExtractionRule {
    /// Dot path into the page's schema.org `JobPosting` JSON-LD object.
    JsonLd { path: String },
    /// Element text, or an attribute value when `attribute` is set.
    Css {
        selector: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        attribute: Option<String>,
    },
    /// `<meta name=... content=...>` or `<meta property=... content=...>`.
    Meta { name: String },
    /// Regex over the visible page text.
    Regex {
        pattern: String,
        #[serde(default = "default_group")]
        group: usize,
    },
}

fn default_group() -> usize {
    1
}

/// A reusable strategy for extracting job data from a class of HTML pages.
///
/// Configs are values: a rule change produces a new config with a higher
/// `version` and the same `match_hash`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionConfig {
    pub id: Uuid,
    pub name: String,
    pub version: i32,
    pub match_patterns: Vec<MatchPattern>,
    pub match_hash: String,
    pub extract_rules: BTreeMap<JobField, Vec<ExtractionRule>>,
    pub created_at: DateTime<Utc>,
}

impl ExtractionConfig {
    /// Build a version-1 config, computing its match hash.
    pub fn new(
        name: impl Into<String>,
        match_patterns: Vec<MatchPattern>,
        extract_rules: BTreeMap<JobField, Vec<ExtractionRule>>,
    ) -> Self {
        let match_hash = compute_match_hash(&match_patterns);
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            version: 1,
            match_patterns,
            match_hash,
            extract_rules,
            created_at: Utc::now(),
        }
    }

    /// A new config for the same match signature with replaced rules.
    pub fn next_version(&self, extract_rules: BTreeMap<JobField, Vec<ExtractionRule>>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: self.name.clone(),
            version: self.version + 1,
            match_patterns: self.match_patterns.clone(),
            match_hash: self.match_hash.clone(),
            extract_rules,
            created_at: Utc::now(),
        }
    }

    /// Total number of rules across all fields.
    pub fn rule_count(&self) -> usize {
        self.extract_rules.values().map(Vec::len).sum()
    }
}

/// Hash of the canonicalized match patterns.
///
/// Each pattern is serialized and the serializations are sorted, so the hash
/// does not depend on pattern order.
pub fn compute_match_hash(patterns: &[MatchPattern]) -> String {
    let mut canonical: Vec<String> = patterns
        .iter()
        .map(|p| serde_json::to_string(p).unwrap_or_default())
        .collect();
    canonical.sort();
    compute_hash(&canonical.join("\n"))
}

/// Output of a deterministic or AI-assisted job extraction.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    pub data: ExtractedJobData,
    pub completion_state: CompletionState,
    pub scoring: ScoringResult,
}

/// A persisted, normalized job posting.
#[derive(Debug, Clone, Serialize)]
pub struct JobPosting {
    pub id: Uuid,
    pub url: String,
    pub data: serde_json::Value,
    pub completion_state: CompletionState,
    pub score: f64,
    pub config_id: Option<Uuid>,
    /// SHA-256 of the fetched document
    pub content_hash: String,
    /// SHA-256 of the normalized job JSON (for change detection)
    pub data_hash: String,
    pub created_at: DateTime<Utc>,
}

/// DTO for inserting a new job posting.
#[derive(Debug, Clone, Serialize)]
pub struct NewJobPosting {
    pub url: String,
    pub data: serde_json::Value,
    pub completion_state: CompletionState,
    pub score: f64,
    pub config_id: Option<Uuid>,
    pub content_hash: String,
    pub data_hash: String,
}

/// Compute a SHA-256 hash of a string, returned as 64-char hex.
pub fn compute_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}
