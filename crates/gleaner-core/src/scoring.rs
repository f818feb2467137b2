//! Weighted completeness scoring for job extractions.
//!
//! A field is present when its trimmed text is at least [`MIN_FIELD_LENGTH`]
//! characters long. List fields are joined with `", "` before the check, so a
//! list holding a single two-letter item is still absent.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::job::{ExtractedJobData, JobField};

/// Minimum trimmed length, in characters, for a field to count as present.
pub const MIN_FIELD_LENGTH: usize = 5;

/// Points available across all weighted fields.
pub const MAX_POINTS: u32 = 100;

/// Field weights. Sums to [`MAX_POINTS`].
pub const FIELD_WEIGHTS: &[(&str, u32)] = &[
    ("title", 20),
    ("companyName", 15),
    ("description", 25),
    ("location", 10),
    ("salaryMin", 5),
    ("salaryMax", 5),
    ("qualifications", 5),
    ("responsibilities", 5),
    ("benefits", 5),
    ("jobType", 3),
    ("experienceLevel", 2),
];

/// Fields whose absence fails the extraction outright.
pub const REQUIRED_FIELDS: &[&str] = &["title", "companyName", "description"];

/// Quality tier of an extraction, ordered from worst to best.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompletionState {
    Failed,
    Minimal,
    Partial,
    Sufficient,
    Complete,
}

impl CompletionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompletionState::Failed => "failed",
            CompletionState::Minimal => "minimal",
            CompletionState::Partial => "partial",
            CompletionState::Sufficient => "sufficient",
            CompletionState::Complete => "complete",
        }
    }

    fn from_percentage(percentage: f64) -> Self {
        if percentage >= 0.90 {
            CompletionState::Complete
        } else if percentage >= 0.70 {
            CompletionState::Sufficient
        } else if percentage >= 0.50 {
            CompletionState::Partial
        } else {
            CompletionState::Minimal
        }
    }
}

impl fmt::Display for CompletionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for CompletionState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "failed" => Ok(CompletionState::Failed),
            "minimal" => Ok(CompletionState::Minimal),
            "partial" => Ok(CompletionState::Partial),
            "sufficient" => Ok(CompletionState::Sufficient),
            "complete" => Ok(CompletionState::Complete),
            _ => Err(format!("Unknown completion state: {}", s)),
        }
    }
}

/// Scorer output. Derived on demand, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringResult {
    pub state: CompletionState,
    pub score: f64,
    pub earned_points: u32,
    pub max_points: u32,
    pub present_fields: Vec<String>,
    pub missing_required: Vec<String>,
    pub missing_optional: Vec<String>,
}

fn weight_of(field: &str) -> u32 {
    FIELD_WEIGHTS
        .iter()
        .find(|(name, _)| *name == field)
        .map(|(_, w)| *w)
        .unwrap_or(0)
}

fn is_present(value: Option<&str>) -> bool {
    value.is_some_and(|v| v.trim().chars().count() >= MIN_FIELD_LENGTH)
}

/// Score a map of field name to extracted text.
pub fn score(fields: &BTreeMap<String, Option<String>>) -> ScoringResult {
    let present: BTreeSet<&str> = fields
        .iter()
        .filter(|(_, value)| is_present(value.as_deref()))
        .map(|(name, _)| name.as_str())
        .collect();

    let earned_points: u32 = present.iter().map(|name| weight_of(name)).sum();
    let score = f64::from(earned_points) / f64::from(MAX_POINTS);

    let missing_required: Vec<String> = REQUIRED_FIELDS
        .iter()
        .filter(|name| !present.contains(*name))
        .map(|name| name.to_string())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let missing_optional: Vec<String> = FIELD_WEIGHTS
        .iter()
        .map(|(name, _)| *name)
        .filter(|name| !REQUIRED_FIELDS.contains(name) && !present.contains(name))
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let state = if missing_required.is_empty() {
        CompletionState::from_percentage(score)
    } else {
        CompletionState::Failed
    };

    ScoringResult {
        state,
        score,
        earned_points,
        max_points: MAX_POINTS,
        present_fields: present.into_iter().map(str::to_string).collect(),
        missing_required,
        missing_optional,
    }
}

/// Score an [`ExtractedJobData`] over the weighted fields.
pub fn score_extracted_data(data: &ExtractedJobData) -> ScoringResult {
    let fields = FIELD_WEIGHTS
        .iter()
        .filter_map(|(name, _)| name.parse::<JobField>().ok())
        .map(|field| (field.as_str().to_string(), data.field_text(field)))
        .collect();
    score(&fields)
}
