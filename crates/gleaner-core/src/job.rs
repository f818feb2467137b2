use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SchemaError;

/// The canonical job record.
///
/// Only `title` is required. Everything else may be absent, and the scorer
/// treats "absent" and "empty" the same way.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedJobData {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salary_min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salary_max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salary_currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experience_level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub education_level: Option<String>,
    #[serde(default)]
    pub qualifications: Vec<String>,
    #[serde(default)]
    pub responsibilities: Vec<String>,
    #[serde(default)]
    pub benefits: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_remote: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub posted_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closing_date: Option<String>,
}

impl ExtractedJobData {
    /// Validate a raw AI response against [`job_schema`] and convert it.
    pub fn from_ai_value(value: serde_json::Value) -> Result<Self, SchemaError> {
        let schema = job_schema();
        let validator = jsonschema::validator_for(&schema).map_err(|e| {
            SchemaError::configuration(format!("Job schema failed to compile: {e}"))
        })?;

        let violations: Vec<String> = validator
            .iter_errors(&value)
            .map(|e| e.to_string())
            .collect();
        if !violations.is_empty() {
            return Err(SchemaError::conversion(format!(
                "AI output violates job schema: {}",
                violations.join("; ")
            )));
        }

        serde_json::from_value(value).map_err(|e| {
            SchemaError::conversion("AI output could not be converted to a job record")
                .with_cause(e)
        })
    }

    /// Textual view of a field, as the scorer and config generator see it.
    ///
    /// Lists are joined with `", "`, numbers use their `Display` form.
    pub fn field_text(&self, field: JobField) -> Option<String> {
        let text = match field {
            JobField::Title => Some(self.title.clone()),
            JobField::CompanyName => self.company_name.clone(),
            JobField::Description => self.description.clone(),
            JobField::Location => self.location.clone(),
            JobField::SalaryMin => self.salary_min.map(|v| v.to_string()),
            JobField::SalaryMax => self.salary_max.map(|v| v.to_string()),
            JobField::SalaryCurrency => self.salary_currency.clone(),
            JobField::JobType => self.job_type.clone(),
            JobField::ExperienceLevel => self.experience_level.clone(),
            JobField::EducationLevel => self.education_level.clone(),
            JobField::Qualifications => join_list(&self.qualifications),
            JobField::Responsibilities => join_list(&self.responsibilities),
            JobField::Benefits => join_list(&self.benefits),
            JobField::Category => self.category.clone(),
            JobField::ApplicationUrl => self.application_url.clone(),
            JobField::IsRemote => self.is_remote.map(|v| v.to_string()),
            JobField::PostedDate => self.posted_date.clone(),
            JobField::ClosingDate => self.closing_date.clone(),
        };
        text.filter(|t| !t.trim().is_empty())
    }

    /// List view of a list-kind field; empty for every other field.
    pub fn field_list(&self, field: JobField) -> &[String] {
        match field {
            JobField::Qualifications => &self.qualifications,
            JobField::Responsibilities => &self.responsibilities,
            JobField::Benefits => &self.benefits,
            _ => &[],
        }
    }
}

fn join_list(items: &[String]) -> Option<String> {
    if items.is_empty() {
        None
    } else {
        Some(items.join(", "))
    }
}

/// How a field's extracted text is stored in [`ExtractedJobData`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    List,
    Amount,
    Flag,
}

/// Target fields of a job extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum JobField {
    Title,
    CompanyName,
    Description,
    Location,
    SalaryMin,
    SalaryMax,
    SalaryCurrency,
    JobType,
    ExperienceLevel,
    EducationLevel,
    Qualifications,
    Responsibilities,
    Benefits,
    Category,
    ApplicationUrl,
    IsRemote,
    PostedDate,
    ClosingDate,
}

impl JobField {
    pub const ALL: [JobField; 18] = [
        JobField::Title,
        JobField::CompanyName,
        JobField::Description,
        JobField::Location,
        JobField::SalaryMin,
        JobField::SalaryMax,
        JobField::SalaryCurrency,
        JobField::JobType,
        JobField::ExperienceLevel,
        JobField::EducationLevel,
        JobField::Qualifications,
        JobField::Responsibilities,
        JobField::Benefits,
        JobField::Category,
        JobField::ApplicationUrl,
        JobField::IsRemote,
        JobField::PostedDate,
        JobField::ClosingDate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobField::Title => "title",
            JobField::CompanyName => "companyName",
            JobField::Description => "description",
            JobField::Location => "location",
            JobField::SalaryMin => "salaryMin",
            JobField::SalaryMax => "salaryMax",
            JobField::SalaryCurrency => "salaryCurrency",
            JobField::JobType => "jobType",
            JobField::ExperienceLevel => "experienceLevel",
            JobField::EducationLevel => "educationLevel",
            JobField::Qualifications => "qualifications",
            JobField::Responsibilities => "responsibilities",
            JobField::Benefits => "benefits",
            JobField::Category => "category",
            JobField::ApplicationUrl => "applicationUrl",
            JobField::IsRemote => "isRemote",
            JobField::PostedDate => "postedDate",
            JobField::ClosingDate => "closingDate",
        }
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            JobField::Qualifications | JobField::Responsibilities | JobField::Benefits => {
                FieldKind::List
            }
            JobField::SalaryMin | JobField::SalaryMax => FieldKind::Amount,
            JobField::IsRemote => FieldKind::Flag,
            _ => FieldKind::Text,
        }
    }
}

impl fmt::Display for JobField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for JobField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JobField::ALL
            .iter()
            .copied()
            .find(|f| f.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Unknown job field: {}", s))
    }
}

/// JSON Schema handed to the AI extractor and used to validate its answer.
pub fn job_schema() -> serde_json::Value {
    let text = serde_json::json!({"type": ["string", "null"]});
    let number = serde_json::json!({"type": ["number", "null"]});
    let list = serde_json::json!({"type": "array", "items": {"type": "string"}});

    serde_json::json!({
        "type": "object",
        "properties": {
            "title": {"type": "string", "description": "Job title"},
            "companyName": text,
            "description": text,
            "location": text,
            "salaryMin": number,
            "salaryMax": number,
            "salaryCurrency": text,
            "jobType": text,
            "experienceLevel": text,
            "educationLevel": text,
            "qualifications": list,
            "responsibilities": list,
            "benefits": list,
            "category": text,
            "applicationUrl": text,
            "isRemote": {"type": ["boolean", "null"]},
            "postedDate": text,
            "closingDate": text
        },
        "required": ["title"],
        "additionalProperties": false
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_ai_value_accepts_minimal_record() {
        let data = ExtractedJobData::from_ai_value(serde_json::json!({
            "title": "Engineer",
            "companyName": "Acme Corp",
            "qualifications": ["Rust"]
        }))
        .unwrap();

        assert_eq!(data.title, "Engineer");
        assert_eq!(data.company_name.as_deref(), Some("Acme Corp"));
        assert_eq!(data.qualifications, vec!["Rust".to_string()]);
        assert!(data.benefits.is_empty());
    }

    #[test]
    fn test_from_ai_value_rejects_missing_title() {
        let err = ExtractedJobData::from_ai_value(serde_json::json!({"companyName": "Acme"}))
            .unwrap_err();
        assert!(matches!(err, SchemaError::SchemaConversionError { .. }));
    }

    #[test]
    fn test_from_ai_value_rejects_unknown_fields_and_wrong_types() {
        let err = ExtractedJobData::from_ai_value(serde_json::json!({
            "title": "Engineer",
            "salaryMin": "a lot"
        }))
        .unwrap_err();
        assert_eq!(err.kind(), "schema_conversion_error");

        let err = ExtractedJobData::from_ai_value(serde_json::json!({
            "title": "Engineer",
            "mood": "great"
        }))
        .unwrap_err();
        assert!(err.message().contains("job schema"));
    }

    #[test]
    fn test_field_text_joins_lists_and_formats_numbers() {
        let data = ExtractedJobData {
            title: "Engineer".into(),
            salary_min: Some(50000.0),
            qualifications: vec!["Go".into(), "Rust".into()],
            ..Default::default()
        };

        assert_eq!(data.field_text(JobField::SalaryMin).as_deref(), Some("50000"));
        assert_eq!(
            data.field_text(JobField::Qualifications).as_deref(),
            Some("Go, Rust")
        );
        assert_eq!(data.field_text(JobField::Benefits), None);
    }

    #[test]
    fn test_job_field_names_round_trip() {
        for field in JobField::ALL {
            assert_eq!(field.as_str().parse::<JobField>().unwrap(), field);
            let json = serde_json::to_value(field).unwrap();
            assert_eq!(json, serde_json::Value::String(field.as_str().to_string()));
        }
        assert!("salary".parse::<JobField>().is_err());
    }
}
