use chrono::{DateTime, NaiveDate};

use super::{Normalize, dedupe_list, normalize_date, normalize_text, normalize_url_field};
use crate::job::ExtractedJobData;

/// Normalize a job record. Never fails.
pub fn normalize_job(job: ExtractedJobData) -> ExtractedJobData {
    let (salary_min, salary_max) = match (
        clean_amount(job.salary_min),
        clean_amount(job.salary_max),
    ) {
        (Some(min), Some(max)) if min > max => (Some(max), Some(min)),
        pair => pair,
    };

    ExtractedJobData {
        title: job.title.trim().to_string(),
        company_name: normalize_text(job.company_name),
        description: normalize_text(job.description),
        location: normalize_text(job.location),
        salary_min,
        salary_max,
        salary_currency: normalize_text(job.salary_currency).map(|c| c.to_uppercase()),
        job_type: normalize_text(job.job_type),
        experience_level: normalize_text(job.experience_level),
        education_level: normalize_text(job.education_level),
        qualifications: dedupe_list(job.qualifications),
        responsibilities: dedupe_list(job.responsibilities),
        benefits: dedupe_list(job.benefits),
        category: normalize_text(job.category),
        application_url: normalize_url_field(job.application_url),
        is_remote: job.is_remote,
        posted_date: job.posted_date.as_deref().and_then(normalize_posting_date),
        closing_date: job.closing_date.as_deref().and_then(normalize_posting_date),
    }
}

impl Normalize for ExtractedJobData {
    fn normalize(self) -> Self {
        normalize_job(self)
    }
}

fn clean_amount(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v >= 0.0)
}

/// Posting dates keep day precision when they carry it (`YYYY-MM-DD`), and
/// fall back to the `YYYY-MM` resume rules otherwise.
fn normalize_posting_date(raw: &str) -> Option<String> {
    let s = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive().format("%Y-%m-%d").to_string());
    }
    let day_part = s.get(..10).unwrap_or(s);
    if let Ok(date) = NaiveDate::parse_from_str(day_part, "%Y-%m-%d") {
        return Some(date.format("%Y-%m-%d").to_string());
    }
    normalize_date(s)
}
