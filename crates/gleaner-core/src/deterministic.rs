//! Rule-based job extraction: applies a matched [`ExtractionConfig`] to a page
//! without calling the AI extractor.

use regex::Regex;
use scraper::{Html, Selector};

use crate::document::Page;
use crate::job::{ExtractedJobData, FieldKind, JobField};
use crate::models::{ExtractionConfig, ExtractionResult, ExtractionRule};
use crate::scoring::score_extracted_data;
use crate::util::{block_text, collapse_whitespace, element_text, paragraph_text, strip_html};

/// Value produced by applying one rule.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleValue {
    Text(String),
    List(Vec<String>),
}

impl RuleValue {
    fn from_items(mut items: Vec<String>) -> Option<Self> {
        items.retain(|s| !s.is_empty());
        match items.len() {
            0 => None,
            1 => items.pop().map(RuleValue::Text),
            _ => Some(RuleValue::List(items)),
        }
    }

    /// Single-line view: first item of a list.
    pub fn first_text(&self) -> Option<&str> {
        match self {
            RuleValue::Text(s) => Some(s),
            RuleValue::List(items) => items.first().map(String::as_str),
        }
    }
}

/// Extract a job record from `html` using the rules of `config`, then score it.
pub fn extract(html: &str, url: &str, config: &ExtractionConfig) -> ExtractionResult {
    let page = Page::parse(html);
    extract_page(&page, url, config)
}

/// Same as [`extract`] over an already parsed page.
pub fn extract_page(page: &Page<'_>, url: &str, config: &ExtractionConfig) -> ExtractionResult {
    let mut data = ExtractedJobData::default();
    let mut filled = 0usize;

    for (field, rules) in &config.extract_rules {
        let hit = rules.iter().enumerate().find_map(|(idx, rule)| {
            apply_rule(page, rule, *field).map(|value| (idx, value))
        });
        match hit {
            Some((idx, value)) => {
                if assign_field(&mut data, *field, value) {
                    filled += 1;
                    tracing::debug!(%field, rule = idx, "Field extracted");
                }
            }
            None => tracing::debug!(%field, rules = rules.len(), "No rule produced a value"),
        }
    }

    let scoring = score_extracted_data(&data);
    tracing::debug!(
        config = %config.name,
        version = config.version,
        %url,
        filled,
        state = %scoring.state,
        score = scoring.score,
        "Deterministic extraction finished"
    );

    ExtractionResult {
        data,
        completion_state: scoring.state,
        scoring,
    }
}

/// Apply a single rule for `field`. Rules that fail to evaluate yield `None`.
///
/// Description text keeps its paragraph breaks; every other field is read as
/// a single whitespace-collapsed line.
pub fn apply_rule(page: &Page<'_>, rule: &ExtractionRule, field: JobField) -> Option<RuleValue> {
    let paragraphs = field == JobField::Description;
    match rule {
        ExtractionRule::JsonLd { path } => {
            let posting = page.job_posting()?;
            resolve_path(posting, path).and_then(|value| json_to_rule_value(value, paragraphs))
        }
        ExtractionRule::Css {
            selector,
            attribute,
        } => {
            let parsed = match Selector::parse(selector) {
                Ok(parsed) => parsed,
                Err(e) => {
                    tracing::debug!(%selector, error = %e, "Invalid CSS selector in rule");
                    return None;
                }
            };
            let items = page
                .html()
                .select(&parsed)
                .map(|el| match attribute {
                    Some(attr) => el
                        .value()
                        .attr(attr)
                        .map(collapse_whitespace)
                        .unwrap_or_default(),
                    None if paragraphs => block_text(&el),
                    None => element_text(&el),
                })
                .collect();
            RuleValue::from_items(items)
        }
        ExtractionRule::Meta { name } => page.meta(name).map(RuleValue::Text),
        ExtractionRule::Regex { pattern, group } => {
            let re = match Regex::new(pattern) {
                Ok(re) => re,
                Err(e) => {
                    tracing::debug!(%pattern, error = %e, "Invalid regex in rule");
                    return None;
                }
            };
            let caps = re.captures(page.text())?;
            let m = caps.get(*group).or_else(|| caps.get(0))?;
            let text = collapse_whitespace(m.as_str());
            (!text.is_empty()).then_some(RuleValue::Text(text))
        }
    }
}

/// Walk a dot path through JSON. Numeric segments index arrays; key segments
/// applied to an array look into its first element.
pub fn resolve_path<'v>(
    value: &'v serde_json::Value,
    path: &str,
) -> Option<&'v serde_json::Value> {
    let mut current = value;
    for segment in path.split('.').filter(|s| !s.is_empty()) {
        current = match current {
            serde_json::Value::Array(items) => match segment.parse::<usize>() {
                Ok(idx) => items.get(idx)?,
                Err(_) => items.first()?.get(segment)?,
            },
            serde_json::Value::Object(map) => map.get(segment)?,
            _ => return None,
        };
    }
    Some(current)
}

fn json_scalar_text(value: &serde_json::Value, paragraphs: bool) -> Option<String> {
    let text = match value {
        serde_json::Value::String(s) if paragraphs => paragraph_text(s),
        serde_json::Value::String(s) => collapse_whitespace(&strip_html(s)),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Object(map) => {
            return ["name", "value", "@value"]
                .iter()
                .filter_map(|k| map.get(*k))
                .find_map(|v| json_scalar_text(v, paragraphs));
        }
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

fn json_to_rule_value(value: &serde_json::Value, paragraphs: bool) -> Option<RuleValue> {
    match value {
        serde_json::Value::Array(items) => RuleValue::from_items(
            items
                .iter()
                .filter_map(|v| json_scalar_text(v, paragraphs))
                .collect(),
        ),
        serde_json::Value::String(s) if !paragraphs && s.contains("<li") => {
            let items = html_list_items(s);
            if items.is_empty() {
                json_scalar_text(value, paragraphs).map(RuleValue::Text)
            } else {
                RuleValue::from_items(items)
            }
        }
        _ => json_scalar_text(value, paragraphs).map(RuleValue::Text),
    }
}

fn html_list_items(fragment: &str) -> Vec<String> {
    let Ok(li) = Selector::parse("li") else {
        return Vec::new();
    };
    Html::parse_fragment(fragment)
        .select(&li)
        .map(|el| element_text(&el))
        .filter(|s| !s.is_empty())
        .collect()
}

/// Store a rule value into the record. Returns false if it did not fit the
/// field (e.g. unparseable salary).
fn assign_field(data: &mut ExtractedJobData, field: JobField, value: RuleValue) -> bool {
    match field.kind() {
        FieldKind::List => {
            let items = match value {
                RuleValue::List(items) => items,
                RuleValue::Text(text) => text
                    .lines()
                    .map(collapse_whitespace)
                    .filter(|l| !l.is_empty())
                    .collect(),
            };
            if items.is_empty() {
                return false;
            }
            match field {
                JobField::Qualifications => data.qualifications = items,
                JobField::Responsibilities => data.responsibilities = items,
                JobField::Benefits => data.benefits = items,
                _ => return false,
            }
        }
        FieldKind::Amount => {
            let Some(amount) = value.first_text().and_then(parse_amount) else {
                return false;
            };
            match field {
                JobField::SalaryMin => data.salary_min = Some(amount),
                JobField::SalaryMax => data.salary_max = Some(amount),
                _ => return false,
            }
        }
        FieldKind::Flag => {
            let Some(flag) = value.first_text().and_then(parse_flag) else {
                return false;
            };
            data.is_remote = Some(flag);
        }
        FieldKind::Text => {
            let text = match (&value, field) {
                (RuleValue::List(items), JobField::Description) => items.join("\n\n"),
                _ => value.first_text().unwrap_or_default().to_string(),
            };
            if text.is_empty() {
                return false;
            }
            let slot = match field {
                JobField::Title => {
                    data.title = text;
                    return true;
                }
                JobField::CompanyName => &mut data.company_name,
                JobField::Description => &mut data.description,
                JobField::Location => &mut data.location,
                JobField::SalaryCurrency => &mut data.salary_currency,
                JobField::JobType => &mut data.job_type,
                JobField::ExperienceLevel => &mut data.experience_level,
                JobField::EducationLevel => &mut data.education_level,
                JobField::Category => &mut data.category,
                JobField::ApplicationUrl => &mut data.application_url,
                JobField::PostedDate => &mut data.posted_date,
                JobField::ClosingDate => &mut data.closing_date,
                _ => return false,
            };
            *slot = Some(text);
        }
    }
    true
}

/// Parse the first amount in a salary string: `$120,000`, `95k`, `80000.50`.
pub fn parse_amount(text: &str) -> Option<f64> {
    let lower = text.to_lowercase();
    let start = lower.find(|c: char| c.is_ascii_digit())?;
    let rest = &lower[start..];
    let end = rest
        .find(|c: char| !(c.is_ascii_digit() || c == ',' || c == '.'))
        .unwrap_or(rest.len());
    let digits: String = rest[..end].chars().filter(|c| *c != ',').collect();
    let mut value: f64 = digits.trim_end_matches('.').parse().ok()?;
    if rest[end..].trim_start().starts_with('k') {
        value *= 1000.0;
    }
    value.is_finite().then_some(value)
}

/// Read a remote-work flag from free text.
pub fn parse_flag(text: &str) -> Option<bool> {
    let lower = collapse_whitespace(text).to_lowercase();
    const NEGATIVE: &[&str] = &["not remote", "no remote", "on-site", "onsite", "in-office"];
    const POSITIVE: &[&str] = &["remote", "telecommute", "work from home"];

    if NEGATIVE.iter().any(|n| lower.contains(n)) || matches!(lower.as_str(), "false" | "no") {
        Some(false)
    } else if POSITIVE.iter().any(|p| lower.contains(p)) || matches!(lower.as_str(), "true" | "yes")
    {
        Some(true)
    } else {
        None
    }
}
