//! AI-assisted extraction that also learns a reusable [`ExtractionConfig`].
//!
//! The AI result is traced back to the page: a field whose value sits
//! verbatim in the JSON-LD `JobPosting`, a meta tag, or a specific element
//! gets a deterministic rule. Fields the AI inferred from free text get none.

use std::collections::BTreeMap;

use scraper::{ElementRef, Selector};
use url::Url;

use crate::deterministic::{RuleValue, apply_rule, extract_page, parse_amount, parse_flag};
use crate::document::{JSON_LD_SELECTOR, Page};
use crate::error::AppError;
use crate::job::{ExtractedJobData, FieldKind, JobField, job_schema};
use crate::matcher::config_matches;
use crate::models::{
    ExtractionConfig, ExtractionResult, ExtractionRule, MatchPattern, compute_match_hash,
};
use crate::scoring::{CompletionState, score_extracted_data};
use crate::traits::{Cleaner, Extractor};
use crate::util::{comparable, element_text};

/// Where to look for each field inside a schema.org `JobPosting`.
const JSON_LD_PATHS: &[(JobField, &[&str])] = &[
    (JobField::Title, &["title"]),
    (JobField::CompanyName, &["hiringOrganization.name"]),
    (JobField::Description, &["description"]),
    (
        JobField::Location,
        &[
            "jobLocation.address.addressLocality",
            "jobLocation.address.addressRegion",
        ],
    ),
    (
        JobField::SalaryMin,
        &["baseSalary.value.minValue", "baseSalary.value.value"],
    ),
    (JobField::SalaryMax, &["baseSalary.value.maxValue"]),
    (
        JobField::SalaryCurrency,
        &["baseSalary.currency", "salaryCurrency"],
    ),
    (JobField::JobType, &["employmentType"]),
    (JobField::ExperienceLevel, &["experienceRequirements"]),
    (
        JobField::EducationLevel,
        &[
            "educationRequirements.credentialCategory",
            "educationRequirements",
        ],
    ),
    (JobField::Qualifications, &["qualifications", "skills"]),
    (JobField::Responsibilities, &["responsibilities"]),
    (JobField::Benefits, &["jobBenefits"]),
    (JobField::Category, &["occupationalCategory", "industry"]),
    (JobField::ApplicationUrl, &["url"]),
    (JobField::IsRemote, &["jobLocationType"]),
    (JobField::PostedDate, &["datePosted"]),
    (JobField::ClosingDate, &["validThrough"]),
];

/// Meta tags worth checking per field.
const META_NAMES: &[(JobField, &[&str])] = &[
    (JobField::Title, &["og:title", "twitter:title"]),
    (JobField::CompanyName, &["og:site_name"]),
    (
        JobField::Description,
        &["og:description", "description", "twitter:description"],
    ),
];

/// Elements never used as a CSS rule target.
const SKIP_TAGS: &[&str] = &[
    "html", "head", "body", "script", "style", "noscript", "template", "title", "meta",
];

/// Shorter side of a containment match between long texts.
const MIN_CONTAINED_LEN: usize = 40;

/// Output of a generation run.
#[derive(Debug, Clone)]
pub struct GenerationResult {
    /// Proposed config. Not persisted.
    pub config: ExtractionConfig,
    pub extraction_result: ExtractionResult,
    pub completion_state: CompletionState,
    /// Generation/validation cycles used. Currently always 1: the generator
    /// makes exactly one AI call and does not self-correct.
    pub attempts: u32,
    /// Whether `config`'s match patterns accept the page it was derived from.
    /// A config that does not is never worth storing.
    pub matches_source: bool,
}

/// A derived config and how it fared when replayed on its source page.
#[derive(Debug, Clone)]
pub struct DerivedConfig {
    pub config: ExtractionConfig,
    pub matches_source: bool,
    pub replay_state: CompletionState,
}

/// Runs AI extraction and derives a config from where the values were found.
#[derive(Clone)]
pub struct ConfigGenerator<C, E>
where
    C: Cleaner,
    E: Extractor,
{
    cleaner: C,
    extractor: E,
}

impl<C, E> ConfigGenerator<C, E>
where
    C: Cleaner,
    E: Extractor,
{
    pub fn new(cleaner: C, extractor: E) -> Self {
        Self { cleaner, extractor }
    }

    /// Extract with the AI and propose a fresh version-1 config.
    pub async fn generate(&self, html: &str, url: &str) -> Result<GenerationResult, AppError> {
        self.regenerate(html, url, None).await
    }

    /// Like [`generate`](Self::generate), but when the derived match signature
    /// equals `previous`'s, the proposal is `previous.version + 1`.
    pub async fn regenerate(
        &self,
        html: &str,
        url: &str,
        previous: Option<&ExtractionConfig>,
    ) -> Result<GenerationResult, AppError> {
        let host = host_of(url)?;

        let text = self.cleaner.clean(html)?;
        tracing::info!(%url, bytes = text.len(), "Requesting AI extraction");

        let data = self
            .extractor
            .extract_structured(&text, url, &job_schema())
            .await?;

        let scoring = score_extracted_data(&data);
        tracing::info!(
            %url,
            state = %scoring.state,
            score = scoring.score,
            "AI extraction scored"
        );

        let derived = derive_config(html, url, &host, &data, previous);
        let completion_state = scoring.state;

        Ok(GenerationResult {
            config: derived.config,
            extraction_result: ExtractionResult {
                data,
                completion_state,
                scoring,
            },
            completion_state,
            attempts: 1,
            matches_source: derived.matches_source,
        })
    }
}

/// Host of `url` without a leading `www.`.
fn host_of(url: &str) -> Result<String, AppError> {
    let parsed = Url::parse(url)
        .map_err(|e| AppError::ValidationError(format!("Invalid URL '{url}': {e}")))?;
    let host = parsed
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| AppError::ValidationError(format!("URL '{url}' has no host")))?;
    Ok(host.trim_start_matches("www.").to_string())
}

/// Build the config for `data` as found on `html`, then replay it on the
/// same page.
pub fn derive_config(
    html: &str,
    url: &str,
    host: &str,
    data: &ExtractedJobData,
    previous: Option<&ExtractionConfig>,
) -> DerivedConfig {
    let page = Page::parse(html);
    let patterns = derive_match_patterns(&page, host);
    let rules = derive_rules(&page, data);

    let config = match previous {
        Some(prev) if prev.match_hash == compute_match_hash(&patterns) => prev.next_version(rules),
        _ => ExtractionConfig::new(host, patterns, rules),
    };

    let replay = extract_page(&page, url, &config);
    let matches_source = config_matches(&page, url, &config);
    if !matches_source {
        tracing::warn!(
            config = %config.name,
            %url,
            "Generated config does not match its source page"
        );
    }
    tracing::info!(
        config = %config.name,
        version = config.version,
        fields = config.extract_rules.len(),
        rules = config.rule_count(),
        replay_state = %replay.completion_state,
        "Derived extraction config"
    );

    DerivedConfig {
        config,
        matches_source,
        replay_state: replay.completion_state,
    }
}

/// Host-anchored URL pattern, plus the JSON-LD block or site-name meta when
/// the page has one.
pub fn derive_match_patterns(page: &Page<'_>, host: &str) -> Vec<MatchPattern> {
    let mut patterns = vec![MatchPattern::UrlPattern {
        pattern: format!(r"^https?://(?:www\.)?{}(?:[:/?#]|$)", regex::escape(host)),
    }];

    if page.job_posting().is_some() {
        patterns.push(MatchPattern::CssExists {
            selector: JSON_LD_SELECTOR.to_string(),
            contains: Some("JobPosting".to_string()),
        });
    } else {
        patterns.extend(site_name_pattern(page));
    }

    patterns
}

/// `CssExists` for the site-name meta tag, keyed on whichever of `property`
/// or `name` the page actually uses, spelled as the page spells it.
fn site_name_pattern(page: &Page<'_>) -> Option<MatchPattern> {
    let meta = Selector::parse("meta").ok()?;
    page.html().select(&meta).find_map(|el| {
        let value = el.value();
        value.attr("content").filter(|c| !c.trim().is_empty())?;
        let (attr, name) = ["property", "name"].into_iter().find_map(|attr| {
            value
                .attr(attr)
                .filter(|n| n.eq_ignore_ascii_case("og:site_name"))
                .map(|n| (attr, n))
        })?;
        Some(MatchPattern::CssExists {
            selector: format!(r#"meta[{attr}="{name}"]"#),
            contains: None,
        })
    })
}

/// Rules for every field of `data` with a traceable source, in priority
/// order JSON-LD, meta, CSS.
pub fn derive_rules(
    page: &Page<'_>,
    data: &ExtractedJobData,
) -> BTreeMap<JobField, Vec<ExtractionRule>> {
    let mut rules = BTreeMap::new();

    for field in JobField::ALL {
        let mut found = Vec::new();

        let json_ld = lookup(JSON_LD_PATHS, field)
            .iter()
            .map(|path| ExtractionRule::JsonLd {
                path: (*path).to_string(),
            })
            .find(|rule| rule_agrees(page, rule, field, data));
        found.extend(json_ld);

        let meta = lookup(META_NAMES, field)
            .iter()
            .map(|name| ExtractionRule::Meta {
                name: (*name).to_string(),
            })
            .find(|rule| rule_agrees(page, rule, field, data));
        found.extend(meta);

        let css = css_rule_for(page, field, data)
            .filter(|rule| rule_agrees(page, rule, field, data));
        found.extend(css);

        if found.is_empty() {
            tracing::debug!(%field, "No traceable source for field");
        } else {
            rules.insert(field, found);
        }
    }

    rules
}

type FieldTable = [(JobField, &'static [&'static str])];

fn lookup(table: &'static FieldTable, field: JobField) -> &'static [&'static str] {
    table
        .iter()
        .find(|(f, _)| *f == field)
        .map(|(_, entries)| *entries)
        .unwrap_or(&[])
}

/// Whether applying `rule` reproduces the AI value for `field`.
fn rule_agrees(
    page: &Page<'_>,
    rule: &ExtractionRule,
    field: JobField,
    data: &ExtractedJobData,
) -> bool {
    let Some(value) = apply_rule(page, rule, field) else {
        return false;
    };

    match field.kind() {
        FieldKind::List => {
            let expected = data.field_list(field);
            let found: Vec<String> = match &value {
                RuleValue::List(items) => items.clone(),
                RuleValue::Text(text) => text.lines().map(str::to_string).collect(),
            };
            !expected.is_empty() && lists_agree(&found, expected)
        }
        FieldKind::Amount => {
            let expected = match field {
                JobField::SalaryMin => data.salary_min,
                JobField::SalaryMax => data.salary_max,
                _ => None,
            };
            match (expected, value.first_text().and_then(parse_amount)) {
                (Some(e), Some(f)) => (e - f).abs() < 0.5,
                _ => false,
            }
        }
        FieldKind::Flag => {
            data.is_remote.is_some() && value.first_text().and_then(parse_flag) == data.is_remote
        }
        FieldKind::Text => {
            let Some(expected) = data.field_text(field) else {
                return false;
            };
            let found = match (&value, field) {
                (RuleValue::List(items), JobField::Description) => items.join("\n\n"),
                _ => value.first_text().unwrap_or_default().to_string(),
            };
            texts_agree(&found, &expected, field == JobField::Description)
        }
    }
}

fn texts_agree(found: &str, expected: &str, allow_containment: bool) -> bool {
    let found = comparable(found);
    let expected = comparable(expected);
    if found.is_empty() || expected.is_empty() {
        return false;
    }
    if found == expected {
        return true;
    }
    allow_containment
        && found.len().min(expected.len()) >= MIN_CONTAINED_LEN
        && (found.contains(&expected) || expected.contains(&found))
}

fn lists_agree(found: &[String], expected: &[String]) -> bool {
    let keys = |items: &[String]| -> Vec<String> {
        items
            .iter()
            .map(|s| comparable(s))
            .filter(|s| !s.is_empty())
            .collect()
    };
    let expected = keys(expected);
    !expected.is_empty() && keys(found) == expected
}

/// Reverse-engineer a CSS rule for a field from the element holding its value.
fn css_rule_for(
    page: &Page<'_>,
    field: JobField,
    data: &ExtractedJobData,
) -> Option<ExtractionRule> {
    let selector = match field.kind() {
        FieldKind::List => list_selector(page, data.field_list(field))?,
        FieldKind::Amount => {
            let expected = match field {
                JobField::SalaryMin => data.salary_min,
                _ => data.salary_max,
            }?;
            element_selector(page, |el, text| {
                text.len() <= MIN_CONTAINED_LEN
                    && is_leaf(el)
                    && parse_amount(text).is_some_and(|v| (v - expected).abs() < 0.5)
            })?
        }
        FieldKind::Flag => return None,
        FieldKind::Text => {
            let target = comparable(&data.field_text(field)?);
            element_selector(page, |el, text| {
                comparable(text) == target
                    && !el
                        .children()
                        .filter_map(ElementRef::wrap)
                        .any(|child| comparable(&element_text(&child)) == target)
            })?
        }
    };
    Some(ExtractionRule::Css {
        selector,
        attribute: None,
    })
}

/// First element satisfying `accept` for which a selector can be built that
/// selects an accepted element first.
fn element_selector(
    page: &Page<'_>,
    accept: impl Fn(&ElementRef<'_>, &str) -> bool,
) -> Option<String> {
    page.html()
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|el| !SKIP_TAGS.contains(&el.value().name()))
        .filter(|el| accept(el, &element_text(el)))
        .find_map(|el| {
            let selector = selector_for(&el)?;
            let parsed = Selector::parse(&selector).ok()?;
            let first = page.html().select(&parsed).next()?;
            accept(&first, &element_text(&first)).then_some(selector)
        })
}

/// `parent > li` selector whose items equal `items`, in order.
fn list_selector(page: &Page<'_>, items: &[String]) -> Option<String> {
    let first = comparable(items.first()?);
    let li = Selector::parse("li").ok()?;

    page.html()
        .select(&li)
        .filter(|el| comparable(&element_text(el)) == first)
        .find_map(|el| {
            let parent = el.parent().and_then(ElementRef::wrap)?;
            let selector = format!("{} > li", selector_for(&parent)?);
            let parsed = Selector::parse(&selector).ok()?;
            let found: Vec<String> = page
                .html()
                .select(&parsed)
                .map(|e| element_text(&e))
                .collect();
            lists_agree(&found, items).then_some(selector)
        })
}

/// `#id`, `tag.class`, `#parent-id > tag`, `parent.class > tag`, or `tag`.
fn selector_for(el: &ElementRef<'_>) -> Option<String> {
    let value = el.value();
    let tag = value.name();

    if let Some(id) = value.id().filter(|id| is_stable_ident(id)) {
        return Some(format!("#{id}"));
    }
    let classes: Vec<&str> = value.classes().filter(|c| is_stable_ident(c)).collect();
    if !classes.is_empty() {
        return Some(format!("{tag}.{}", classes.join(".")));
    }

    if let Some(parent) = el.parent().and_then(ElementRef::wrap) {
        let pvalue = parent.value();
        if let Some(pid) = pvalue.id().filter(|id| is_stable_ident(id)) {
            return Some(format!("#{pid} > {tag}"));
        }
        let pclasses: Vec<&str> = pvalue.classes().filter(|c| is_stable_ident(c)).collect();
        if !pclasses.is_empty() {
            return Some(format!("{}.{} > {tag}", pvalue.name(), pclasses.join(".")));
        }
    }

    (!tag.is_empty()).then(|| tag.to_string())
}

/// A CSS identifier that is unlikely to be page-specific: plain characters,
/// and no run of three or more digits (ids like `job-48213`).
fn is_stable_ident(s: &str) -> bool {
    let mut chars = s.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !(first.is_ascii_alphabetic() || first == '_' || first == '-') {
        return false;
    }
    if !s.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
        return false;
    }
    let mut run = 0;
    for c in s.chars() {
        run = if c.is_ascii_digit() { run + 1 } else { 0 };
        if run >= 3 {
            return false;
        }
    }
    true
}

fn is_leaf(el: &ElementRef<'_>) -> bool {
    el.children().filter_map(ElementRef::wrap).next().is_none()
}
