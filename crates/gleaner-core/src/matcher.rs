use regex::Regex;
use scraper::Selector;

use crate::document::Page;
use crate::models::{ExtractionConfig, MatchPattern};
use crate::util::element_text;

/// Find the first config, in input order, whose match patterns all apply.
///
/// Patterns that fail to evaluate (bad selector, bad regex) count as
/// non-matching. A config without patterns never matches.
pub fn find_match<'c>(
    html: &str,
    url: &str,
    configs: &'c [ExtractionConfig],
) -> Option<&'c ExtractionConfig> {
    if configs.is_empty() {
        return None;
    }
    let page = Page::parse(html);
    let found = configs
        .iter()
        .find(|config| config_matches(&page, url, config));

    match found {
        Some(config) => tracing::debug!(
            config = %config.name,
            version = config.version,
            "Extraction config matched"
        ),
        None => tracing::debug!(candidates = configs.len(), %url, "No extraction config matched"),
    }
    found
}

/// Whether every pattern of `config` is satisfied by the page.
pub fn config_matches(page: &Page<'_>, url: &str, config: &ExtractionConfig) -> bool {
    !config.match_patterns.is_empty()
        && config
            .match_patterns
            .iter()
            .all(|pattern| pattern_matches(page, url, pattern))
}

/// Evaluate a single pattern.
pub fn pattern_matches(page: &Page<'_>, url: &str, pattern: &MatchPattern) -> bool {
    match pattern {
        MatchPattern::CssExists { selector, contains } => {
            let Ok(parsed) = Selector::parse(selector) else {
                tracing::debug!(%selector, "Invalid CSS selector in match pattern");
                return false;
            };
            let mut matched = page.html().select(&parsed);
            match contains {
                None => matched.next().is_some(),
                Some(needle) => matched.any(|el| {
                    el.text().collect::<String>().contains(needle.as_str())
                        || element_text(&el).contains(needle.as_str())
                }),
            }
        }
        MatchPattern::UrlPattern { pattern } => match Regex::new(pattern) {
            Ok(re) => re.is_match(url),
            Err(e) => {
                tracing::debug!(%pattern, error = %e, "Invalid URL regex in match pattern");
                false
            }
        },
        MatchPattern::ContentContains { pattern, regex } => {
            if !*regex {
                return page.raw().contains(pattern.as_str());
            }
            match Regex::new(pattern) {
                Ok(re) => re.is_match(page.raw()),
                Err(e) => {
                    tracing::debug!(%pattern, error = %e, "Invalid content regex in match pattern");
                    false
                }
            }
        }
    }
}
