use std::sync::Arc;

use gleaner_core::error::AppError;
use gleaner_core::traits::Cleaner;
use htmd::HtmlToMarkdown;

/// Tags dropped before conversion. `header` is kept: job pages often put the
/// title and company there.
const SKIP_TAGS: &[&str] = &[
    "script", "style", "nav", "footer", "aside", "noscript", "iframe", "svg", "form", "button",
];

/// HTML-to-Markdown cleaner using htmd.
///
/// Converts a job page into Markdown for the AI extractor, stripping
/// non-content elements and collapsing blank-line runs to keep prompts small.
pub struct HtmdCleaner {
    converter: Arc<HtmlToMarkdown>,
    max_chars: Option<usize>,
}

impl Clone for HtmdCleaner {
    fn clone(&self) -> Self {
        Self {
            converter: Arc::clone(&self.converter),
            max_chars: self.max_chars,
        }
    }
}

impl HtmdCleaner {
    pub fn new() -> Self {
        let converter = HtmlToMarkdown::builder()
            .skip_tags(SKIP_TAGS.to_vec())
            .build();

        Self {
            converter: Arc::new(converter),
            max_chars: None,
        }
    }

    /// Truncate the Markdown to at most `max_chars` characters.
    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = Some(max_chars);
        self
    }
}

impl Default for HtmdCleaner {
    fn default() -> Self {
        Self::new()
    }
}

impl Cleaner for HtmdCleaner {
    fn clean(&self, html: &str) -> Result<String, AppError> {
        let markdown = self
            .converter
            .convert(html)
            .map_err(|e| AppError::CleanerError(e.to_string()))?;

        let mut text = collapse_blank_lines(&markdown);
        if let Some(max) = self.max_chars
            && let Some((cut, _)) = text.char_indices().nth(max)
        {
            tracing::debug!(chars = max, "Truncating cleaned document");
            text.truncate(cut);
        }
        Ok(text)
    }
}

/// Trim trailing spaces and keep at most one blank line between blocks.
fn collapse_blank_lines(markdown: &str) -> String {
    let mut out = String::with_capacity(markdown.len());
    let mut blank_run = 0;
    for line in markdown.lines().map(str::trim_end) {
        if line.is_empty() {
            blank_run += 1;
            if blank_run > 1 || out.is_empty() {
                continue;
            }
        } else {
            blank_run = 0;
        }
        out.push_str(line);
        out.push('\n');
    }
    out.trim_end().to_string()
}
