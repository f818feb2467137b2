use std::sync::OnceLock;

use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};

use crate::util::collapse_whitespace;

/// Selector for embedded structured-data blocks.
pub const JSON_LD_SELECTOR: &str = r#"script[type="application/ld+json"]"#;

/// A fetched document, as returned by a [`Fetcher`](crate::traits::Fetcher).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchedDocument {
    pub url: String,
    pub body: String,
    pub content_type: String,
}

impl FetchedDocument {
    pub fn kind(&self) -> DocumentKind {
        DocumentKind::from_content_type(&self.content_type)
    }
}

/// Known content categories, with an explicit fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentKind {
    Html,
    PlainText,
    Json,
    Pdf,
    Docx,
    Other(String),
}

impl DocumentKind {
    /// Classify a `Content-Type` header value. Parameters such as `charset`
    /// are ignored; an empty header is assumed to be HTML.
    pub fn from_content_type(content_type: &str) -> Self {
        let mime = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_lowercase();

        match mime.as_str() {
            "" | "text/html" | "application/xhtml+xml" => DocumentKind::Html,
            "text/plain" | "text/markdown" => DocumentKind::PlainText,
            "application/json" | "application/ld+json" => DocumentKind::Json,
            "application/pdf" => DocumentKind::Pdf,
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => {
                DocumentKind::Docx
            }
            _ => DocumentKind::Other(mime),
        }
    }

    /// Whether the job pipeline can work on this document directly.
    pub fn is_markup(&self) -> bool {
        matches!(self, DocumentKind::Html | DocumentKind::PlainText)
    }
}

/// A parsed HTML page with lazily computed views.
///
/// Not `Send`: build it, use it, and drop it inside synchronous code.
pub struct Page<'a> {
    raw: &'a str,
    html: Html,
    job_posting: OnceLock<Option<serde_json::Value>>,
    text: OnceLock<String>,
}

impl<'a> Page<'a> {
    pub fn parse(raw: &'a str) -> Self {
        Self {
            raw,
            html: Html::parse_document(raw),
            job_posting: OnceLock::new(),
            text: OnceLock::new(),
        }
    }

    pub fn raw(&self) -> &str {
        self.raw
    }

    pub fn html(&self) -> &Html {
        &self.html
    }

    /// The first schema.org `JobPosting` object found in the page's JSON-LD
    /// blocks, searching top-level objects, arrays and `@graph` lists.
    pub fn job_posting(&self) -> Option<&serde_json::Value> {
        self.job_posting
            .get_or_init(|| find_job_posting(&self.html))
            .as_ref()
    }

    /// Visible text of the body, whitespace-collapsed. Script and style
    /// contents are skipped.
    pub fn text(&self) -> &str {
        self.text.get_or_init(|| visible_text(&self.html))
    }

    /// Content of the first `<meta>` whose `name` or `property` equals `name`
    /// (case-insensitive).
    pub fn meta(&self, name: &str) -> Option<String> {
        let selector = Selector::parse("meta").ok()?;
        self.html
            .select(&selector)
            .filter(|el| {
                let attrs = el.value();
                [attrs.attr("name"), attrs.attr("property")]
                    .into_iter()
                    .flatten()
                    .any(|n| n.eq_ignore_ascii_case(name))
            })
            .filter_map(|el| el.value().attr("content"))
            .map(collapse_whitespace)
            .find(|c| !c.is_empty())
    }
}

fn find_job_posting(html: &Html) -> Option<serde_json::Value> {
    let selector = Selector::parse(JSON_LD_SELECTOR).ok()?;
    html.select(&selector)
        .filter_map(|el| {
            let body = el.text().collect::<String>();
            match serde_json::from_str::<serde_json::Value>(body.trim()) {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::debug!(error = %e, "Skipping unparseable JSON-LD block");
                    None
                }
            }
        })
        .find_map(|value| job_posting_in(&value).cloned())
}

fn job_posting_in(value: &serde_json::Value) -> Option<&serde_json::Value> {
    match value {
        serde_json::Value::Array(items) => items.iter().find_map(job_posting_in),
        serde_json::Value::Object(map) => {
            if is_job_posting_type(map.get("@type")) {
                return Some(value);
            }
            map.get("@graph").and_then(job_posting_in)
        }
        _ => None,
    }
}

fn is_job_posting_type(ty: Option<&serde_json::Value>) -> bool {
    match ty {
        Some(serde_json::Value::String(s)) => s == "JobPosting",
        Some(serde_json::Value::Array(types)) => types.iter().any(|t| t == "JobPosting"),
        _ => false,
    }
}

fn visible_text(html: &Html) -> String {
    let Ok(body) = Selector::parse("body") else {
        return String::new();
    };
    let root = html
        .select(&body)
        .next()
        .unwrap_or_else(|| html.root_element());

    let mut parts: Vec<&str> = Vec::new();
    for node in root.descendants() {
        if let Some(text) = node.value().as_text() {
            let hidden = node
                .parent()
                .and_then(|p| p.value().as_element().map(|e| e.name()))
                .is_some_and(|name| matches!(name, "script" | "style" | "noscript" | "template"));
            if !hidden {
                parts.push(text);
            }
        }
    }
    collapse_whitespace(&parts.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><head>
        <meta property="og:title" content="  Rust Engineer ">
        <meta name="description" content="Build things">
        <script type="application/ld+json">{"@context": "https://schema.org", "@graph": [
            {"@type": "Organization", "name": "Acme"},
            {"@type": "JobPosting", "title": "Rust Engineer"}
        ]}</script>
        <script type="application/ld+json">{ not json</script>
        <style>.x { color: red }</style>
        </head><body><h1>Rust   Engineer</h1><script>var hidden = 1;</script><p>Join us</p></body></html>"#;

    #[test]
    fn test_document_kind_from_content_type() {
        assert_eq!(
            DocumentKind::from_content_type("text/html; charset=utf-8"),
            DocumentKind::Html
        );
        assert_eq!(DocumentKind::from_content_type(""), DocumentKind::Html);
        assert_eq!(
            DocumentKind::from_content_type("Application/PDF"),
            DocumentKind::Pdf
        );
        assert_eq!(
            DocumentKind::from_content_type("image/png"),
            DocumentKind::Other("image/png".into())
        );
        assert!(DocumentKind::PlainText.is_markup());
        assert!(!DocumentKind::Docx.is_markup());
    }

    #[test]
    fn test_job_posting_found_in_graph() {
        let page = Page::parse(PAGE);
        let posting = page.job_posting().unwrap();
        assert_eq!(posting["title"], "Rust Engineer");
    }

    #[test]
    fn test_job_posting_absent() {
        let page = Page::parse("<html><body><p>nothing</p></body></html>");
        assert!(page.job_posting().is_none());
    }

    #[test]
    fn test_meta_lookup_by_name_or_property() {
        let page = Page::parse(PAGE);
        assert_eq!(page.meta("og:title").as_deref(), Some("Rust Engineer"));
        assert_eq!(page.meta("DESCRIPTION").as_deref(), Some("Build things"));
        assert_eq!(page.meta("og:site_name"), None);
    }

    #[test]
    fn test_visible_text_skips_scripts() {
        let page = Page::parse(PAGE);
        assert_eq!(page.text(), "Rust Engineer Join us");
    }
}
