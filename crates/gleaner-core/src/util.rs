use scraper::{ElementRef, Html};

/// Trim and collapse every whitespace run to a single space.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Trim each line, collapse runs inside lines, and keep at most one blank
/// line between paragraphs.
pub fn collapse_paragraphs(s: &str) -> String {
    let mut out: Vec<String> = Vec::new();
    for line in s.lines() {
        let line = collapse_whitespace(line);
        if line.is_empty() && out.last().is_none_or(|l| l.is_empty()) {
            continue;
        }
        out.push(line);
    }
    while out.last().is_some_and(|l| l.is_empty()) {
        out.pop();
    }
    out.join("\n")
}

/// Visible text of an element, whitespace-collapsed.
pub fn element_text(el: &ElementRef<'_>) -> String {
    collapse_whitespace(&el.text().collect::<Vec<_>>().join(" "))
}

/// Elements that start a new paragraph.
const BLOCK_TAGS: &[&str] = &[
    "p", "div", "section", "article", "header", "footer", "main", "aside", "blockquote",
    "h1", "h2", "h3", "h4", "h5", "h6", "ul", "ol", "dl", "table", "pre",
];

/// Elements that start a new line within a paragraph.
const LINE_TAGS: &[&str] = &["li", "dt", "dd", "tr"];

/// Text of an element with block structure kept: paragraphs are separated by
/// a blank line, list items and `<br>` by a newline.
pub fn block_text(el: &ElementRef<'_>) -> String {
    let mut out = String::new();
    push_block_text(el, &mut out);
    collapse_paragraphs(&out)
}

fn push_block_text(el: &ElementRef<'_>, out: &mut String) {
    let name = el.value().name();
    if matches!(name, "script" | "style" | "noscript" | "template") {
        return;
    }
    if name == "br" {
        out.push('\n');
        return;
    }
    let breaks = if BLOCK_TAGS.contains(&name) {
        2
    } else if LINE_TAGS.contains(&name) {
        1
    } else {
        0
    };

    ensure_breaks(out, breaks);
    for child in el.children() {
        if let Some(child_el) = ElementRef::wrap(child) {
            push_block_text(&child_el, out);
        } else if let Some(text) = child.value().as_text() {
            // Source newlines are layout, not structure.
            out.extend(text.chars().map(|c| if c.is_whitespace() { ' ' } else { c }));
        }
    }
    ensure_breaks(out, breaks);
}

/// Make `out` end in at least `count` newlines, ignoring trailing spaces.
fn ensure_breaks(out: &mut String, count: usize) {
    let have = out
        .chars()
        .rev()
        .take_while(|c| c.is_whitespace())
        .filter(|c| *c == '\n')
        .count();
    for _ in have..count {
        out.push('\n');
    }
}

/// [`strip_html`] that keeps paragraph breaks. Plain text keeps its own
/// line structure.
pub fn paragraph_text(fragment: &str) -> String {
    if !fragment.contains('<') {
        return collapse_paragraphs(fragment);
    }
    block_text(&Html::parse_fragment(fragment).root_element())
}

/// Reduce an HTML fragment (as found in JSON-LD descriptions) to text.
pub fn strip_html(fragment: &str) -> String {
    if !fragment.contains('<') {
        return fragment.to_string();
    }
    let parsed = Html::parse_fragment(fragment);
    parsed
        .root_element()
        .text()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Case- and whitespace-insensitive form used to compare extracted values.
pub fn comparable(s: &str) -> String {
    collapse_whitespace(s).to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  Senior \n\t Engineer  "), "Senior Engineer");
        assert_eq!(collapse_whitespace("   "), "");
    }

    #[test]
    fn test_collapse_paragraphs_keeps_single_breaks() {
        let text = "\n  First   line \n\n\n Second line\n\n";
        assert_eq!(collapse_paragraphs(text), "First line\n\nSecond line");
    }

    #[test]
    fn test_block_text_keeps_paragraphs_and_items() {
        let html = Html::parse_fragment(
            "<div>\n  <p>First paragraph\n   about the role.</p>\n<p>Second <b>paragraph</b>.</p>\
             <ul><li>Rust</li><li>Go</li></ul>Line one<br>Line two<script>x()</script></div>",
        );
        assert_eq!(
            block_text(&html.root_element()),
            "First paragraph about the role.\n\nSecond paragraph.\n\nRust\nGo\n\nLine one\nLine two"
        );
    }

    #[test]
    fn test_paragraph_text() {
        assert_eq!(
            paragraph_text("<p>Build fast systems.</p><p>Ship often.</p>"),
            "Build fast systems.\n\nShip often."
        );
        assert_eq!(paragraph_text("  One  line \n\n\n Two "), "One line\n\nTwo");
    }

    #[test]
    fn test_strip_html() {
        assert_eq!(
            collapse_whitespace(&strip_html("<p>Build <b>fast</b> systems</p>")),
            "Build fast systems"
        );
        assert_eq!(strip_html("plain text"), "plain text");
    }
}
