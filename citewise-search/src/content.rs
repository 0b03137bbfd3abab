//! Readability-style content extraction.
//!
//! Parses raw HTML into a document tree, skips non-content subtrees
//! (scripts, navigation, ads, cookie banners, sidebars), picks the primary
//! content container and returns its text. The text is raw; callers run it
//! through [`crate::sanitize::sanitize`].

use crate::error::{Result, SearchError};
use scraper::{ElementRef, Html, Node, Selector};
use std::collections::HashMap;

/// Elements whose whole subtree is never content.
const BOILERPLATE_TAGS: &[&str] = &[
    "script", "style", "nav", "footer", "header", "aside", "noscript", "svg", "iframe", "form",
    "button", "template", "select", "object", "canvas",
];

/// Class / id tokens that mark a subtree as page furniture.
const BOILERPLATE_TOKENS: &[&str] = &[
    "ad",
    "ads",
    "advert",
    "advertisement",
    "banner",
    "breadcrumb",
    "breadcrumbs",
    "comment",
    "comments",
    "consent",
    "cookie",
    "cookies",
    "menu",
    "modal",
    "navbar",
    "newsletter",
    "popup",
    "promo",
    "related",
    "share",
    "sidebar",
    "social",
    "sponsored",
];

/// Elements rendered on their own line.
const BLOCK_TAGS: &[&str] = &[
    "p", "div", "section", "article", "main", "li", "ul", "ol", "h1", "h2", "h3", "h4", "h5",
    "h6", "br", "tr", "table", "blockquote", "pre", "dd", "dt", "figcaption",
];

/// Containers whose class/id tokens are not trusted to mark boilerplate.
const STRUCTURAL_TAGS: &[&str] = &["html", "body", "main", "article"];

/// Preferred content roots, in priority order.
const CONTENT_SELECTORS: &[&str] = &["article", "main", "[role=\"main\"]"];

/// Minimum paragraph text a container needs before it beats `<body>`.
const MIN_DENSITY_SCORE: usize = 140;

/// Text extracted from one HTML document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedPage {
    /// The `<title>` of the page, trimmed. Empty when absent.
    pub title: String,
    /// Raw primary-content text with block boundaries as newlines.
    pub text: String,
}

/// Extract the primary readable text from an HTML document.
///
/// The content root is the first non-empty of `article`, `main` and
/// `[role="main"]`; failing those, the container holding the most paragraph
/// text; failing that, `<body>`.
///
/// An `Ok` with empty `text` means the page had no readable content.
///
/// # Errors
///
/// Returns [`SearchError::Parse`] if the document cannot be processed.
pub fn extract_readable(html: &str) -> Result<ExtractedPage> {
    let document = Html::parse_document(html);
    log_parse_diagnostics(&document);

    let title = extract_title(&document)?;

    for selector_str in CONTENT_SELECTORS {
        let selector = parse_selector(selector_str)?;
        if let Some(root) = document
            .select(&selector)
            .find(|el| !is_boilerplate(el) && !has_boilerplate_ancestor(el))
        {
            let text = element_text(root);
            if !text.trim().is_empty() {
                return Ok(ExtractedPage { title, text });
            }
        }
    }

    if let Some(root) = densest_container(&document)? {
        return Ok(ExtractedPage {
            title,
            text: element_text(root),
        });
    }

    let body = parse_selector("body")?;
    let text = document
        .select(&body)
        .next()
        .map(element_text)
        .unwrap_or_default();

    Ok(ExtractedPage { title, text })
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector)
        .map_err(|e| SearchError::Parse(format!("invalid selector {selector:?}: {e:?}")))
}

/// Log parser diagnostics, ignoring stylesheet noise.
fn log_parse_diagnostics(document: &Html) {
    let relevant: Vec<_> = document
        .errors
        .iter()
        .filter(|e| !e.to_ascii_lowercase().contains("stylesheet"))
        .collect();
    if !relevant.is_empty() {
        tracing::debug!(
            count = relevant.len(),
            first = %relevant[0],
            "HTML parse diagnostics"
        );
    }
}

fn extract_title(document: &Html) -> Result<String> {
    let selector = parse_selector("title")?;
    Ok(document
        .select(&selector)
        .next()
        .map(|el| el.text().collect::<String>())
        .unwrap_or_default()
        .trim()
        .to_owned())
}

/// Pick the container with the most paragraph text, readability-style.
fn densest_container(document: &Html) -> Result<Option<ElementRef<'_>>> {
    let paragraphs = parse_selector("p")?;
    let mut scores: HashMap<_, (ElementRef<'_>, usize)> = HashMap::new();

    for p in document.select(&paragraphs) {
        if has_boilerplate_ancestor(&p) {
            continue;
        }
        let Some(parent) = p.parent().and_then(ElementRef::wrap) else {
            continue;
        };
        let len = p.text().map(|t| t.trim().len()).sum::<usize>();
        let entry = scores.entry(parent.id()).or_insert((parent, 0));
        entry.1 += len;
    }

    Ok(scores
        .into_values()
        .filter(|(_, score)| *score >= MIN_DENSITY_SCORE)
        .max_by_key(|(_, score)| *score)
        .map(|(el, _)| el))
}

/// Collect the text of `root`, skipping boilerplate subtrees.
fn element_text(root: ElementRef<'_>) -> String {
    let mut out = String::new();
    collect_text(root, &mut out);
    out
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(_) => {
                let Some(child_el) = ElementRef::wrap(child) else {
                    continue;
                };
                if is_boilerplate(&child_el) {
                    continue;
                }
                let block = BLOCK_TAGS.contains(&child_el.value().name());
                if block {
                    out.push('\n');
                }
                collect_text(child_el, out);
                if block {
                    out.push('\n');
                }
            }
            _ => {}
        }
    }
}

/// Whether an element is page furniture rather than content.
fn is_boilerplate(element: &ElementRef<'_>) -> bool {
    let el = element.value();
    let name = el.name();

    if BOILERPLATE_TAGS.contains(&name) {
        return true;
    }
    if el.attr("hidden").is_some() || el.attr("aria-hidden") == Some("true") {
        return true;
    }
    if matches!(el.attr("role"), Some("navigation" | "banner" | "complementary")) {
        return true;
    }
    if STRUCTURAL_TAGS.contains(&name) {
        return false;
    }

    let markers = [el.attr("class"), el.attr("id")];
    markers.into_iter().flatten().any(|value| {
        value
            .to_ascii_lowercase()
            .split(|c: char| !c.is_ascii_alphanumeric())
            .any(|token| BOILERPLATE_TOKENS.contains(&token))
    })
}

fn has_boilerplate_ancestor(element: &ElementRef<'_>) -> bool {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .any(|ancestor| is_boilerplate(&ancestor))
}
