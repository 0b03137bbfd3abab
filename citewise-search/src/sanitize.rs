//! Normalisation of extracted page text.
//!
//! [`sanitize`] is pure: it strips residual markup, decodes entities left
//! behind by extraction, drops control characters and collapses whitespace,
//! keeping the remaining text in its original order. Only well-formed tags of
//! known HTML elements count as markup, so angle brackets in prose survive.

/// Entities commonly left in text nodes by double-encoded pages.
const ENTITIES: &[(&str, &str)] = &[
    ("&nbsp;", " "),
    ("&amp;", "&"),
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&quot;", "\""),
    ("&#39;", "'"),
    ("&apos;", "'"),
    ("&ndash;", "\u{2013}"),
    ("&mdash;", "\u{2014}"),
    ("&hellip;", "\u{2026}"),
];

/// Normalise raw extracted text for prompt use.
///
/// - residual `<tag ...>` markup of known elements is removed
/// - common HTML entities are decoded
/// - tabs and control characters become spaces
/// - runs of spaces collapse to one
/// - blank-line runs collapse to a single newline
/// - each line and the whole text are trimmed
///
/// Degenerate input (empty, whitespace or markup only) yields an empty string.
pub fn sanitize(text: &str) -> String {
    let without_tags = strip_residual_tags(text);
    let decoded = decode_entities(&without_tags);
    collapse_whitespace(&decoded)
}

/// Element names treated as markup when they survive extraction.
const HTML_ELEMENTS: &[&str] = &[
    "a", "abbr", "article", "aside", "b", "blockquote", "body", "br", "button", "caption",
    "cite", "code", "dd", "del", "details", "div", "dl", "dt", "em", "figcaption", "figure",
    "font", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "head", "header", "hr",
    "html", "i", "iframe", "img", "input", "ins", "label", "li", "link", "main", "mark",
    "meta", "nav", "noscript", "ol", "p", "picture", "pre", "q", "s", "script", "section",
    "small", "source", "span", "strong", "style", "sub", "summary", "sup", "svg", "table",
    "tbody", "td", "tfoot", "th", "thead", "time", "title", "tr", "u", "ul", "video", "wbr",
];

/// Remove well-formed HTML tags: a known element name, optionally closing,
/// with optional attributes, up to `>`; plus `<!-- -->` comments and `<!...>`
/// declarations. Anything else containing `<` is left as text.
fn strip_residual_tags(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(open) = rest.find('<') {
        result.push_str(&rest[..open]);
        let candidate = &rest[open..];
        match tag_len(candidate) {
            Some(len) => {
                // Tags separate words.
                result.push(' ');
                rest = &candidate[len..];
            }
            None => {
                result.push('<');
                rest = &candidate[1..];
            }
        }
    }

    result.push_str(rest);
    result
}

/// Byte length of the tag at the start of `s` (which begins with `<`).
fn tag_len(s: &str) -> Option<usize> {
    let inner = &s[1..];

    if let Some(comment) = inner.strip_prefix("!--") {
        return comment.find("-->").map(|end| 1 + 3 + end + 3);
    }
    if let Some(decl) = inner.strip_prefix('!') {
        if !decl.starts_with(|c: char| c.is_ascii_alphabetic()) {
            return None;
        }
        return decl.find('>').filter(|&end| !decl[..end].contains('<')).map(|end| 2 + end + 1);
    }

    let (closing, body) = match inner.strip_prefix('/') {
        Some(body) => (1, body),
        None => (0, inner),
    };
    let name_len = body
        .find(|c: char| !c.is_ascii_alphanumeric())
        .unwrap_or(body.len());
    let name = body[..name_len].to_ascii_lowercase();
    if !HTML_ELEMENTS.contains(&name.as_str()) {
        return None;
    }

    let after = &body[name_len..];
    if !after.starts_with(|c: char| c == '>' || c == '/' || c.is_whitespace()) {
        return None;
    }
    let end = after.find('>')?;
    if after[..end].contains('<') {
        return None;
    }
    Some(1 + closing + name_len + end + 1)
}

fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_owned();
    }
    let mut decoded = text.to_owned();
    for (entity, replacement) in ENTITIES {
        if decoded.contains(entity) {
            decoded = decoded.replace(entity, replacement);
        }
    }
    decoded
}

/// Collapse spaces to one and blank-line runs to a single newline.
fn collapse_whitespace(text: &str) -> String {
    let mut lines: Vec<String> = Vec::new();

    for raw_line in text.split('\n') {
        let mut line = String::with_capacity(raw_line.len());
        let mut prev_was_space = true;
        for ch in raw_line.chars() {
            if ch.is_whitespace() || ch.is_control() {
                if !prev_was_space {
                    line.push(' ');
                    prev_was_space = true;
                }
            } else {
                line.push(ch);
                prev_was_space = false;
            }
        }
        let trimmed = line.trim_end();
        if !trimmed.is_empty() {
            lines.push(trimmed.to_owned());
        }
    }

    lines.join("\n")
}

/// Truncate to at most `cap` characters, on a char boundary.
pub fn truncate_chars(text: &str, cap: usize) -> String {
    match text.char_indices().nth(cap) {
        Some((byte_end, _)) => text[..byte_end].to_owned(),
        None => text.to_owned(),
    }
}
