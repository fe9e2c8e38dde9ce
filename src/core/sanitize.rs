//! Markup sanitization for prompts and provider output, plus option clamping.
//!
//! Everything here is pure: no I/O, no shared state.
//!
//! Input stripping only removes tags whose name is a known HTML element, so
//! generic-looking text such as `Vec<String>` or `Option<T>` survives. Text
//! that reads as a real element (`a<b and c>d` opens a `<b>` with attributes
//! `and` and `c`) is still treated as markup and removed.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::options::{
    IMAGE_DIMENSION_RANGE, MAX_TOKENS_CEILING, RequestOptions, STEPS_RANGE, TEMPERATURE_RANGE,
    TIMEOUT_RANGE_MS,
};

// =============================================================================
// Patterns
// =============================================================================

/// `<script>`/`<style>` elements including their content.
static INPUT_BLOCK_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>|<style\b[^>]*>.*?</style\s*>")
        .expect("input block pattern is valid")
});

/// HTML element names recognized as markup in caller input.
const HTML_ELEMENTS: &[&str] = &[
    "a", "abbr", "address", "area", "article", "aside", "audio", "b", "base", "bdi", "bdo",
    "blockquote", "body", "br", "button", "canvas", "caption", "center", "cite", "code", "col",
    "colgroup", "data", "datalist", "dd", "del", "details", "dfn", "dialog", "div", "dl", "dt",
    "em", "embed", "fieldset", "figcaption", "figure", "font", "footer", "form", "frame",
    "frameset", "h1", "h2", "h3", "h4", "h5", "h6", "head", "header", "hr", "html", "i",
    "iframe", "img", "input", "ins", "kbd", "label", "legend", "li", "link", "main", "map",
    "mark", "marquee", "math", "menu", "meta", "meter", "nav", "noscript", "object", "ol",
    "optgroup", "option", "output", "p", "param", "picture", "pre", "progress", "q", "rp", "rt",
    "ruby", "s", "samp", "script", "section", "select", "slot", "small", "source", "span",
    "strike", "strong", "style", "sub", "summary", "sup", "svg", "table", "tbody", "td",
    "template", "textarea", "tfoot", "th", "thead", "time", "title", "tr", "track", "tt", "u",
    "ul", "var", "video", "wbr",
];

/// Known element tags and HTML comments. The name must end at whitespace,
/// `/` or `>`, so `<table>` is never read as `<t`.
static ANY_TAG_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?is)<!--.*?-->|</?(?:{})(?:[\s/][^<>]*)?>",
        HTML_ELEMENTS.join("|")
    ))
    .expect("tag pattern is valid")
});

/// Dangerous elements including their content.
static OUTPUT_BLOCK_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?is)<script\b[^>]*>.*?</script\s*>|<style\b[^>]*>.*?</style\s*>|<iframe\b[^>]*>.*?</iframe\s*>|<object\b[^>]*>.*?</object\s*>|<embed\b[^>]*>.*?</embed\s*>",
    )
    .expect("output block pattern is valid")
});

/// Unpaired open or close tags of dangerous elements.
static DANGEROUS_TAG_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)</?(?:script|style|iframe|object|embed)\b[^>]*>")
        .expect("dangerous tag pattern is valid")
});

/// Opening tags that survive output sanitization.
static OPEN_TAG_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[A-Za-z][^<>]*>").expect("open tag pattern is valid"));

/// `on*=` event handler attributes. HTML accepts `/` as well as whitespace
/// before an attribute name (`<img/onerror=...>`).
static EVENT_HANDLER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)[\s/]+on[a-z]+\s*=\s*(?:"[^"]*"|'[^']*'|[^\s>]+)"#)
        .expect("event handler pattern is valid")
});

/// `javascript:` URL schemes (whitespace tolerant).
static JAVASCRIPT_URL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)javascript\s*:").expect("javascript url pattern is valid"));

// =============================================================================
// Text
// =============================================================================

/// Strip all markup from caller input, leaving trimmed plain text.
#[must_use]
pub fn sanitize_input(text: &str) -> String {
    let without_blocks = INPUT_BLOCK_REGEX.replace_all(text, "");
    let without_tags = ANY_TAG_REGEX.replace_all(&without_blocks, "");
    without_tags.trim().to_string()
}

/// Strip unsafe markup from provider output while keeping everything else.
#[must_use]
pub fn sanitize_output(text: &str) -> String {
    let without_blocks = OUTPUT_BLOCK_REGEX.replace_all(text, "");
    let without_dangerous = DANGEROUS_TAG_REGEX.replace_all(&without_blocks, "");
    OPEN_TAG_REGEX
        .replace_all(&without_dangerous, |caps: &Captures<'_>| {
            let tag = EVENT_HANDLER_REGEX.replace_all(&caps[0], "");
            JAVASCRIPT_URL_REGEX.replace_all(&tag, "").into_owned()
        })
        .into_owned()
}

// =============================================================================
// Options
// =============================================================================

/// Options for text, speech and transcription calls: recognized keys only,
/// numeric fields clamped, image-only fields dropped.
#[must_use]
pub fn sanitize_options(options: &RequestOptions) -> RequestOptions {
    RequestOptions {
        model: clean_identifier(options.model.as_deref()),
        temperature: options
            .temperature
            .map(|t| t.clamp(TEMPERATURE_RANGE.0, TEMPERATURE_RANGE.1)),
        max_tokens: options.max_tokens.map(|n| n.clamp(1, MAX_TOKENS_CEILING)),
        width: None,
        height: None,
        steps: None,
        voice_id: clean_identifier(options.voice_id.as_deref()),
        model_id: clean_identifier(options.model_id.as_deref()),
        timeout_ms: options
            .timeout_ms
            .map(|ms| ms.clamp(TIMEOUT_RANGE_MS.0, TIMEOUT_RANGE_MS.1)),
    }
}

/// Options for image calls: like [`sanitize_options`] but keeps dimensions
/// and steps, clamped to their ranges.
#[must_use]
pub fn sanitize_image_options(options: &RequestOptions) -> RequestOptions {
    let (min_dim, max_dim) = IMAGE_DIMENSION_RANGE;
    RequestOptions {
        width: options.width.map(|w| w.clamp(min_dim, max_dim)),
        height: options.height.map(|h| h.clamp(min_dim, max_dim)),
        steps: options.steps.map(|s| s.clamp(STEPS_RANGE.0, STEPS_RANGE.1)),
        ..sanitize_options(options)
    }
}

fn clean_identifier(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
