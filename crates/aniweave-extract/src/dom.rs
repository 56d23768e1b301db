//! Small helpers over `scraper` shared by the HTML extractors.
//!
//! Selectors are parsed on use and an unparseable selector simply matches
//! nothing, so extractors never panic on a typo'd rule.

use aniweave_common::{ParseError, ProviderId};
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::normalize::collapse_whitespace;

fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

pub(crate) fn select_all<'a>(scope: ElementRef<'a>, css: &str) -> Vec<ElementRef<'a>> {
    match selector(css) {
        Some(sel) => scope.select(&sel).collect(),
        None => Vec::new(),
    }
}

pub(crate) fn select_first<'a>(scope: ElementRef<'a>, css: &str) -> Option<ElementRef<'a>> {
    let sel = selector(css)?;
    scope.select(&sel).next()
}

/// The first element matching any of `candidates`, tried in order.
pub(crate) fn select_any<'a>(scope: ElementRef<'a>, candidates: &[&str]) -> Option<ElementRef<'a>> {
    candidates.iter().find_map(|css| select_first(scope, css))
}

/// Locate the root anchor of a page, or fail with [`ParseError`].
pub(crate) fn require<'a>(
    doc: &'a Html,
    provider: ProviderId,
    css: &str,
) -> Result<ElementRef<'a>, ParseError> {
    select_first(doc.root_element(), css).ok_or_else(|| ParseError::missing(provider, css))
}

pub(crate) fn text(el: ElementRef<'_>) -> String {
    collapse_whitespace(&el.text().collect::<String>())
}

pub(crate) fn first_text(scope: ElementRef<'_>, candidates: &[&str]) -> String {
    select_any(scope, candidates).map(text).unwrap_or_default()
}

pub(crate) fn attr(el: ElementRef<'_>, name: &str) -> String {
    el.value().attr(name).map(str::trim).unwrap_or_default().to_string()
}

/// First non-empty attribute among `names` (e.g. `data-src` before `src`).
pub(crate) fn attr_any(el: ElementRef<'_>, names: &[&str]) -> String {
    names
        .iter()
        .filter_map(|n| el.value().attr(n))
        .map(str::trim)
        .find(|v| !v.is_empty())
        .unwrap_or_default()
        .to_string()
}

/// Resolve `href` against `base`; falls back to the raw value when either
/// side does not parse.
pub(crate) fn absolutize(base: &str, href: &str) -> String {
    let href = href.trim();
    if href.is_empty() {
        return String::new();
    }
    match Url::parse(base).and_then(|b| b.join(href)) {
        Ok(u) => u.to_string(),
        Err(_) => href.to_string(),
    }
}

/// Last non-empty path segment of a URL or path.
pub(crate) fn last_segment(href: &str) -> String {
    href.split(&['?', '#'][..])
        .next()
        .unwrap_or_default()
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_string()
}

/// Unique, non-empty, trimmed strings in first-seen order.
pub(crate) fn dedup_nonempty(values: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for v in values {
        let v = collapse_whitespace(&v);
        if !v.is_empty() && !out.contains(&v) {
            out.push(v);
        }
    }
    out
}
