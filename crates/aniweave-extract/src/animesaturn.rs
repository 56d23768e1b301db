//! AnimeSaturn series, episode and watch pages.

use std::sync::LazyLock;

use aniweave_common::{ParseError, ProviderId, ProviderRecord, RawEntry};
use regex::Regex;
use scraper::Html;

use crate::dom::{
    absolutize, attr, attr_any, dedup_nonempty, first_text, last_segment, require, select_all,
    select_any, select_first, text,
};
use crate::normalize::clean_title;

const PROVIDER: ProviderId = ProviderId::AnimeSaturn;

static JW_FILE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"file\s*:\s*["']([^"']+\.(?:m3u8|mp4)[^"']*)["']"#).expect("valid jwplayer regex")
});

/// Extract a series record from an `/anime/<slug>` page.
pub fn extract(document: &str, base_url: &str) -> Result<ProviderRecord, ParseError> {
    let doc = Html::parse_document(document);
    let header = require(&doc, PROVIDER, "div.anime-title-as")?;
    let root = doc.root_element();

    let title = select_any(header, &["b", "h1"])
        .map(text)
        .map(|t| clean_title(&t))
        .unwrap_or_default();
    let image_url = select_first(root, "img.cover-anime")
        .map(|img| absolutize(base_url, &attr_any(img, &["data-src", "src"])))
        .unwrap_or_default();
    // The full synopsis is hidden behind a "show more" toggle.
    let description = first_text(root, &["#full-trama", "#shown-trama", "div.trama"]);
    let genres = dedup_nonempty(
        select_all(root, "a.badge[href*='/genere/']")
            .into_iter()
            .map(text),
    );

    let episodes = select_all(root, "div.episodes-button a, div.btn-group.episodes-button a")
        .into_iter()
        .filter_map(|a| {
            let href = attr(a, "href");
            if !href.contains("/ep/") {
                return None;
            }
            Some(RawEntry::new(
                text(a),
                last_segment(&href),
                absolutize(base_url, &href),
            ))
        })
        .collect::<Vec<_>>();

    Ok(ProviderRecord {
        title,
        image_url,
        description,
        genres,
        episodes_or_chapters: dedup_by_url(episodes),
        related: Vec::new(),
    })
}

fn dedup_by_url(entries: Vec<RawEntry>) -> Vec<RawEntry> {
    let mut seen = std::collections::HashSet::new();
    entries
        .into_iter()
        .filter(|e| seen.insert(e.remote_url.clone()))
        .collect()
}

/// The `/watch?file=...` link on an episode page.
pub fn watch_link(document: &str, base_url: &str) -> Option<String> {
    let doc = Html::parse_document(document);
    select_first(doc.root_element(), "a[href*='/watch?file=']")
        .map(|a| absolutize(base_url, &attr(a, "href")))
        .filter(|u| !u.is_empty())
}

/// Media URL on a watch page: a `<source>` tag, or a jwplayer `file:` entry.
pub fn media_source(document: &str, base_url: &str) -> Option<String> {
    let doc = Html::parse_document(document);
    let from_tag = select_first(doc.root_element(), "video source[src], source[type*='mp4']")
        .map(|s| attr(s, "src"))
        .filter(|s| !s.is_empty());
    from_tag
        .or_else(|| JW_FILE.captures(document).map(|c| c[1].to_string()))
        .map(|u| absolutize(base_url, &u))
}
