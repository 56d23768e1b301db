//! AnimeWorld (`/play/<slug>.<id>`) pages and the episode-info API.

use aniweave_common::{ParseError, ProviderId, ProviderRecord, RawEntry};
use scraper::Html;
use serde::Deserialize;

use crate::dom::{
    absolutize, attr, attr_any, dedup_nonempty, first_text, require, select_all, select_any,
    select_first, text,
};
use crate::normalize::clean_title;

const PROVIDER: ProviderId = ProviderId::AnimeWorld;
/// The in-house server; other servers list the same episodes with other ids.
const PREFERRED_SERVER: &str = "9";

/// Extract a series record from a `/play/...` page.
pub fn extract(document: &str, base_url: &str) -> Result<ProviderRecord, ParseError> {
    let doc = Html::parse_document(document);
    let player = require(&doc, PROVIDER, "div.widget.player")?;
    let root = doc.root_element();

    let title = clean_title(&first_text(root, &["h1#anime-title", "h2.title", "h1.title"]));
    let image_url = select_any(root, &["#thumbnail-watch img", "div.thumb img"])
        .map(|img| absolutize(base_url, &attr_any(img, &["data-src", "src"])))
        .unwrap_or_default();
    let description = first_text(root, &["div.desc .long", "div.desc"]);
    let genres = dedup_nonempty(
        select_all(root, "dl.meta a[href*='/genre/']")
            .into_iter()
            .map(text),
    );

    let servers = select_all(player, "div.server");
    let server = servers
        .iter()
        .find(|s| attr(**s, "data-name") == PREFERRED_SERVER)
        .or_else(|| servers.iter().find(|s| select_first(**s, "li.episode a").is_some()))
        .copied();

    let episodes = server
        .map(|s| {
            select_all(s, "li.episode a")
                .into_iter()
                .map(|a| {
                    let hint = attr_any(a, &["data-episode-num", "data-num"]);
                    let hint = if hint.is_empty() { text(a) } else { hint };
                    let mut entry =
                        RawEntry::new(hint, attr(a, "data-id"), absolutize(base_url, &attr(a, "href")));
                    let comment = attr(a, "data-comment");
                    if !comment.is_empty() {
                        entry = entry.with_extra("comment", comment);
                    }
                    entry
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(ProviderRecord {
        title,
        image_url,
        description,
        genres,
        episodes_or_chapters: episodes,
        related: Vec::new(),
    })
}

#[derive(Debug, Deserialize)]
struct EpisodeInfo {
    grabber: Option<String>,
    target: Option<String>,
}

/// Direct media URL from the `/api/episode/info` JSON.
///
/// `Ok(None)` means the payload parsed but carries no usable URL.
pub fn grabber_url(json: &str) -> Result<Option<String>, ParseError> {
    let info: EpisodeInfo =
        serde_json::from_str(json).map_err(|_| ParseError::missing(PROVIDER, "episode info JSON"))?;
    Ok(info
        .grabber
        .or(info.target)
        .map(|u| u.trim().to_string())
        .filter(|u| u.starts_with("http")))
}
