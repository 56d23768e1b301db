//! AnimeGG series pages, per-audio embed tabs and `videoSources` lists.

use std::sync::LazyLock;

use aniweave_common::{ParseError, ProviderId, ProviderRecord, RawEntry, StreamVariant};
use regex::Regex;
use scraper::Html;

use crate::dom::{
    absolutize, attr, attr_any, dedup_nonempty, first_text, last_segment, require, select_all,
    select_first, text,
};
use crate::normalize::{clean_title, parse_quality, trailing_episode_label};

const PROVIDER: ProviderId = ProviderId::AnimeGG;

static VIDEO_SOURCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"file\s*:\s*["']([^"']+)["']\s*,\s*label\s*:\s*["']([^"']+)["']"#)
        .expect("valid videoSources regex")
});

/// Extract a record from a `/series/<slug>` page.
pub fn extract(document: &str, base_url: &str) -> Result<ProviderRecord, ParseError> {
    let doc = Html::parse_document(document);
    let media = require(&doc, PROVIDER, "div.media")?;
    let root = doc.root_element();

    let title = clean_title(&first_text(media, &["div.media-body h1", "h1"]));
    let image_url = select_first(media, "img.media-object")
        .map(|img| absolutize(base_url, &attr_any(img, &["data-src", "src"])))
        .unwrap_or_default();
    let description = first_text(root, &["p.ptext", ".ptext"]);
    let genres = dedup_nonempty(select_all(root, ".tagscat a").into_iter().map(text));

    let mut episodes: Vec<RawEntry> = select_all(root, "ul.newmanga li a.anm_det_pop")
        .into_iter()
        .map(|a| {
            let href = attr(a, "href");
            RawEntry::new(
                trailing_episode_label(&text(a)),
                last_segment(&href),
                absolutize(base_url, &href),
            )
        })
        .collect();
    // Listed newest first.
    episodes.reverse();

    Ok(ProviderRecord {
        title,
        image_url,
        description,
        genres,
        episodes_or_chapters: episodes,
        related: Vec::new(),
    })
}

/// One embed tab (`#subbed-Animegg`, `#dubbed-Animegg`, `#raw-Animegg`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedTab {
    /// `subbed`, `dubbed` or `raw`.
    pub audio: String,
    pub embed_url: String,
}

/// Embed iframes of an episode page, in page order.
pub fn episode_embeds(document: &str, base_url: &str) -> Vec<EmbedTab> {
    let doc = Html::parse_document(document);
    select_all(doc.root_element(), "div[id$='-Animegg']")
        .into_iter()
        .filter_map(|tab| {
            let id = attr(tab, "id");
            let audio = id.trim_end_matches("-Animegg").to_ascii_lowercase();
            let iframe = select_first(tab, "iframe")?;
            let src = attr_any(iframe, &["src", "data-src"]);
            (!src.is_empty()).then(|| EmbedTab {
                audio,
                embed_url: absolutize(base_url, &src),
            })
        })
        .collect()
}

/// Pick a tab for `sub`/`dub`/`raw` (or the long forms), defaulting to the first.
pub fn choose_embed<'a>(tabs: &'a [EmbedTab], audio: Option<&str>) -> Option<&'a EmbedTab> {
    let wanted = audio.map(|a| match a.to_ascii_lowercase().as_str() {
        "sub" | "subbed" => "subbed",
        "dub" | "dubbed" => "dubbed",
        "raw" => "raw",
        _ => "",
    });
    wanted
        .and_then(|w| tabs.iter().find(|t| t.audio == w))
        .or_else(|| tabs.first())
}

/// Quality ladder from the embed page's `videoSources` array, best first.
pub fn video_sources(document: &str, base_url: &str) -> Vec<StreamVariant> {
    let mut variants: Vec<StreamVariant> = VIDEO_SOURCE
        .captures_iter(document)
        .map(|c| StreamVariant {
            quality: c[2].to_string(),
            url: absolutize(base_url, &c[1]),
        })
        .collect();
    variants.sort_by_key(|v| std::cmp::Reverse(parse_quality(&v.quality).unwrap_or(0)));
    variants
}
