//! AnimePahe: anime page metadata, the paged release API, play-page quality
//! buttons and the kwik host.

use aniweave_common::{ParseError, ProviderId, ProviderRecord, RawEntry};
use scraper::Html;
use serde::Deserialize;

use crate::dom::{
    absolutize, attr, attr_any, dedup_nonempty, first_text, require, select_all, select_any, text,
};
use crate::normalize::{clean_title, normalize_date, parse_quality};
use crate::unpack::find_manifest_url;
use crate::Paged;

const PROVIDER: ProviderId = ProviderId::AnimePahe;

/// Extract series metadata from an `/anime/<session>` page.
///
/// Episodes are not in the page; they come from [`parse_release_page`].
pub fn extract(document: &str, base_url: &str) -> Result<ProviderRecord, ParseError> {
    let doc = Html::parse_document(document);
    let header = require(&doc, PROVIDER, "section.main, div.anime-header, header.anime-header")?;
    let root = doc.root_element();

    let title = clean_title(&first_text(header, &["div.title-wrapper h1 span", "h1 span", "h1"]));
    let image_url = select_any(root, &["div.anime-poster img", "div.anime-poster a"])
        .map(|el| absolutize(base_url, &attr_any(el, &["data-src", "src", "href"])))
        .unwrap_or_default();
    let description = first_text(root, &["div.anime-synopsis"]);
    let genres = dedup_nonempty(
        select_all(root, "div.anime-genre li a")
            .into_iter()
            .map(text),
    );

    Ok(ProviderRecord {
        title,
        image_url,
        description,
        genres,
        episodes_or_chapters: Vec::new(),
        related: Vec::new(),
    })
}

#[derive(Debug, Deserialize)]
struct ReleaseJson {
    current_page: Option<u32>,
    last_page: Option<u32>,
    data: Option<Vec<ReleaseItem>>,
}

#[derive(Debug, Deserialize)]
struct ReleaseItem {
    episode: serde_json::Value,
    session: String,
    created_at: Option<String>,
    snapshot: Option<String>,
}

/// One page of `/api?m=release&id=<anime>&sort=episode_asc&page=N`.
///
/// A page with `data: null` (series without releases) is an empty page, not
/// an error.
pub fn parse_release_page(
    json: &str,
    base_url: &str,
    anime_session: &str,
) -> Result<Paged<RawEntry>, ParseError> {
    let page: ReleaseJson =
        serde_json::from_str(json).map_err(|_| ParseError::missing(PROVIDER, "release JSON"))?;
    let base = base_url.trim_end_matches('/');
    let items = page
        .data
        .unwrap_or_default()
        .into_iter()
        .map(|item| {
            let hint = match &item.episode {
                serde_json::Value::Number(n) => n.to_string(),
                serde_json::Value::String(s) => s.clone(),
                _ => String::new(),
            };
            let mut entry = RawEntry::new(
                hint,
                item.session.clone(),
                format!("{base}/play/{anime_session}/{}", item.session),
            )
            .with_extra("anime_session", anime_session);
            entry.published_hint = item.created_at.as_deref().and_then(normalize_date);
            if let Some(snap) = item.snapshot.filter(|s| !s.is_empty()) {
                entry = entry.with_extra("snapshot", snap);
            }
            entry
        })
        .collect();
    let current_page = page.current_page.unwrap_or(1);
    Ok(Paged {
        items,
        current_page,
        last_page: page.last_page.unwrap_or(current_page),
    })
}

/// One quality/audio button on a `/play/<anime>/<episode>` page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaheSource {
    /// kwik embed URL.
    pub src: String,
    pub resolution: String,
    /// `jpn` or `eng`.
    pub audio: String,
    pub fansub: String,
}

/// Quality buttons of a play page, in page order.
pub fn play_sources(document: &str) -> Vec<PaheSource> {
    let doc = Html::parse_document(document);
    select_all(doc.root_element(), "#resolutionMenu button[data-src], button[data-src][data-resolution]")
        .into_iter()
        .map(|b| PaheSource {
            src: attr(b, "data-src"),
            resolution: attr(b, "data-resolution"),
            audio: attr(b, "data-audio"),
            fansub: attr(b, "data-fansub"),
        })
        .filter(|s| !s.src.is_empty())
        .collect()
}

/// Map `sub`/`dub` aliases onto AnimePahe's audio tags.
fn audio_tag(pref: &str) -> String {
    match pref.to_ascii_lowercase().as_str() {
        "sub" | "ja" | "jp" | "japanese" => "jpn".to_string(),
        "dub" | "en" | "english" => "eng".to_string(),
        other => other.to_string(),
    }
}

/// Pick the button matching the requested quality and audio track.
///
/// Audio narrows the candidates when any match; quality then picks an exact
/// resolution, falling back to the highest available.
pub fn choose_source<'a>(
    sources: &'a [PaheSource],
    quality: Option<&str>,
    audio: Option<&str>,
) -> Option<&'a PaheSource> {
    let wanted_audio = audio.map(audio_tag);
    let by_audio: Vec<&PaheSource> = match &wanted_audio {
        Some(a) if sources.iter().any(|s| &s.audio == a) => {
            sources.iter().filter(|s| &s.audio == a).collect()
        }
        _ => sources.iter().collect(),
    };
    let wanted_q = quality.and_then(parse_quality);
    wanted_q
        .and_then(|q| {
            by_audio
                .iter()
                .find(|s| parse_quality(&s.resolution) == Some(q))
                .copied()
        })
        .or_else(|| {
            by_audio
                .iter()
                .max_by_key(|s| parse_quality(&s.resolution).unwrap_or(0))
                .copied()
        })
}

/// The `.m3u8` URL hidden in a kwik embed page.
pub fn kwik_manifest(document: &str) -> Option<String> {
    find_manifest_url(document)
}
