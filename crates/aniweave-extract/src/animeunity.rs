//! AnimeUnity: data lives in JSON attributes of the `<video-player>` element,
//! with related titles in an `items-json` attribute and long series paged
//! through `/info_api`. Streams go through a VixCloud embed.

use std::sync::LazyLock;

use aniweave_common::{ParseError, ProviderId, ProviderRecord, RawEntry, RelatedItem};
use regex::Regex;
use scraper::Html;
use serde::Deserialize;
use url::Url;

use crate::dom::{attr, require, select_first};
use crate::normalize::{clean_title, collapse_whitespace, normalize_date};

const PROVIDER: ProviderId = ProviderId::AnimeUnity;

/// Episodes returned per `/info_api` range request.
pub const RANGE_SIZE: u32 = 120;

#[derive(Debug, Deserialize)]
struct AnimeJson {
    id: u64,
    slug: Option<String>,
    title: Option<String>,
    title_eng: Option<String>,
    imageurl: Option<String>,
    plot: Option<String>,
    #[serde(default)]
    genres: Vec<GenreJson>,
    episodes_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct GenreJson {
    name: String,
}

#[derive(Debug, Deserialize)]
struct EpisodeJson {
    id: u64,
    number: serde_json::Value,
    created_at: Option<String>,
    scws_id: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct RelatedJson {
    id: u64,
    slug: Option<String>,
    title: Option<String>,
    title_eng: Option<String>,
    imageurl: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InfoApiJson {
    episodes: Option<Vec<EpisodeJson>>,
}

/// Identity and size of a series, needed to page `/info_api`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesHandle {
    pub anime_id: u64,
    pub slug: String,
    pub episodes_count: u32,
}

impl SeriesHandle {
    pub fn page_url(&self, base_url: &str) -> String {
        format!(
            "{}/anime/{}-{}",
            base_url.trim_end_matches('/'),
            self.anime_id,
            self.slug
        )
    }

    /// `(start, end)` ranges, both inclusive, covering every episode.
    pub fn ranges(&self) -> Vec<(u32, u32)> {
        let mut out = Vec::new();
        let mut start = 1;
        while start <= self.episodes_count {
            let end = (start + RANGE_SIZE - 1).min(self.episodes_count);
            out.push((start, end));
            start = end + 1;
        }
        out
    }
}

fn number_hint(v: &serde_json::Value) -> String {
    match v {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Number(n) => n.to_string(),
        _ => String::new(),
    }
}

fn episode_entry(ep: EpisodeJson, series_url: &str) -> RawEntry {
    let mut entry = RawEntry::new(
        number_hint(&ep.number),
        ep.id.to_string(),
        format!("{series_url}/{}", ep.id),
    );
    entry.published_hint = ep.created_at.as_deref().and_then(normalize_date_prefix);
    if let Some(scws) = ep.scws_id {
        entry = entry.with_extra("scws_id", scws.to_string());
    }
    entry
}

/// `created_at` is an ISO timestamp with a `T` separator.
fn normalize_date_prefix(raw: &str) -> Option<String> {
    normalize_date(raw.get(..10).unwrap_or(raw))
}

fn decode_anime(document: &Html) -> Result<(AnimeJson, Option<String>), ParseError> {
    let player = require(document, PROVIDER, "video-player")?;
    let anime: AnimeJson = player
        .value()
        .attr("anime")
        .and_then(|raw| serde_json::from_str(raw).ok())
        .ok_or_else(|| ParseError::missing(PROVIDER, "video-player[anime]"))?;
    Ok((anime, player.value().attr("episodes").map(str::to_string)))
}

/// Extract a series record from an `/anime/<id>-<slug>` page.
///
/// Only the first episode range is embedded in the page; see
/// [`series_handle`] and [`parse_info_api`] for the rest.
pub fn extract(document: &str, base_url: &str) -> Result<ProviderRecord, ParseError> {
    let doc = Html::parse_document(document);
    let (anime, episodes_raw) = decode_anime(&doc)?;
    let base = base_url.trim_end_matches('/');
    let series_url = format!("{base}/anime/{}-{}", anime.id, anime.slug.as_deref().unwrap_or_default());

    let episodes = episodes_raw
        .and_then(|raw| serde_json::from_str::<Vec<EpisodeJson>>(&raw).ok())
        .unwrap_or_default()
        .into_iter()
        .map(|ep| episode_entry(ep, &series_url))
        .collect();

    let title = anime
        .title_eng
        .filter(|t| !t.trim().is_empty())
        .or(anime.title)
        .unwrap_or_default();

    Ok(ProviderRecord {
        title: clean_title(&title),
        image_url: anime.imageurl.unwrap_or_default(),
        description: collapse_whitespace(anime.plot.as_deref().unwrap_or_default()),
        genres: anime.genres.into_iter().map(|g| g.name).collect(),
        episodes_or_chapters: episodes,
        related: related_items(&doc, base),
    })
}

/// Related titles from the `items-json` attribute. Undecodable JSON yields
/// an empty list.
fn related_items(doc: &Html, base: &str) -> Vec<RelatedItem> {
    let Some(raw) = select_first(doc.root_element(), "[items-json]").map(|el| attr(el, "items-json"))
    else {
        return Vec::new();
    };
    serde_json::from_str::<Vec<RelatedJson>>(&raw)
        .unwrap_or_default()
        .into_iter()
        .map(|r| {
            let title = r.title_eng.filter(|t| !t.is_empty()).or(r.title).unwrap_or_default();
            RelatedItem {
                title: clean_title(&title),
                url: format!("{base}/anime/{}-{}", r.id, r.slug.unwrap_or_default()),
                image_url: r.imageurl.filter(|u| !u.is_empty()),
            }
        })
        .collect()
}

/// Series id, slug and total episode count from a title page.
pub fn series_handle(document: &str) -> Result<SeriesHandle, ParseError> {
    let doc = Html::parse_document(document);
    let (anime, _) = decode_anime(&doc)?;
    let player = require(&doc, PROVIDER, "video-player")?;
    let episodes_count = anime
        .episodes_count
        .or_else(|| attr(player, "episodes_count").parse().ok())
        .unwrap_or(0);
    Ok(SeriesHandle {
        anime_id: anime.id,
        slug: anime.slug.unwrap_or_default(),
        episodes_count,
    })
}

/// Episodes from one `/info_api/{id}/1?start_range=..&end_range=..` response.
pub fn parse_info_api(json: &str, series_url: &str) -> Result<Vec<RawEntry>, ParseError> {
    let info: InfoApiJson =
        serde_json::from_str(json).map_err(|_| ParseError::missing(PROVIDER, "info_api JSON"))?;
    let episodes = info
        .episodes
        .ok_or_else(|| ParseError::missing(PROVIDER, "episodes"))?;
    Ok(episodes
        .into_iter()
        .map(|ep| episode_entry(ep, series_url.trim_end_matches('/')))
        .collect())
}

static MASTER_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"url\s*:\s*['"]([^'"]+)['"]"#).expect("valid master url regex"));
static MASTER_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"['"]token['"]\s*:\s*['"]([^'"]+)['"]"#).expect("valid token regex")
});
static MASTER_EXPIRES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"['"]expires['"]\s*:\s*['"]?(\d+)['"]?"#).expect("valid expires regex")
});
static CAN_PLAY_FHD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"canPlayFHD\s*=\s*true").expect("valid fhd regex"));

/// The `window.masterPlaylist` block of a VixCloud embed page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MasterPlaylist {
    pub url: String,
    pub token: String,
    /// Unix timestamp after which the token is rejected.
    pub expires: i64,
    pub fhd: bool,
}

impl MasterPlaylist {
    /// The playable manifest URL with auth parameters applied.
    pub fn playlist_url(&self) -> Option<String> {
        let mut url = Url::parse(&self.url).ok()?;
        url.query_pairs_mut()
            .append_pair("token", &self.token)
            .append_pair("expires", &self.expires.to_string());
        if self.fhd {
            url.query_pairs_mut().append_pair("h", "1");
        }
        Some(url.to_string())
    }
}

/// Parse the master playlist descriptor out of a VixCloud embed page.
pub fn master_playlist(document: &str) -> Option<MasterPlaylist> {
    let start = document.find("masterPlaylist")?;
    let block = &document[start..];
    Some(MasterPlaylist {
        url: MASTER_URL.captures(block)?[1].to_string(),
        token: MASTER_TOKEN.captures(block)?[1].to_string(),
        expires: MASTER_EXPIRES.captures(block)?[1].parse().ok()?,
        fhd: CAN_PLAY_FHD.is_match(document),
    })
}
