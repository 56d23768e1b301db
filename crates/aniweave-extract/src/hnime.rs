//! HiAnime ("HNime"): detail page plus JSON-wrapped HTML fragments from the
//! `ajax/v2` endpoints.

use aniweave_common::{ParseError, ProviderId, ProviderRecord, RawEntry, SubtitleTrack};
use scraper::Html;
use serde::Deserialize;

use crate::dom::{
    absolutize, attr, attr_any, dedup_nonempty, first_text, require, select_all, select_first,
    text,
};
use crate::normalize::{clean_title, language_code};

const PROVIDER: ProviderId = ProviderId::HNime;

/// Extract metadata from a detail page. Episodes come from
/// [`parse_episode_list`].
pub fn extract(document: &str, base_url: &str) -> Result<ProviderRecord, ParseError> {
    let doc = Html::parse_document(document);
    let detail = require(&doc, PROVIDER, "#ani_detail")?;

    let title = clean_title(&first_text(detail, &["h2.film-name", ".film-name"]));
    let image_url = select_first(detail, ".film-poster img")
        .map(|img| absolutize(base_url, &attr_any(img, &["data-src", "src"])))
        .unwrap_or_default();
    let description = first_text(detail, &[".film-description .text", ".film-description"]);
    let genres = dedup_nonempty(
        select_all(doc.root_element(), ".item-list a[href*='/genre/']")
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

/// Numeric id used by the ajax endpoints (`#wrapper[data-id]`).
pub fn anime_id(document: &str) -> Option<String> {
    let doc = Html::parse_document(document);
    select_first(doc.root_element(), "#wrapper[data-id], [data-anime-id]")
        .map(|el| attr_any(el, &["data-id", "data-anime-id"]))
        .filter(|id| !id.is_empty())
}

#[derive(Debug, Deserialize)]
struct HtmlWrapper {
    html: Option<String>,
}

fn unwrap_html(json: &str, anchor: &str) -> Result<Html, ParseError> {
    let wrapper: HtmlWrapper =
        serde_json::from_str(json).map_err(|_| ParseError::missing(PROVIDER, anchor))?;
    let html = wrapper.html.ok_or_else(|| ParseError::missing(PROVIDER, "html"))?;
    Ok(Html::parse_fragment(&html))
}

/// Episodes from `ajax/v2/episode/list/<anime id>`.
pub fn parse_episode_list(json: &str, base_url: &str) -> Result<Vec<RawEntry>, ParseError> {
    let frag = unwrap_html(json, "episode list JSON")?;
    Ok(select_all(frag.root_element(), "a.ep-item")
        .into_iter()
        .map(|a| {
            let mut entry = RawEntry::new(
                attr(a, "data-number"),
                attr(a, "data-id"),
                absolutize(base_url, &attr(a, "href")),
            );
            let title = attr(a, "title");
            if !title.is_empty() {
                entry = entry.with_extra("title", title);
            }
            if a.value().classes().any(|c| c == "ssl-item-filler") {
                entry = entry.with_extra("filler", "true");
            }
            entry
        })
        .collect())
}

/// One streaming server offered for an episode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Server {
    /// Id passed to the sources endpoint.
    pub id: String,
    pub name: String,
    /// `sub`, `dub` or `raw`.
    pub kind: String,
}

/// Servers from `ajax/v2/episode/servers?episodeId=...`.
pub fn parse_servers(json: &str) -> Result<Vec<Server>, ParseError> {
    let frag = unwrap_html(json, "servers JSON")?;
    Ok(select_all(frag.root_element(), "div.server-item")
        .into_iter()
        .map(|el| Server {
            id: attr(el, "data-id"),
            name: text(el),
            kind: attr(el, "data-type"),
        })
        .filter(|s| !s.id.is_empty())
        .collect())
}

/// Server for the requested audio kind, falling back to the first `sub`
/// server and then to anything.
pub fn choose_server<'a>(servers: &'a [Server], audio: Option<&str>) -> Option<&'a Server> {
    let wanted = audio.map(str::to_ascii_lowercase);
    wanted
        .as_deref()
        .and_then(|k| servers.iter().find(|s| s.kind == k))
        .or_else(|| servers.iter().find(|s| s.kind == "sub"))
        .or_else(|| servers.first())
}

#[derive(Debug, Deserialize)]
struct SourcesJson {
    link: Option<String>,
    #[serde(default)]
    tracks: Vec<TrackJson>,
}

#[derive(Debug, Deserialize)]
struct TrackJson {
    file: String,
    label: Option<String>,
    kind: Option<String>,
}

/// Embed link and subtitle tracks from `ajax/v2/episode/sources?id=...`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sources {
    pub link: Option<String>,
    pub subtitles: Vec<SubtitleTrack>,
}

pub fn parse_sources(json: &str) -> Result<Sources, ParseError> {
    let raw: SourcesJson =
        serde_json::from_str(json).map_err(|_| ParseError::missing(PROVIDER, "sources JSON"))?;
    let subtitles = raw
        .tracks
        .into_iter()
        .filter(|t| matches!(t.kind.as_deref(), None | Some("captions") | Some("subtitles")))
        .filter_map(|t| {
            let lang = language_code(t.label.as_deref().unwrap_or_default())?;
            Some(SubtitleTrack { lang, url: t.file })
        })
        .collect();
    Ok(Sources {
        link: raw.link.filter(|l| l.starts_with("http")),
        subtitles,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_page() {
        let page = r#"<div id="wrapper" data-id="18718"><div id="ani_detail">
            <div class="film-poster"><img class="film-poster-img" src="https://cdn.example/poster.jpg"></div>
            <h2 class="film-name dynamic-name">Frieren: Beyond Journey's End</h2>
            <div class="film-description m-hide"><div class="text"> During their decade-long quest... </div></div>
        </div>
        <div class="item-list"><a href="/genre/adventure">Adventure</a><a href="/genre/drama">Drama</a></div></div>"#;
        let rec = extract(page, "https://hianime.to/frieren-18542").unwrap();
        assert_eq!(rec.title, "Frieren: Beyond Journey's End");
        assert_eq!(rec.description, "During their decade-long quest...");
        assert_eq!(rec.genres, vec!["Adventure", "Drama"]);
        assert_eq!(anime_id(page).as_deref(), Some("18718"));
    }

    #[test]
    fn episode_list_fragment() {
        let json = r#"{"status":true,"html":"<div class=\"ss-list\"><a title=\"The Journey's End\" class=\"ssl-item ep-item\" data-number=\"1\" data-id=\"114721\" href=\"/watch/frieren-18542?ep=114721\">1</a><a class=\"ssl-item ep-item ssl-item-filler\" data-number=\"2\" data-id=\"114722\" href=\"/watch/frieren-18542?ep=114722\">2</a></div>","totalItems":2}"#;
        let eps = parse_episode_list(json, "https://hianime.to").unwrap();
        assert_eq!(eps.len(), 2);
        assert_eq!(eps[0].remote_id, "114721");
        assert_eq!(eps[0].remote_url, "https://hianime.to/watch/frieren-18542?ep=114721");
        assert_eq!(eps[0].extra.get("title").map(String::as_str), Some("The Journey's End"));
        assert_eq!(eps[1].extra.get("filler").map(String::as_str), Some("true"));
        assert!(parse_episode_list(r#"{"status":false}"#, "https://hianime.to").is_err());
    }

    #[test]
    fn servers_and_choice() {
        let json = r#"{"html":"<div class=\"server-item\" data-type=\"sub\" data-id=\"501\" data-server-id=\"4\"><a>HD-1</a></div><div class=\"server-item\" data-type=\"dub\" data-id=\"502\" data-server-id=\"4\"><a>HD-1</a></div>"}"#;
        let servers = parse_servers(json).unwrap();
        assert_eq!(servers.len(), 2);
        assert_eq!(choose_server(&servers, Some("dub")).unwrap().id, "502");
        assert_eq!(choose_server(&servers, Some("raw")).unwrap().id, "501");
        assert_eq!(choose_server(&servers, None).unwrap().name, "HD-1");
    }

    #[test]
    fn sources_with_tracks() {
        let json = r#"{"type":"iframe","link":"https://megacloud.example/embed-2/e-1/AbC?k=1","server":4,
            "tracks":[{"file":"https://cc.example/eng.vtt","label":"English","kind":"captions"},
                      {"file":"https://cc.example/por.vtt","label":"Portuguese - Portuguese(Brazil)","kind":"captions"},
                      {"file":"https://cc.example/thumbs.vtt","kind":"thumbnails"}]}"#;
        let src = parse_sources(json).unwrap();
        assert_eq!(src.link.as_deref(), Some("https://megacloud.example/embed-2/e-1/AbC?k=1"));
        let langs: Vec<_> = src.subtitles.iter().map(|t| t.lang.as_str()).collect();
        assert_eq!(langs, vec!["en", "pt"]);

        let empty = parse_sources(r#"{"link":""}"#).unwrap();
        assert!(empty.link.is_none());
    }
}
