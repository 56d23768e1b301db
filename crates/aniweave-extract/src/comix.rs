//! Comix JSON API: series, paged chapter listing and chapter images.

use aniweave_common::{ParseError, ProviderId, ProviderRecord, RawEntry};
use chrono::DateTime;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::normalize::{clean_title, collapse_whitespace};
use crate::Paged;

const PROVIDER: ProviderId = ProviderId::Comix;

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct SeriesJson {
    title: Option<String>,
    poster: Option<PosterJson>,
    synopsis: Option<String>,
    #[serde(default)]
    genres: Vec<GenreJson>,
}

#[derive(Debug, Deserialize)]
struct PosterJson {
    large: Option<String>,
    medium: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GenreJson {
    title: String,
}

#[derive(Debug, Deserialize)]
struct ChapterListJson {
    #[serde(default)]
    items: Vec<ChapterJson>,
    pagination: Option<PaginationJson>,
}

#[derive(Debug, Deserialize)]
struct ChapterJson {
    chapter_id: u64,
    number: serde_json::Value,
    name: Option<String>,
    created_at: Option<i64>,
    scanlation_group: Option<GroupJson>,
}

#[derive(Debug, Deserialize)]
struct GroupJson {
    name: String,
}

#[derive(Debug, Deserialize)]
struct PaginationJson {
    current_page: u32,
    last_page: u32,
}

#[derive(Debug, Deserialize)]
struct ChapterImagesJson {
    #[serde(default)]
    images: Vec<ImageJson>,
}

#[derive(Debug, Deserialize)]
struct ImageJson {
    url: String,
}

fn decode<T: DeserializeOwned>(json: &str, anchor: &str) -> Result<T, ParseError> {
    serde_json::from_str::<Envelope<T>>(json)
        .ok()
        .and_then(|e| e.result)
        .ok_or_else(|| ParseError::missing(PROVIDER, anchor))
}

/// Extract series metadata from `api/v2/manga/<hid>`. Chapters come from
/// [`parse_chapter_page`].
pub fn extract(json: &str) -> Result<ProviderRecord, ParseError> {
    let series: SeriesJson = decode(json, "result")?;
    Ok(ProviderRecord {
        title: clean_title(series.title.as_deref().unwrap_or_default()),
        image_url: series
            .poster
            .and_then(|p| p.large.or(p.medium))
            .unwrap_or_default(),
        description: collapse_whitespace(series.synopsis.as_deref().unwrap_or_default()),
        genres: series.genres.into_iter().map(|g| g.title).collect(),
        episodes_or_chapters: Vec::new(),
        related: Vec::new(),
    })
}

/// One page of `api/v2/manga/<hid>/chapters?page=N`.
///
/// `series_url` is the public title URL; chapter URLs are built under it.
pub fn parse_chapter_page(json: &str, series_url: &str) -> Result<Paged<RawEntry>, ParseError> {
    let list: ChapterListJson = decode(json, "result")?;
    let base = series_url.trim_end_matches('/');
    let items = list
        .items
        .into_iter()
        .map(|ch| {
            let number = match &ch.number {
                serde_json::Value::Number(n) => n.to_string(),
                serde_json::Value::String(s) => s.clone(),
                _ => String::new(),
            };
            let mut entry = RawEntry::new(
                number.clone(),
                ch.chapter_id.to_string(),
                format!("{base}/{}-chapter-{number}", ch.chapter_id),
            );
            entry.published_hint = ch
                .created_at
                .and_then(|ts| DateTime::from_timestamp(ts, 0))
                .map(|dt| dt.format("%Y-%m-%d").to_string());
            if let Some(name) = ch.name.filter(|n| !n.trim().is_empty()) {
                entry = entry.with_extra("title", collapse_whitespace(&name));
            }
            if let Some(group) = ch.scanlation_group {
                entry = entry.with_extra("group", group.name);
            }
            entry
        })
        .collect();
    let (current_page, last_page) = list
        .pagination
        .map(|p| (p.current_page, p.last_page))
        .unwrap_or((1, 1));
    Ok(Paged {
        items,
        current_page,
        last_page,
    })
}

/// Page image URLs from `api/v2/chapters/<id>`.
pub fn chapter_pages(json: &str) -> Result<Vec<String>, ParseError> {
    let chapter: ChapterImagesJson = decode(json, "result")?;
    Ok(chapter
        .images
        .into_iter()
        .map(|i| i.url)
        .filter(|u| !u.is_empty())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn series_metadata() {
        let json = r#"{"status":200,"result":{"hash_id":"x1","title":"Kagurabachi",
            "poster":{"medium":"https://static.comix.to/m.jpg","large":"https://static.comix.to/l.jpg"},
            "synopsis":"Chihiro...","genres":[{"title":"Action"},{"title":"Supernatural"}]}}"#;
        let rec = extract(json).unwrap();
        assert_eq!(rec.title, "Kagurabachi");
        assert_eq!(rec.image_url, "https://static.comix.to/l.jpg");
        assert_eq!(rec.genres, vec!["Action", "Supernatural"]);
        assert!(extract(r#"{"status":404}"#).is_err());
    }

    #[test]
    fn chapter_page_with_pagination() {
        let json = r#"{"result":{"items":[
            {"chapter_id":501,"number":1,"name":"","created_at":1695340800,"scanlation_group":{"name":"TCB"}},
            {"chapter_id":502,"number":2.5,"name":" Extra ","created_at":null}],
            "pagination":{"current_page":1,"last_page":4}}}"#;
        let page = parse_chapter_page(json, "https://comix.to/title/x1-kagurabachi/").unwrap();
        assert_eq!(page.last_page, 4);
        let first = &page.items[0];
        assert_eq!(first.remote_url, "https://comix.to/title/x1-kagurabachi/501-chapter-1");
        assert_eq!(first.published_hint.as_deref(), Some("2023-09-22"));
        assert_eq!(first.extra.get("group").map(String::as_str), Some("TCB"));
        assert!(first.extra.get("title").is_none());
        assert_eq!(page.items[1].ordinal_hint, "2.5");
        assert_eq!(page.items[1].extra.get("title").map(String::as_str), Some("Extra"));
    }

    #[test]
    fn chapter_images() {
        let json = r#"{"result":{"images":[{"url":"https://img.comix.to/1.webp"},{"url":""}]}}"#;
        assert_eq!(chapter_pages(json).unwrap(), vec!["https://img.comix.to/1.webp"]);
    }
}
