//! MangaWorld manga pages and chapter readers.

use aniweave_common::{ParseError, ProviderId, ProviderRecord, RawEntry};
use scraper::Html;

use crate::dom::{
    absolutize, attr, attr_any, dedup_nonempty, first_text, last_segment, require, select_all,
    select_first, text,
};
use crate::normalize::{clean_title, normalize_date, strip_ordinal_prefix};

const PROVIDER: ProviderId = ProviderId::MangaWorld;

/// Extract a record from a `/manga/<id>/<slug>` page.
pub fn extract(document: &str, base_url: &str) -> Result<ProviderRecord, ParseError> {
    let doc = Html::parse_document(document);
    let info = require(&doc, PROVIDER, "div.comic-info")?;
    let root = doc.root_element();

    let title = clean_title(&first_text(info, &["h1.name", "h1"]));
    let image_url = select_first(info, "div.thumb img")
        .map(|img| absolutize(base_url, &attr_any(img, &["data-src", "src"])))
        .unwrap_or_default();
    let description = first_text(root, &["#noidungm", "div.comic-description"]);
    let genres = dedup_nonempty(
        select_all(info, "a.badge[href*='genre=']")
            .into_iter()
            .map(text),
    );

    let mut chapters: Vec<RawEntry> = select_all(root, "div.chapter a.chap")
        .into_iter()
        .map(|a| {
            let href = attr(a, "href");
            let label = select_first(a, "span").map(text).unwrap_or_else(|| text(a));
            let mut entry = RawEntry::new(label.clone(), last_segment(&href), absolutize(base_url, &href));
            entry.published_hint = select_first(a, "i.chap-date")
                .map(text)
                .and_then(|d| normalize_date(&d));
            let name = strip_ordinal_prefix(&label);
            if !name.is_empty() && name != label {
                entry = entry.with_extra("label", name);
            }
            entry
        })
        .collect();
    // Listed newest first, sometimes split in volumes.
    chapters.reverse();

    Ok(ProviderRecord {
        title,
        image_url,
        description,
        genres,
        episodes_or_chapters: chapters,
        related: Vec::new(),
    })
}

/// Reader URL that renders every page at once.
pub fn list_style_url(chapter_url: &str) -> String {
    if chapter_url.contains("style=list") {
        chapter_url.to_string()
    } else if chapter_url.contains('?') {
        format!("{chapter_url}&style=list")
    } else {
        format!("{chapter_url}?style=list")
    }
}

/// Page image URLs from a list-style chapter reader.
pub fn chapter_pages(document: &str, base_url: &str) -> Result<Vec<String>, ParseError> {
    let doc = Html::parse_document(document);
    let reader = require(&doc, PROVIDER, "#page")?;
    Ok(select_all(reader, "img.page-image, img")
        .into_iter()
        .map(|img| absolutize(base_url, &attr_any(img, &["data-src", "src"])))
        .filter(|u| !u.is_empty())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<div class="comic-info">
        <div class="thumb"><img src="https://cdn.mangaworld.ac/mangas/chainsaw.jpg"></div>
        <div class="info"><h1 class="name bigger">Chainsaw Man</h1>
          <a class="badge badge-primary" href="https://www.mangaworld.ac/archive?genre=azione">Azione</a>
        </div></div>
      <div id="noidungm">Denji è un ragazzo...</div>
      <div class="chapters-wrapper">
        <div class="chapter"><a class="chap" href="https://www.mangaworld.ac/manga/1/chainsaw-man/read/bbb"><span class="d-inline-block">Capitolo 02</span><i class="chap-date">9 Gennaio 2019</i></a></div>
        <div class="chapter"><a class="chap" href="https://www.mangaworld.ac/manga/1/chainsaw-man/read/aaa"><span class="d-inline-block">Capitolo 01</span><i class="chap-date">2 Gennaio 2019</i></a></div>
      </div>"#;

    #[test]
    fn chapters_oldest_first() {
        let rec = extract(PAGE, "https://www.mangaworld.ac/manga/1/chainsaw-man").unwrap();
        assert_eq!(rec.title, "Chainsaw Man");
        assert_eq!(rec.genres, vec!["Azione"]);
        let ch = &rec.episodes_or_chapters[0];
        assert_eq!(ch.ordinal_hint, "Capitolo 01");
        assert_eq!(ch.remote_id, "aaa");
        assert_eq!(ch.published_hint.as_deref(), Some("2019-01-02"));
        assert_eq!(ch.extra.get("label").map(String::as_str), Some("01"));
    }

    #[test]
    fn reader_pages() {
        let reader = r#"<div id="page"><img class="page-image" src="https://cdn.example/1.png"><img class="page-image" data-src="https://cdn.example/2.png"></div>"#;
        let pages = chapter_pages(reader, "https://www.mangaworld.ac/").unwrap();
        assert_eq!(pages, vec!["https://cdn.example/1.png", "https://cdn.example/2.png"]);
        assert!(chapter_pages("<div></div>", "https://www.mangaworld.ac/").is_err());
        assert_eq!(list_style_url("https://x/read/a"), "https://x/read/a?style=list");
        assert_eq!(list_style_url("https://x/read/a?p=1"), "https://x/read/a?p=1&style=list");
    }
}
