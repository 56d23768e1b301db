//! Aniweave-Extract: pure parsers for upstream provider documents.
//!
//! Every function in this crate is a pure function of its input text: no I/O,
//! no clocks, no global state. Series-page extractors share one contract:
//!
//! - missing optional fields come back as empty strings/lists;
//! - a [`ParseError`] is returned only when the page's root anchor (the
//!   container element or JSON key every valid page has) is absent;
//! - `ordinal_hint` is the provider's raw numbering, normalized later.
//!
//! Provider modules also expose the secondary parsers the stream resolver
//! needs (episode-info JSON, embed pages, quality buttons, packed scripts).
//!
//! # Example
//!
//! ```
//! use aniweave_common::ProviderId;
//! use aniweave_extract::extract_record;
//!
//! let html = r#"<div class="widget player"><div class="server" data-name="9">
//!   <li class="episode"><a data-id="a1" data-num="1" href="/play/x.1/a1">1</a></li>
//! </div></div>"#;
//! let record = extract_record(ProviderId::AnimeWorld, html, "https://www.animeworld.ac").unwrap();
//! assert_eq!(record.episodes_or_chapters[0].remote_id, "a1");
//! ```

pub mod animegg;
pub mod animepahe;
pub mod animesaturn;
pub mod animeunity;
pub mod animeworld;
pub mod comix;
mod dom;
pub mod hnime;
pub mod mangaworld;
pub mod normalize;
pub mod unity;
pub mod unpack;

use aniweave_common::{ParseError, ProviderId, ProviderRecord};

/// One page of a paginated upstream listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paged<T> {
    pub items: Vec<T>,
    pub current_page: u32,
    pub last_page: u32,
}

impl<T> Paged<T> {
    pub fn has_more(&self) -> bool {
        self.current_page < self.last_page
    }
}

/// Extract a series record from a provider's primary document.
///
/// HTML providers take their series page; Unity and Comix take their series
/// JSON. `base_url` resolves relative links.
pub fn extract_record(
    provider: ProviderId,
    document: &str,
    base_url: &str,
) -> Result<ProviderRecord, ParseError> {
    match provider {
        ProviderId::AnimeWorld => animeworld::extract(document, base_url),
        ProviderId::AnimeSaturn => animesaturn::extract(document, base_url),
        ProviderId::AnimeUnity => animeunity::extract(document, base_url),
        ProviderId::AnimePahe => animepahe::extract(document, base_url),
        ProviderId::HNime => hnime::extract(document, base_url),
        ProviderId::Unity => unity::extract(document),
        ProviderId::AnimeGG => animegg::extract(document, base_url),
        ProviderId::MangaWorld => mangaworld::extract(document, base_url),
        ProviderId::Comix => comix::extract(document),
    }
}
