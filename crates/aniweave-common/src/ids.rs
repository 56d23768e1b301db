//! Upstream provider identifiers.
//!
//! [`ProviderId`] is the closed set of third-party sources aniweave knows how
//! to talk to. Each id carries three spellings: the lowercase wire name used
//! in JSON responses, the short query key used by the HTTP API (`AW`, `AS`,
//! ...), and a human-readable display name.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Whether a provider serves episodes (anime) or chapters (manga).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Anime,
    Manga,
}

/// A known upstream source.
///
/// Ordering follows declaration order and is used wherever a deterministic
/// provider order is required (reconciliation, response maps).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    AnimeWorld,
    AnimeSaturn,
    AnimeUnity,
    AnimePahe,
    HNime,
    Unity,
    AnimeGG,
    MangaWorld,
    Comix,
}

impl ProviderId {
    /// Every provider, in declaration order.
    pub const ALL: [ProviderId; 9] = [
        ProviderId::AnimeWorld,
        ProviderId::AnimeSaturn,
        ProviderId::AnimeUnity,
        ProviderId::AnimePahe,
        ProviderId::HNime,
        ProviderId::Unity,
        ProviderId::AnimeGG,
        ProviderId::MangaWorld,
        ProviderId::Comix,
    ];

    /// Lowercase wire name (matches the serde representation).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AnimeWorld => "animeworld",
            Self::AnimeSaturn => "animesaturn",
            Self::AnimeUnity => "animeunity",
            Self::AnimePahe => "animepahe",
            Self::HNime => "hnime",
            Self::Unity => "unity",
            Self::AnimeGG => "animegg",
            Self::MangaWorld => "mangaworld",
            Self::Comix => "comix",
        }
    }

    /// Short key used in HTTP query strings.
    pub fn query_key(self) -> &'static str {
        match self {
            Self::AnimeWorld => "AW",
            Self::AnimeSaturn => "AS",
            Self::AnimeUnity => "AU",
            Self::AnimePahe => "AP",
            Self::HNime => "HI",
            Self::Unity => "UN",
            Self::AnimeGG => "AG",
            Self::MangaWorld => "MW",
            Self::Comix => "CX",
        }
    }

    /// Look up a provider by its query key (case-sensitive, as sent by clients).
    pub fn from_query_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.query_key() == key)
    }

    pub fn kind(self) -> MediaKind {
        match self {
            Self::MangaWorld | Self::Comix => MediaKind::Manga,
            _ => MediaKind::Anime,
        }
    }

    /// Upstream origin used when the configuration does not override it.
    pub fn default_base_url(self) -> &'static str {
        match self {
            Self::AnimeWorld => "https://www.animeworld.ac",
            Self::AnimeSaturn => "https://www.animesaturn.cx",
            Self::AnimeUnity => "https://www.animeunity.so",
            Self::AnimePahe => "https://animepahe.ru",
            Self::HNime => "https://hianime.to",
            Self::Unity => "https://api.unity-stream.net",
            Self::AnimeGG => "https://www.animegg.org",
            Self::MangaWorld => "https://www.mangaworld.ac",
            Self::Comix => "https://comix.to",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::AnimeWorld => "AnimeWorld",
            Self::AnimeSaturn => "AnimeSaturn",
            Self::AnimeUnity => "AnimeUnity",
            Self::AnimePahe => "AnimePahe",
            Self::HNime => "HiAnime",
            Self::Unity => "Unity",
            Self::AnimeGG => "AnimeGG",
            Self::MangaWorld => "MangaWorld",
            Self::Comix => "Comix",
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string names no known provider.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown provider: {0}")]
pub struct UnknownProvider(pub String);

impl FromStr for ProviderId {
    type Err = UnknownProvider;

    /// Accepts the wire name (any case) or the query key.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(p) = Self::from_query_key(s) {
            return Ok(p);
        }
        let lower = s.to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == lower)
            .ok_or_else(|| UnknownProvider(s.to_string()))
    }
}
