//! Data model shared by extractors, adapters, the reconciler and the server.
//!
//! All types serialize in snake_case JSON, which is the shape returned by the
//! HTTP API.

use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::ids::ProviderId;

// ---------------------------------------------------------------------------
// Extractor output
// ---------------------------------------------------------------------------

/// One episode or chapter as listed by a provider, before reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEntry {
    /// The provider's own numbering, unparsed ("Episodio 01", "25", "12").
    pub ordinal_hint: String,
    /// Provider-specific id used for stream or page resolution.
    pub remote_id: String,
    /// Absolute URL of the episode/chapter page.
    pub remote_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_hint: Option<String>,
    /// Provider-specific secondary identifiers.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

impl RawEntry {
    pub fn new(
        ordinal_hint: impl Into<String>,
        remote_id: impl Into<String>,
        remote_url: impl Into<String>,
    ) -> Self {
        Self {
            ordinal_hint: ordinal_hint.into(),
            remote_id: remote_id.into(),
            remote_url: remote_url.into(),
            published_hint: None,
            extra: BTreeMap::new(),
        }
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

/// A related or similar title found next to the main record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedItem {
    pub title: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// Normalized output of every provider extractor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderRecord {
    pub title: String,
    pub image_url: String,
    pub description: String,
    pub genres: Vec<String>,
    pub episodes_or_chapters: Vec<RawEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related: Vec<RelatedItem>,
}

// ---------------------------------------------------------------------------
// Lookups
// ---------------------------------------------------------------------------

/// What to look up on a single provider.
///
/// `id` is whatever handle the provider understands: a site path for
/// AnimeWorld/AnimeSaturn/MangaWorld, a numeric-slug for AnimeUnity, an anime
/// session for AnimePahe, and so on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SeriesQuery {
    pub provider: ProviderId,
    pub id: String,
}

impl SeriesQuery {
    pub fn new(provider: ProviderId, id: impl Into<String>) -> Self {
        Self {
            provider,
            id: id.into(),
        }
    }
}

impl std::fmt::Display for SeriesQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.provider, self.id)
    }
}

/// One provider's handle on a series. Never mutated; replaced on re-lookup.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SourceRef {
    pub provider: ProviderId,
    pub external_id: String,
    pub canonical_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_token: Option<String>,
}

// ---------------------------------------------------------------------------
// Reconciled model
// ---------------------------------------------------------------------------

/// A single provider's reference to an episode/chapter inside a slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderEpisodeRef {
    pub available: bool,
    pub remote_id: String,
    pub remote_url: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

impl From<RawEntry> for ProviderEpisodeRef {
    fn from(entry: RawEntry) -> Self {
        let mut extra = entry.extra;
        if let Some(published) = entry.published_hint {
            extra.entry("published".to_string()).or_insert(published);
        }
        Self {
            available: !entry.remote_id.is_empty() || !entry.remote_url.is_empty(),
            remote_id: entry.remote_id,
            remote_url: entry.remote_url,
            extra,
        }
    }
}

/// The reconciled record for one canonical ordinal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeSlot {
    pub ordinal: u32,
    #[serde(rename = "providers")]
    pub per_provider: BTreeMap<ProviderId, ProviderEpisodeRef>,
}

/// Chapters reconcile exactly like episodes.
pub type ChapterSlot = EpisodeSlot;

impl EpisodeSlot {
    pub fn new(ordinal: u32) -> Self {
        Self {
            ordinal,
            per_provider: BTreeMap::new(),
        }
    }

    /// The provider's ref, if it is present and usable.
    pub fn available(&self, provider: ProviderId) -> Option<&ProviderEpisodeRef> {
        self.per_provider.get(&provider).filter(|r| r.available)
    }
}

/// Aggregate assembled per request; never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalSeries {
    pub title: String,
    pub ordinals: Vec<EpisodeSlot>,
    pub sources: Vec<SourceRef>,
}

// ---------------------------------------------------------------------------
// Streams
// ---------------------------------------------------------------------------

/// How a resolved stream must be played.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeliveryMode {
    DirectFile,
    HlsManifest,
    OpaqueEmbed,
}

/// One confirmed rung of a quality ladder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamVariant {
    pub quality: String,
    pub url: String,
}

/// A subtitle track for an embedded player, tagged with an ISO-639-1 code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtitleTrack {
    pub lang: String,
    pub url: String,
}

/// Caller-selected stream preferences.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamOptions {
    /// Preferred quality, e.g. `"1080"` or `"720p"`.
    pub quality: Option<String>,
    /// Preferred audio track, e.g. `"sub"`, `"dub"`, `"jpn"`.
    pub audio_track: Option<String>,
}

/// A playable stream. Produced per request and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamDescriptor {
    pub delivery_mode: DeliveryMode,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxied_url: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_secs",
        deserialize_with = "deserialize_secs"
    )]
    pub expires_hint: Option<Duration>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variants: Vec<StreamVariant>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subtitles: Vec<SubtitleTrack>,
}

impl StreamDescriptor {
    pub fn new(delivery_mode: DeliveryMode, url: impl Into<String>) -> Self {
        Self {
            delivery_mode,
            url: url.into(),
            proxied_url: None,
            expires_hint: None,
            variants: Vec::new(),
            subtitles: Vec::new(),
        }
    }

    /// Classify a media URL by its path: `.m3u8` is HLS, anything else a file.
    pub fn from_media_url(url: impl Into<String>) -> Self {
        let url = url.into();
        let path = url.split(&['?', '#'][..]).next().unwrap_or_default();
        let mode = if path.to_ascii_lowercase().ends_with(".m3u8") {
            DeliveryMode::HlsManifest
        } else {
            DeliveryMode::DirectFile
        };
        Self::new(mode, url)
    }

    /// The URL a client should actually load.
    pub fn playable_url(&self) -> &str {
        self.proxied_url.as_deref().unwrap_or(&self.url)
    }
}

fn serialize_secs<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
    match value {
        Some(d) => s.serialize_u64(d.as_secs()),
        None => s.serialize_none(),
    }
}

fn deserialize_secs<'de, D>(d: D) -> Result<Option<Duration>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<u64>::deserialize(d)?.map(Duration::from_secs))
}
