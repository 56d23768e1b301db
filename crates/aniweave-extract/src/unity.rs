//! Unity JSON API: `api/series/<id>` and per-quality stream probes.

use aniweave_common::{ParseError, ProviderId, ProviderRecord, RawEntry};
use serde::Deserialize;

use crate::normalize::{clean_title, collapse_whitespace, normalize_date};

const PROVIDER: ProviderId = ProviderId::Unity;

#[derive(Debug, Deserialize)]
struct SeriesEnvelope {
    series: Option<SeriesJson>,
}

#[derive(Debug, Deserialize)]
struct SeriesJson {
    title: Option<String>,
    poster: Option<String>,
    overview: Option<String>,
    #[serde(default)]
    genres: Vec<String>,
    #[serde(default)]
    episodes: Vec<EpisodeJson>,
}

#[derive(Debug, Deserialize)]
struct EpisodeJson {
    id: serde_json::Value,
    number: serde_json::Value,
    url: Option<String>,
    air_date: Option<String>,
}

fn scalar(v: &serde_json::Value) -> String {
    match v {
        serde_json::Value::String(s) => s.trim().to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        _ => String::new(),
    }
}

/// Extract a record from the series JSON. The `series` key is the root anchor.
pub fn extract(json: &str) -> Result<ProviderRecord, ParseError> {
    let envelope: SeriesEnvelope =
        serde_json::from_str(json).map_err(|_| ParseError::missing(PROVIDER, "series"))?;
    let series = envelope
        .series
        .ok_or_else(|| ParseError::missing(PROVIDER, "series"))?;

    let episodes = series
        .episodes
        .into_iter()
        .map(|ep| {
            let mut entry = RawEntry::new(
                scalar(&ep.number),
                scalar(&ep.id),
                ep.url.unwrap_or_default(),
            );
            entry.published_hint = ep.air_date.as_deref().and_then(normalize_date);
            entry
        })
        .collect();

    Ok(ProviderRecord {
        title: clean_title(series.title.as_deref().unwrap_or_default()),
        image_url: series.poster.unwrap_or_default(),
        description: collapse_whitespace(series.overview.as_deref().unwrap_or_default()),
        genres: series.genres,
        episodes_or_chapters: episodes,
        related: Vec::new(),
    })
}

#[derive(Debug, Deserialize)]
struct ProbeJson {
    #[serde(default)]
    available: bool,
    url: Option<String>,
}

/// Result of `api/episode/<id>/stream?res=<q>`: the media URL when that
/// resolution is confirmed available.
pub fn parse_stream_probe(json: &str) -> Result<Option<String>, ParseError> {
    let probe: ProbeJson =
        serde_json::from_str(json).map_err(|_| ParseError::missing(PROVIDER, "stream probe JSON"))?;
    Ok(probe
        .url
        .filter(|u| probe.available && u.starts_with("http")))
}
