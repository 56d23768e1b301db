//! Translate API query strings into provider lookups.

use std::collections::HashMap;

use aniweave_common::{
    EpisodeSlot, Error, ProviderEpisodeRef, ProviderId, Result, SeriesQuery,
};
use url::Url;

use crate::config::Config;

/// Query key carrying AnimePahe's anime session next to an episode session.
pub const ANIMEPAHE_ANIME_KEY: &str = "AP_ANIME";

/// Providers accepted by `/api/episodes` and `/api/stream`, in lookup order.
pub const EPISODE_PROVIDERS: [ProviderId; 7] = [
    ProviderId::AnimeWorld,
    ProviderId::AnimeSaturn,
    ProviderId::AnimeUnity,
    ProviderId::AnimePahe,
    ProviderId::AnimeGG,
    ProviderId::HNime,
    ProviderId::Unity,
];

pub const CHAPTER_PROVIDERS: [ProviderId; 2] = [ProviderId::MangaWorld, ProviderId::Comix];

/// Work out which provider a `path` parameter belongs to.
///
/// Absolute URLs are matched by host against the configured provider origins;
/// site paths by their leading segment.
pub fn classify_path(config: &Config, raw: &str) -> Result<SeriesQuery> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(Error::validation("path is empty"));
    }

    if raw.starts_with("http://") || raw.starts_with("https://") {
        let url = Url::parse(raw).map_err(|e| Error::validation(format!("invalid path URL: {e}")))?;
        let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
        let provider = provider_for_host(config, &host)
            .ok_or_else(|| Error::validation(format!("no provider serves {host}")))?;
        let mut handle = url.path().to_string();
        if let Some(query) = url.query() {
            handle.push('?');
            handle.push_str(query);
        }
        return Ok(SeriesQuery::new(provider, handle));
    }

    let path = format!("/{}", raw.trim_start_matches('/'));
    let provider = if path.starts_with("/play/") {
        ProviderId::AnimeWorld
    } else if let Some(rest) = path.strip_prefix("/anime/") {
        if is_numbered_slug(rest) {
            ProviderId::AnimeUnity
        } else {
            ProviderId::AnimeSaturn
        }
    } else if path.starts_with("/manga/") {
        ProviderId::MangaWorld
    } else if path.starts_with("/series/") {
        ProviderId::AnimeGG
    } else if path.starts_with("/title/") {
        ProviderId::Comix
    } else {
        return Err(Error::validation(format!("unrecognized path: {raw}")));
    };
    Ok(SeriesQuery::new(provider, path))
}

/// AnimeUnity titles are `<numeric id>-<slug>`.
fn is_numbered_slug(segment: &str) -> bool {
    let segment = segment.split('/').next().unwrap_or_default();
    let digits = segment.bytes().take_while(u8::is_ascii_digit).count();
    digits > 0 && (digits == segment.len() || segment.as_bytes()[digits] == b'-')
}

fn provider_for_host(config: &Config, host: &str) -> Option<ProviderId> {
    let host = host.trim_start_matches("www.");
    ProviderId::ALL.into_iter().find(|id| {
        let Ok(base) = Url::parse(&config.provider_base_url(*id)) else {
            return false;
        };
        let Some(base_host) = base.host_str() else {
            return false;
        };
        let base_host = base_host.to_ascii_lowercase();
        let base_host = base_host.trim_start_matches("www.");
        host == base_host || host.ends_with(&format!(".{base_host}"))
    })
}

/// One query per provider key present (and non-empty) in `params`.
pub fn keyed_queries(params: &HashMap<String, String>, providers: &[ProviderId]) -> Vec<SeriesQuery> {
    providers
        .iter()
        .filter_map(|provider| {
            params
                .get(provider.query_key())
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(|v| SeriesQuery::new(*provider, v))
        })
        .collect()
}

/// A single-provider slot built from a handle passed on the query string.
///
/// Handles that look like paths or URLs double as the episode page URL.
pub fn direct_slot(
    provider: ProviderId,
    handle: &str,
    ordinal: u32,
    params: &HashMap<String, String>,
) -> EpisodeSlot {
    let handle = handle.trim();
    let is_location = handle.starts_with('/') || handle.starts_with("http");
    let mut episode = ProviderEpisodeRef {
        available: !handle.is_empty(),
        remote_id: handle.to_string(),
        remote_url: if is_location { handle.to_string() } else { String::new() },
        extra: Default::default(),
    };
    if provider == ProviderId::AnimePahe {
        if let Some(anime) = params.get(ANIMEPAHE_ANIME_KEY).filter(|v| !v.trim().is_empty()) {
            episode
                .extra
                .insert("anime_session".to_string(), anime.trim().to_string());
        }
    }

    let mut slot = EpisodeSlot::new(ordinal);
    slot.per_provider.insert(provider, episode);
    slot
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn classifies_site_paths() {
        let config = Config::default();
        let cases = [
            ("/play/frieren.AbCd1", ProviderId::AnimeWorld),
            ("anime/55-long-show", ProviderId::AnimeUnity),
            ("/anime/Sousou-no-Frieren", ProviderId::AnimeSaturn),
            ("/manga/2467/chainsaw-man", ProviderId::MangaWorld),
            ("/series/mob-psycho-100", ProviderId::AnimeGG),
            ("/title/x1-kagurabachi", ProviderId::Comix),
        ];
        for (raw, expected) in cases {
            assert_eq!(classify_path(&config, raw).unwrap().provider, expected, "{raw}");
        }
        assert_matches!(classify_path(&config, "/watch/x"), Err(Error::Validation(_)));
        assert_matches!(classify_path(&config, "  "), Err(Error::Validation(_)));
    }

    #[test]
    fn classifies_urls_by_host() {
        let config = Config::default();
        let q = classify_path(&config, "https://www.animesaturn.cx/anime/Dandadan?x=1").unwrap();
        assert_eq!(q.provider, ProviderId::AnimeSaturn);
        assert_eq!(q.id, "/anime/Dandadan?x=1");

        let q = classify_path(&config, "https://animeworld.ac/play/x.1").unwrap();
        assert_eq!(q.provider, ProviderId::AnimeWorld);

        assert_matches!(
            classify_path(&config, "https://example.org/play/x"),
            Err(Error::Validation(_))
        );
    }

    #[test]
    fn keyed_queries_follow_provider_order() {
        let p = params(&[("UN", "42"), ("AW", "/play/x.1"), ("AS", " "), ("MW", "/manga/1")]);
        let queries = keyed_queries(&p, &EPISODE_PROVIDERS);
        let providers: Vec<_> = queries.iter().map(|q| q.provider).collect();
        assert_eq!(providers, vec![ProviderId::AnimeWorld, ProviderId::Unity]);
    }

    #[test]
    fn direct_slot_pairs_animepahe_sessions() {
        let p = params(&[("AP", "ep-sess"), ("AP_ANIME", "anime-sess")]);
        let slot = direct_slot(ProviderId::AnimePahe, "ep-sess", 3, &p);
        let ep = slot.available(ProviderId::AnimePahe).unwrap();
        assert_eq!(ep.remote_id, "ep-sess");
        assert!(ep.remote_url.is_empty());
        assert_eq!(ep.extra.get("anime_session").map(String::as_str), Some("anime-sess"));

        let slot = direct_slot(ProviderId::AnimeSaturn, "/ep/Dandadan-ep-1", 1, &p);
        let ep = slot.available(ProviderId::AnimeSaturn).unwrap();
        assert_eq!(ep.remote_url, "/ep/Dandadan-ep-1");
        assert!(ep.extra.is_empty());
    }
}
