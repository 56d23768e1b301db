//! Provider adapters: fetch semantics around the pure extractors.
//!
//! Every upstream site gets one [`ProviderAdapter`]. Adapters own a
//! [`ProviderHttp`] client configured from their [`RequestProfile`] (headers,
//! timeout, redirect mode, rate limit) and never retry; retries across
//! providers are the fallback orchestrator's job.

pub mod animegg;
pub mod animepahe;
pub mod animesaturn;
pub mod animeunity;
pub mod animeworld;
pub mod comix;
pub mod hnime;
mod http;
pub mod mangaworld;
pub mod registry;
pub mod unity;

pub use http::{Expect, ProviderHttp};
pub use registry::ProviderRegistry;

use std::time::Duration;

use aniweave_common::{
    Error, ParseError, ProviderEpisodeRef, ProviderId, ProviderRecord, Result, SeriesQuery,
    SourceRef, StreamDescriptor, StreamOptions,
};
use async_trait::async_trait;

use crate::config::Config;

/// Browser user agent sent when a provider has no override.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/126.0 Safari/537.36";

/// Upper bound on followed listing pages for paged upstreams.
pub const MAX_LISTING_PAGES: u32 = 30;

/// Whether redirects are followed by the client or surfaced to the adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectMode {
    Follow,
    Manual,
}

/// Per-adapter request settings.
#[derive(Debug, Clone)]
pub struct RequestProfile {
    pub base_url: String,
    pub user_agent: String,
    pub referer: Option<String>,
    pub origin: Option<String>,
    pub timeout: Duration,
    pub redirect: RedirectMode,
    pub rate_limit_per_sec: u32,
    /// Direct files from this provider need the proxy (hotlink protection).
    pub proxy_media: bool,
}

impl RequestProfile {
    /// Profile sending the provider's own site as referer and origin.
    pub fn same_site(base_url: impl Into<String>, timeout: Duration) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            referer: Some(format!("{base_url}/")),
            origin: Some(base_url.clone()),
            base_url,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout,
            redirect: RedirectMode::Follow,
            rate_limit_per_sec: 5,
            proxy_media: false,
        }
    }

    pub fn with_redirect(mut self, redirect: RedirectMode) -> Self {
        self.redirect = redirect;
        self
    }

    pub fn with_proxy_media(mut self) -> Self {
        self.proxy_media = true;
        self
    }
}

/// Profile for a provider from its `[providers.<name>]` table.
pub(crate) fn configured_profile(config: &Config, id: ProviderId) -> RequestProfile {
    let settings = config.provider(id);
    let mut profile = RequestProfile::same_site(config.provider_base_url(id), settings.timeout());
    profile.rate_limit_per_sec = settings.rate_limit_per_sec;
    if let Some(user_agent) = settings.user_agent {
        profile.user_agent = user_agent;
    }
    profile
}

/// One upstream site.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    fn id(&self) -> ProviderId;

    fn profile(&self) -> &RequestProfile;

    /// Fetch and extract a series record, following paged listings.
    async fn fetch_record(&self, query: &SeriesQuery) -> Result<ProviderRecord>;

    /// Resolve a playable stream for one episode reference.
    async fn resolve_stream(
        &self,
        _episode: &ProviderEpisodeRef,
        _options: &StreamOptions,
    ) -> Result<StreamDescriptor> {
        Err(Error::unavailable(self.id(), "streams are not served"))
    }

    /// Page image URLs for one chapter.
    async fn chapter_pages(&self, _chapter: &ProviderEpisodeRef) -> Result<Vec<String>> {
        Err(Error::unavailable(self.id(), "chapter pages are not served"))
    }

    /// The handle recorded for a successful lookup.
    fn source_ref(&self, query: &SeriesQuery) -> SourceRef {
        SourceRef {
            provider: self.id(),
            external_id: query.id.clone(),
            canonical_url: site_url(&self.profile().base_url, &query.id),
            session_token: None,
        }
    }
}

/// Resolve a handle that is either an absolute URL or a site path.
pub fn site_url(base_url: &str, handle: &str) -> String {
    let handle = handle.trim();
    if handle.starts_with("http://") || handle.starts_with("https://") {
        handle.to_string()
    } else {
        format!(
            "{}/{}",
            base_url.trim_end_matches('/'),
            handle.trim_start_matches('/')
        )
    }
}

/// A missing root anchor on a series page means the series is not there.
pub(crate) fn anchor_not_found(err: ParseError) -> Error {
    Error::not_found(err.provider, format!("{} not found", err.anchor))
}

/// Required secondary id of an episode ref, or `ProviderUnavailable`.
pub(crate) fn require_extra<'a>(
    provider: ProviderId,
    episode: &'a ProviderEpisodeRef,
    key: &str,
) -> Result<&'a str> {
    episode
        .extra
        .get(key)
        .map(String::as_str)
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| Error::unavailable(provider, format!("missing {key}")))
}

/// Remote id of an episode ref, or `ProviderUnavailable`.
pub(crate) fn require_remote_id(
    provider: ProviderId,
    episode: &ProviderEpisodeRef,
) -> Result<&str> {
    let id = episode.remote_id.trim();
    if !episode.available || id.is_empty() {
        return Err(Error::unavailable(provider, "no episode reference"));
    }
    Ok(id)
}

/// Configuration pointing one provider at a mock upstream.
#[cfg(test)]
pub(crate) fn test_config(id: ProviderId, base_url: &str) -> Config {
    let mut config = Config::default();
    config.providers.insert(
        id,
        crate::config::ProviderConfig {
            base_url: Some(base_url.to_string()),
            timeout_secs: 5,
            rate_limit_per_sec: 100,
            ..Default::default()
        },
    );
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use aniweave_common::RawEntry;
    use assert_matches::assert_matches;

    #[test]
    fn site_url_joins_paths() {
        assert_eq!(
            site_url("https://www.animeworld.ac/", "/play/naruto.abc"),
            "https://www.animeworld.ac/play/naruto.abc"
        );
        assert_eq!(
            site_url("https://www.animeworld.ac", "play/naruto.abc"),
            "https://www.animeworld.ac/play/naruto.abc"
        );
        assert_eq!(
            site_url("https://www.animeworld.ac", "https://mirror.example/play/x"),
            "https://mirror.example/play/x"
        );
    }

    #[test]
    fn anchor_becomes_not_found() {
        let err = anchor_not_found(ParseError::missing(ProviderId::AnimeGG, "div.media"));
        assert_matches!(err, Error::NotFound { ref origin, .. } if origin == "animegg");
        assert_eq!(err.http_status(), 404);
    }

    #[test]
    fn paired_ids_are_required() {
        let ep = ProviderEpisodeRef::from(RawEntry::new("1", "sess", ""));
        let err = require_extra(ProviderId::AnimePahe, &ep, "anime_session").unwrap_err();
        assert_matches!(err, Error::ProviderUnavailable { .. });
        assert_eq!(require_remote_id(ProviderId::AnimePahe, &ep).unwrap(), "sess");

        let empty = ProviderEpisodeRef::from(RawEntry::new("1", "", ""));
        assert!(require_remote_id(ProviderId::AnimePahe, &empty).is_err());
    }
}
