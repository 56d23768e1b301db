//! AnimePahe adapter.
//!
//! A series is addressed by its anime session. Episodes are paged through the
//! release API and each one is addressed by the pair (anime session, episode
//! session); streams resolve through the kwik host to an HLS manifest.

use aniweave_common::{
    DeliveryMode, Error, ProviderEpisodeRef, ProviderId, ProviderRecord, Result, SeriesQuery,
    SourceRef, StreamDescriptor, StreamOptions,
};
use aniweave_extract::animepahe;
use async_trait::async_trait;
use tracing::{debug, warn};

use super::{
    anchor_not_found, configured_profile, require_extra, require_remote_id, Expect,
    ProviderAdapter, ProviderHttp, RequestProfile, MAX_LISTING_PAGES,
};
use crate::config::Config;

const PROVIDER: ProviderId = ProviderId::AnimePahe;

/// DDoS-Guard lets requests through once this cookie is present.
const DDG_COOKIE: (&str, &str) = ("cookie", "__ddg2_=aniweave");

pub struct AnimePaheAdapter {
    http: ProviderHttp,
}

impl AnimePaheAdapter {
    pub fn new(config: &Config) -> Result<Self> {
        let profile = configured_profile(config, PROVIDER);
        Ok(Self {
            http: ProviderHttp::new(PROVIDER, profile)?,
        })
    }

    fn anime_session(id: &str) -> &str {
        id.trim().trim_start_matches("/anime/").trim_matches('/')
    }

    async fn release_pages(&self, session: &str) -> Result<Vec<aniweave_common::RawEntry>> {
        let mut entries = Vec::new();
        let mut page = 1;
        loop {
            let url = self.http.url(&format!(
                "/api?m=release&id={}&sort=episode_asc&page={page}",
                urlencoding::encode(session)
            ));
            let body = self
                .http
                .get_text_with(&url, Expect::Json, &[DDG_COOKIE])
                .await?;
            let listing = animepahe::parse_release_page(&body, self.http.base_url(), session)?;
            let more = listing.has_more();
            entries.extend(listing.items);

            if !more {
                break;
            }
            if page >= MAX_LISTING_PAGES {
                warn!(provider = %PROVIDER, session, pages = page, "Release listing truncated at page cap");
                break;
            }
            page += 1;
        }
        Ok(entries)
    }
}

#[async_trait]
impl ProviderAdapter for AnimePaheAdapter {
    fn id(&self) -> ProviderId {
        PROVIDER
    }

    fn profile(&self) -> &RequestProfile {
        self.http.profile()
    }

    async fn fetch_record(&self, query: &SeriesQuery) -> Result<ProviderRecord> {
        let session = Self::anime_session(&query.id);
        if session.is_empty() {
            return Err(Error::validation("empty AnimePahe anime session"));
        }
        let url = self.http.url(&format!("/anime/{session}"));
        let body = self
            .http
            .get_text_with(&url, Expect::Html, &[DDG_COOKIE])
            .await?;
        let mut record = animepahe::extract(&body, &url).map_err(anchor_not_found)?;
        record.episodes_or_chapters = self.release_pages(session).await?;
        Ok(record)
    }

    async fn resolve_stream(
        &self,
        episode: &ProviderEpisodeRef,
        options: &StreamOptions,
    ) -> Result<StreamDescriptor> {
        let episode_session = require_remote_id(PROVIDER, episode)?;
        let anime_session = require_extra(PROVIDER, episode, "anime_session")?;

        let play_url = self
            .http
            .url(&format!("/play/{anime_session}/{episode_session}"));
        let play = self
            .http
            .get_text_with(&play_url, Expect::Html, &[DDG_COOKIE])
            .await?;
        let sources = animepahe::play_sources(&play);
        let source = animepahe::choose_source(
            &sources,
            options.quality.as_deref(),
            options.audio_track.as_deref(),
        )
        .ok_or(Error::NoValidSource { provider: PROVIDER })?;
        debug!(
            provider = %PROVIDER,
            resolution = %source.resolution,
            audio = %source.audio,
            "Selected kwik source"
        );

        let kwik = self.http.get_text(&source.src, Expect::Html).await?;
        let manifest = animepahe::kwik_manifest(&kwik)
            .ok_or(Error::NoValidSource { provider: PROVIDER })?;
        Ok(StreamDescriptor::new(DeliveryMode::HlsManifest, manifest))
    }

    fn source_ref(&self, query: &SeriesQuery) -> SourceRef {
        let session = Self::anime_session(&query.id);
        SourceRef {
            provider: PROVIDER,
            external_id: session.to_string(),
            canonical_url: self.http.url(&format!("/anime/{session}")),
            session_token: Some(session.to_string()),
        }
    }
}
