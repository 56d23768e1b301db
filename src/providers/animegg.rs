//! AnimeGG adapter: series page, per-audio embed tabs, `videoSources` ladder.
//!
//! Media files are hotlink-protected, so streams are always handed out
//! through the proxy.

use aniweave_common::{
    Error, ProviderEpisodeRef, ProviderId, ProviderRecord, Result, SeriesQuery, StreamDescriptor,
    StreamOptions,
};
use aniweave_extract::{animegg, normalize::parse_quality};
use async_trait::async_trait;

use super::{
    anchor_not_found, configured_profile, require_remote_id, Expect, ProviderAdapter,
    ProviderHttp, RequestProfile,
};
use crate::config::Config;

const PROVIDER: ProviderId = ProviderId::AnimeGG;

pub struct AnimeGgAdapter {
    http: ProviderHttp,
}

impl AnimeGgAdapter {
    pub fn new(config: &Config) -> Result<Self> {
        let profile = configured_profile(config, PROVIDER).with_proxy_media();
        Ok(Self {
            http: ProviderHttp::new(PROVIDER, profile)?,
        })
    }

    fn series_path(id: &str) -> String {
        let id = id.trim();
        if id.starts_with("http") || id.starts_with("/series/") {
            id.to_string()
        } else {
            format!("/series/{}", id.trim_start_matches('/'))
        }
    }
}

#[async_trait]
impl ProviderAdapter for AnimeGgAdapter {
    fn id(&self) -> ProviderId {
        PROVIDER
    }

    fn profile(&self) -> &RequestProfile {
        self.http.profile()
    }

    async fn fetch_record(&self, query: &SeriesQuery) -> Result<ProviderRecord> {
        let url = self.http.url(&Self::series_path(&query.id));
        let body = self.http.get_text(&url, Expect::Html).await?;
        animegg::extract(&body, &url).map_err(anchor_not_found)
    }

    async fn resolve_stream(
        &self,
        episode: &ProviderEpisodeRef,
        options: &StreamOptions,
    ) -> Result<StreamDescriptor> {
        let episode_url = if episode.remote_url.is_empty() {
            self.http.url(require_remote_id(PROVIDER, episode)?)
        } else {
            self.http.url(&episode.remote_url)
        };

        let page = self.http.get_text(&episode_url, Expect::Html).await?;
        let tabs = animegg::episode_embeds(&page, &episode_url);
        let tab = animegg::choose_embed(&tabs, options.audio_track.as_deref())
            .ok_or(Error::NoValidSource { provider: PROVIDER })?;

        let embed = self.http.get_text(&tab.embed_url, Expect::Html).await?;
        let variants = animegg::video_sources(&embed, &tab.embed_url);
        let wanted = options.quality.as_deref().and_then(parse_quality);
        let chosen = wanted
            .and_then(|q| {
                variants
                    .iter()
                    .find(|v| parse_quality(&v.quality) == Some(q))
            })
            .or_else(|| variants.first())
            .ok_or(Error::NoValidSource { provider: PROVIDER })?;

        let mut stream = StreamDescriptor::from_media_url(chosen.url.clone());
        stream.variants = variants;
        Ok(stream)
    }
}
