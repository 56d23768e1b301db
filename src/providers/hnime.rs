//! HiAnime ("HNime") adapter.
//!
//! Streams are never exposed as media URLs: the adapter resolves the chosen
//! server's source link and wraps it, with its subtitle tracks, into an
//! embed URL on the configured player host.

use aniweave_common::{
    DeliveryMode, Error, ProviderEpisodeRef, ProviderId, ProviderRecord, Result, SeriesQuery,
    StreamDescriptor, StreamOptions, SubtitleTrack,
};
use aniweave_extract::hnime;
use async_trait::async_trait;
use url::Url;

use super::{
    anchor_not_found, configured_profile, require_remote_id, Expect, ProviderAdapter,
    ProviderHttp, RequestProfile,
};
use crate::config::Config;

const PROVIDER: ProviderId = ProviderId::HNime;
const XHR: (&str, &str) = ("x-requested-with", "XMLHttpRequest");

pub struct HNimeAdapter {
    http: ProviderHttp,
    embed_host: String,
}

impl HNimeAdapter {
    pub fn new(config: &Config) -> Result<Self> {
        let profile = configured_profile(config, PROVIDER);
        Ok(Self {
            http: ProviderHttp::new(PROVIDER, profile)?,
            embed_host: config.embed.host.trim_end_matches('/').to_string(),
        })
    }

    /// The numeric id closing a `frieren-beyond-journeys-end-18542` slug.
    fn slug_id(slug: &str) -> Option<&str> {
        let tail = slug.trim_end_matches('/').rsplit('-').next()?;
        (!tail.is_empty() && tail.bytes().all(|b| b.is_ascii_digit())).then_some(tail)
    }
}

/// Embed URL carrying the source link, the stream kind and one `sub_<lang>`
/// parameter per subtitle track.
pub fn embed_url(
    host: &str,
    episode_id: &str,
    kind: &str,
    link: &str,
    subtitles: &[SubtitleTrack],
) -> Result<String> {
    let mut url = Url::parse(&format!("{}/{episode_id}/{kind}", host.trim_end_matches('/')))
        .map_err(|e| Error::Internal(format!("invalid embed host {host}: {e}")))?;
    {
        let mut pairs = url.query_pairs_mut();
        pairs.append_pair("src", link);
        for track in subtitles {
            pairs.append_pair(&format!("sub_{}", track.lang), &track.url);
        }
    }
    Ok(url.to_string())
}

#[async_trait]
impl ProviderAdapter for HNimeAdapter {
    fn id(&self) -> ProviderId {
        PROVIDER
    }

    fn profile(&self) -> &RequestProfile {
        self.http.profile()
    }

    async fn fetch_record(&self, query: &SeriesQuery) -> Result<ProviderRecord> {
        let url = self.http.url(&query.id);
        let body = self.http.get_text(&url, Expect::Html).await?;
        let mut record = hnime::extract(&body, &url).map_err(anchor_not_found)?;

        let anime_id = hnime::anime_id(&body)
            .or_else(|| Self::slug_id(&query.id).map(str::to_string))
            .ok_or_else(|| Error::not_found(PROVIDER, "anime id"))?;
        let list_url = self.http.url(&format!("/ajax/v2/episode/list/{anime_id}"));
        let list = self
            .http
            .get_text_with(&list_url, Expect::Json, &[XHR])
            .await?;
        record.episodes_or_chapters = hnime::parse_episode_list(&list, self.http.base_url())?;
        Ok(record)
    }

    async fn resolve_stream(
        &self,
        episode: &ProviderEpisodeRef,
        options: &StreamOptions,
    ) -> Result<StreamDescriptor> {
        let episode_id = require_remote_id(PROVIDER, episode)?;

        let servers_url = self.http.url(&format!(
            "/ajax/v2/episode/servers?episodeId={}",
            urlencoding::encode(episode_id)
        ));
        let servers = self
            .http
            .get_text_with(&servers_url, Expect::Json, &[XHR])
            .await?;
        let servers = hnime::parse_servers(&servers)?;
        let server = hnime::choose_server(&servers, options.audio_track.as_deref())
            .ok_or(Error::NoValidSource { provider: PROVIDER })?;

        let sources_url = self.http.url(&format!(
            "/ajax/v2/episode/sources?id={}",
            urlencoding::encode(&server.id)
        ));
        let sources = self
            .http
            .get_text_with(&sources_url, Expect::Json, &[XHR])
            .await?;
        let sources = hnime::parse_sources(&sources)?;
        let link = sources
            .link
            .ok_or(Error::NoValidSource { provider: PROVIDER })?;

        let url = embed_url(
            &self.embed_host,
            episode_id,
            &server.kind,
            &link,
            &sources.subtitles,
        )?;
        let mut stream = StreamDescriptor::new(DeliveryMode::OpaqueEmbed, url);
        stream.subtitles = sources.subtitles;
        Ok(stream)
    }
}
