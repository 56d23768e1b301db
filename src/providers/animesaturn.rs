//! AnimeSaturn adapter: series page, episode page, watch page.

use aniweave_common::{
    Error, ProviderEpisodeRef, ProviderId, ProviderRecord, Result, SeriesQuery, StreamDescriptor,
    StreamOptions,
};
use aniweave_extract::animesaturn;
use async_trait::async_trait;
use tracing::debug;

use super::{
    anchor_not_found, configured_profile, require_remote_id, Expect, ProviderAdapter,
    ProviderHttp, RequestProfile,
};
use crate::config::Config;

const PROVIDER: ProviderId = ProviderId::AnimeSaturn;

pub struct AnimeSaturnAdapter {
    http: ProviderHttp,
}

impl AnimeSaturnAdapter {
    pub fn new(config: &Config) -> Result<Self> {
        let profile = configured_profile(config, PROVIDER);
        Ok(Self {
            http: ProviderHttp::new(PROVIDER, profile)?,
        })
    }

    fn episode_url(&self, episode: &ProviderEpisodeRef) -> Result<String> {
        if !episode.remote_url.is_empty() {
            return Ok(self.http.url(&episode.remote_url));
        }
        let id = require_remote_id(PROVIDER, episode)?;
        Ok(self.http.url(&format!("/ep/{id}")))
    }
}

#[async_trait]
impl ProviderAdapter for AnimeSaturnAdapter {
    fn id(&self) -> ProviderId {
        PROVIDER
    }

    fn profile(&self) -> &RequestProfile {
        self.http.profile()
    }

    async fn fetch_record(&self, query: &SeriesQuery) -> Result<ProviderRecord> {
        let url = self.http.url(&query.id);
        let body = self.http.get_text(&url, Expect::Html).await?;
        animesaturn::extract(&body, &url).map_err(anchor_not_found)
    }

    async fn resolve_stream(
        &self,
        episode: &ProviderEpisodeRef,
        _options: &StreamOptions,
    ) -> Result<StreamDescriptor> {
        let episode_url = self.episode_url(episode)?;
        let page = self.http.get_text(&episode_url, Expect::Html).await?;
        let watch_url = animesaturn::watch_link(&page, &episode_url)
            .ok_or(Error::NoValidSource { provider: PROVIDER })?;

        let watch = self.http.get_text(&watch_url, Expect::Html).await?;
        if let Some(media) = animesaturn::media_source(&watch, &watch_url) {
            return Ok(StreamDescriptor::from_media_url(media));
        }

        // The alternative player hosts the same file on a second server.
        let alt_url = format!("{watch_url}&s=alt");
        debug!(provider = %PROVIDER, url = %alt_url, "Primary player empty, trying alternative");
        let alt = self.http.get_text(&alt_url, Expect::Html).await?;
        animesaturn::media_source(&alt, &alt_url)
            .map(StreamDescriptor::from_media_url)
            .ok_or(Error::NoValidSource { provider: PROVIDER })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::test_config;
    use aniweave_common::{DeliveryMode, RawEntry};
    use assert_matches::assert_matches;
    use wiremock::matchers::{path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn follows_watch_page_to_alternative_player() {
        let server = MockServer::start().await;
        let uri = server.uri();
        Mock::given(path("/ep/Dandadan-ep-1"))
            .respond_with(ResponseTemplate::new(200).set_body_string(format!(
                r#"<a href="{uri}/watch?file=AbC"><div class="btn">Guarda lo streaming</div></a>"#
            )))
            .mount(&server)
            .await;
        Mock::given(path("/watch"))
            .and(query_param("s", "alt"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<script>jwplayer("player").setup({ file: "https://cdn.example/dandadan/ep1/playlist.m3u8", type: "hls" });</script>"#,
            ))
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(path("/watch"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<div>no player</div>"))
            .with_priority(2)
            .mount(&server)
            .await;

        let adapter = AnimeSaturnAdapter::new(&test_config(PROVIDER, &uri)).unwrap();
        let ep = ProviderEpisodeRef::from(RawEntry::new("1", "Dandadan-ep-1", ""));
        let stream = adapter
            .resolve_stream(&ep, &StreamOptions::default())
            .await
            .unwrap();
        assert_eq!(stream.delivery_mode, DeliveryMode::HlsManifest);
        assert_eq!(stream.url, "https://cdn.example/dandadan/ep1/playlist.m3u8");
    }

    #[tokio::test]
    async fn episode_page_without_watch_link() {
        let server = MockServer::start().await;
        Mock::given(path("/ep/x"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<p>rimosso</p>"))
            .mount(&server)
            .await;

        let adapter = AnimeSaturnAdapter::new(&test_config(PROVIDER, &server.uri())).unwrap();
        let ep = ProviderEpisodeRef::from(RawEntry::new("1", "x", ""));
        assert_matches!(
            adapter.resolve_stream(&ep, &StreamOptions::default()).await,
            Err(Error::NoValidSource { .. })
        );
    }
}
