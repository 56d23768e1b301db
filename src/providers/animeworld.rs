//! AnimeWorld adapter: `/play/<slug>.<id>` pages and `/api/episode/info`.

use aniweave_common::{
    Error, ProviderEpisodeRef, ProviderId, ProviderRecord, Result, SeriesQuery, StreamDescriptor,
    StreamOptions,
};
use aniweave_extract::animeworld;
use async_trait::async_trait;

use super::{
    anchor_not_found, configured_profile, require_remote_id, Expect, ProviderAdapter,
    ProviderHttp, RequestProfile,
};
use crate::config::Config;

const PROVIDER: ProviderId = ProviderId::AnimeWorld;

pub struct AnimeWorldAdapter {
    http: ProviderHttp,
}

impl AnimeWorldAdapter {
    pub fn new(config: &Config) -> Result<Self> {
        let profile = configured_profile(config, PROVIDER);
        Ok(Self {
            http: ProviderHttp::new(PROVIDER, profile)?,
        })
    }
}

#[async_trait]
impl ProviderAdapter for AnimeWorldAdapter {
    fn id(&self) -> ProviderId {
        PROVIDER
    }

    fn profile(&self) -> &RequestProfile {
        self.http.profile()
    }

    async fn fetch_record(&self, query: &SeriesQuery) -> Result<ProviderRecord> {
        let url = self.http.url(&query.id);
        let body = self.http.get_text(&url, Expect::Html).await?;
        animeworld::extract(&body, &url).map_err(anchor_not_found)
    }

    async fn resolve_stream(
        &self,
        episode: &ProviderEpisodeRef,
        _options: &StreamOptions,
    ) -> Result<StreamDescriptor> {
        let id = require_remote_id(PROVIDER, episode)?;
        let url = self.http.url(&format!(
            "/api/episode/info?id={}",
            urlencoding::encode(id)
        ));
        let body = self
            .http
            .get_text_with(&url, Expect::Json, &[("x-requested-with", "XMLHttpRequest")])
            .await?;
        let media = animeworld::grabber_url(&body)?
            .ok_or(Error::NoValidSource { provider: PROVIDER })?;
        Ok(StreamDescriptor::from_media_url(media))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::test_config;
    use aniweave_common::{DeliveryMode, RawEntry};
    use assert_matches::assert_matches;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn adapter(server: &MockServer) -> AnimeWorldAdapter {
        AnimeWorldAdapter::new(&test_config(PROVIDER, &server.uri())).unwrap()
    }

    #[tokio::test]
    async fn missing_player_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(path("/play/gone.x1"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>Cloudflare</html>"))
            .mount(&server)
            .await;

        let result = adapter(&server)
            .await
            .fetch_record(&SeriesQuery::new(PROVIDER, "/play/gone.x1"))
            .await;
        assert_matches!(result, Err(Error::NotFound { .. }));
    }

    #[tokio::test]
    async fn grabber_is_direct_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/episode/info"))
            .and(query_param("id", "4xK"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "grabber": "https://srv1.streampeaker.org/DDL/ANIME/Frieren/Frieren_Ep_01_SUB_ITA.mp4",
                "target": null
            })))
            .mount(&server)
            .await;

        let ep = ProviderEpisodeRef::from(RawEntry::new("1", "4xK", ""));
        let stream = adapter(&server)
            .await
            .resolve_stream(&ep, &StreamOptions::default())
            .await
            .unwrap();
        assert_eq!(stream.delivery_mode, DeliveryMode::DirectFile);
        assert!(stream.url.ends_with("Frieren_Ep_01_SUB_ITA.mp4"));
    }

    #[tokio::test]
    async fn empty_grabber_is_no_valid_source() {
        let server = MockServer::start().await;
        Mock::given(path("/api/episode/info"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"grabber": ""})))
            .mount(&server)
            .await;

        let ep = ProviderEpisodeRef::from(RawEntry::new("1", "4xK", ""));
        let result = adapter(&server)
            .await
            .resolve_stream(&ep, &StreamOptions::default())
            .await;
        assert_matches!(result, Err(Error::NoValidSource { .. }));
    }
}
