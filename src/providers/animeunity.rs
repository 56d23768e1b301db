//! AnimeUnity adapter.
//!
//! Title pages embed the first 120 episodes; the rest are paged through
//! `/info_api`. Streams go through `/embed-url/<episode>`, which answers with
//! a redirect to a VixCloud embed page carrying the signed master playlist.
//! The redirect has to be inspected, so this adapter runs in manual mode.

use std::time::Duration;

use aniweave_common::{
    DeliveryMode, Error, ProviderEpisodeRef, ProviderId, ProviderRecord, Result, SeriesQuery,
    SourceRef, StreamDescriptor, StreamOptions,
};
use aniweave_extract::animeunity;
use async_trait::async_trait;
use tracing::{debug, warn};

use super::{
    anchor_not_found, configured_profile, require_remote_id, site_url, Expect, ProviderAdapter,
    ProviderHttp, RedirectMode, RequestProfile, MAX_LISTING_PAGES,
};
use crate::config::Config;

const PROVIDER: ProviderId = ProviderId::AnimeUnity;

pub struct AnimeUnityAdapter {
    http: ProviderHttp,
}

impl AnimeUnityAdapter {
    pub fn new(config: &Config) -> Result<Self> {
        let profile = configured_profile(config, PROVIDER).with_redirect(RedirectMode::Manual);
        Ok(Self {
            http: ProviderHttp::new(PROVIDER, profile)?,
        })
    }

    /// `4321-one-piece-ita`, `/anime/4321-one-piece-ita` or a full URL.
    fn title_path(id: &str) -> String {
        let id = id.trim();
        if id.starts_with("http") || id.starts_with("/anime/") {
            id.to_string()
        } else {
            format!("/anime/{}", id.trim_start_matches('/'))
        }
    }
}

#[async_trait]
impl ProviderAdapter for AnimeUnityAdapter {
    fn id(&self) -> ProviderId {
        PROVIDER
    }

    fn profile(&self) -> &RequestProfile {
        self.http.profile()
    }

    async fn fetch_record(&self, query: &SeriesQuery) -> Result<ProviderRecord> {
        let url = self.http.url(&Self::title_path(&query.id));
        let body = self.http.get_text(&url, Expect::Html).await?;
        let mut record = animeunity::extract(&body, self.http.base_url()).map_err(anchor_not_found)?;
        let handle = animeunity::series_handle(&body).map_err(anchor_not_found)?;

        let embedded = record.episodes_or_chapters.len() as u32;
        if handle.episodes_count <= embedded {
            return Ok(record);
        }

        let series_url = handle.page_url(self.http.base_url());
        for (start, end) in handle
            .ranges()
            .into_iter()
            .skip_while(|(_, end)| *end <= embedded)
            .take(MAX_LISTING_PAGES as usize)
        {
            let range_url = self.http.url(&format!(
                "/info_api/{}/1?start_range={start}&end_range={end}",
                handle.anime_id
            ));
            debug!(provider = %PROVIDER, start, end, "Fetching episode range");
            let page = match self.http.get_text(&range_url, Expect::Json).await {
                Ok(page) => page,
                Err(e) => {
                    warn!(provider = %PROVIDER, start, end, error = %e, "Episode range failed, returning partial list");
                    break;
                }
            };
            record
                .episodes_or_chapters
                .extend(animeunity::parse_info_api(&page, &series_url)?);
        }

        Ok(record)
    }

    async fn resolve_stream(
        &self,
        episode: &ProviderEpisodeRef,
        _options: &StreamOptions,
    ) -> Result<StreamDescriptor> {
        let id = require_remote_id(PROVIDER, episode)?;
        let embed_url = self
            .http
            .redirect_location(&self.http.url(&format!("/embed-url/{id}")))
            .await?;
        debug!(provider = %PROVIDER, embed = %embed_url, "Embed resolved");

        let embed = self.http.get_text(&embed_url, Expect::Html).await?;
        let master = animeunity::master_playlist(&embed)
            .ok_or(Error::NoValidSource { provider: PROVIDER })?;
        let url = master
            .playlist_url()
            .ok_or(Error::NoValidSource { provider: PROVIDER })?;

        let mut stream = StreamDescriptor::new(DeliveryMode::HlsManifest, url);
        let remaining = master.expires - chrono::Utc::now().timestamp();
        if remaining > 0 {
            stream.expires_hint = Some(Duration::from_secs(remaining as u64));
        }
        Ok(stream)
    }

    fn source_ref(&self, query: &SeriesQuery) -> SourceRef {
        SourceRef {
            provider: PROVIDER,
            external_id: query.id.clone(),
            canonical_url: site_url(self.http.base_url(), &Self::title_path(&query.id)),
            session_token: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aniweave_common::RawEntry;
    use assert_matches::assert_matches;
    use crate::providers::test_config;
    use wiremock::matchers::{path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn title_page(count: u32, embedded: u32) -> String {
        let episodes: Vec<String> = (1..=embedded)
            .map(|n| format!("{{&quot;id&quot;:{},&quot;number&quot;:&quot;{n}&quot;}}", 1000 + n))
            .collect();
        format!(
            r#"<video-player anime="{{&quot;id&quot;:55,&quot;slug&quot;:&quot;long-show&quot;,&quot;title&quot;:&quot;Long Show&quot;,&quot;episodes_count&quot;:{count}}}" episodes="[{}]"></video-player>"#,
            episodes.join(",")
        )
    }

    #[test]
    fn title_paths() {
        assert_eq!(AnimeUnityAdapter::title_path("55-long-show"), "/anime/55-long-show");
        assert_eq!(AnimeUnityAdapter::title_path("/anime/55-long-show"), "/anime/55-long-show");
    }

    #[tokio::test]
    async fn follows_info_api_ranges() {
        let server = MockServer::start().await;
        Mock::given(path("/anime/55-long-show"))
            .respond_with(ResponseTemplate::new(200).set_body_string(title_page(122, 120)))
            .mount(&server)
            .await;
        Mock::given(path("/info_api/55/1"))
            .and(query_param("start_range", "121"))
            .and(query_param("end_range", "122"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "episodes": [{"id": 2121, "number": "121"}, {"id": 2122, "number": "122"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let adapter = AnimeUnityAdapter::new(&test_config(PROVIDER, &server.uri())).unwrap();
        let record = adapter
            .fetch_record(&SeriesQuery::new(PROVIDER, "55-long-show"))
            .await
            .unwrap();
        assert_eq!(record.episodes_or_chapters.len(), 122);
        let last = record.episodes_or_chapters.last().unwrap();
        assert_eq!(last.ordinal_hint, "122");
        assert!(last.remote_url.ends_with("/anime/55-long-show/2122"));
    }

    #[tokio::test]
    async fn embed_redirect_to_master_playlist() {
        let server = MockServer::start().await;
        let embed = format!("{}/vix/embed/991", server.uri());
        Mock::given(path("/embed-url/1001"))
            .respond_with(ResponseTemplate::new(302).insert_header("location", embed.as_str()))
            .mount(&server)
            .await;
        Mock::given(path("/vix/embed/991"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<script>window.masterPlaylist = { params: { 'token': 'tkn', 'expires': '4102444800', }, url: 'https://vixcloud.co/playlist/991?b=1', }
                window.canPlayFHD = true</script>"#,
            ))
            .mount(&server)
            .await;

        let adapter = AnimeUnityAdapter::new(&test_config(PROVIDER, &server.uri())).unwrap();
        let ep = ProviderEpisodeRef::from(RawEntry::new("1", "1001", ""));
        let stream = adapter
            .resolve_stream(&ep, &StreamOptions::default())
            .await
            .unwrap();
        assert_eq!(stream.delivery_mode, DeliveryMode::HlsManifest);
        assert_eq!(
            stream.url,
            "https://vixcloud.co/playlist/991?b=1&token=tkn&expires=4102444800&h=1"
        );
        assert!(stream.expires_hint.is_some());
    }

    #[tokio::test]
    async fn embed_without_playlist() {
        let server = MockServer::start().await;
        Mock::given(path("/embed-url/1"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not a url"))
            .mount(&server)
            .await;

        let adapter = AnimeUnityAdapter::new(&test_config(PROVIDER, &server.uri())).unwrap();
        let ep = ProviderEpisodeRef::from(RawEntry::new("1", "1", ""));
        assert_matches!(
            adapter.resolve_stream(&ep, &StreamOptions::default()).await,
            Err(Error::NoValidSource { .. })
        );
    }
}
