//! MangaWorld adapter: manga pages and list-style chapter readers.

use aniweave_common::{
    Error, ProviderEpisodeRef, ProviderId, ProviderRecord, Result, SeriesQuery,
};
use aniweave_extract::mangaworld;
use async_trait::async_trait;

use super::{
    anchor_not_found, configured_profile, Expect, ProviderAdapter, ProviderHttp, RequestProfile,
};
use crate::config::Config;

const PROVIDER: ProviderId = ProviderId::MangaWorld;

pub struct MangaWorldAdapter {
    http: ProviderHttp,
}

impl MangaWorldAdapter {
    pub fn new(config: &Config) -> Result<Self> {
        let profile = configured_profile(config, PROVIDER);
        Ok(Self {
            http: ProviderHttp::new(PROVIDER, profile)?,
        })
    }
}

#[async_trait]
impl ProviderAdapter for MangaWorldAdapter {
    fn id(&self) -> ProviderId {
        PROVIDER
    }

    fn profile(&self) -> &RequestProfile {
        self.http.profile()
    }

    async fn fetch_record(&self, query: &SeriesQuery) -> Result<ProviderRecord> {
        let url = self.http.url(&query.id);
        let body = self.http.get_text(&url, Expect::Html).await?;
        mangaworld::extract(&body, &url).map_err(anchor_not_found)
    }

    async fn chapter_pages(&self, chapter: &ProviderEpisodeRef) -> Result<Vec<String>> {
        if chapter.remote_url.is_empty() {
            return Err(Error::unavailable(PROVIDER, "chapter URL required"));
        }
        let chapter_url = self.http.url(&chapter.remote_url);
        let reader_url = mangaworld::list_style_url(&chapter_url);
        let body = self.http.get_text(&reader_url, Expect::Html).await?;
        let pages = mangaworld::chapter_pages(&body, &reader_url)?;
        if pages.is_empty() {
            return Err(Error::NoValidSource { provider: PROVIDER });
        }
        Ok(pages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::test_config;
    use aniweave_common::RawEntry;
    use assert_matches::assert_matches;
    use wiremock::matchers::{path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn reads_list_style_chapter() {
        let server = MockServer::start().await;
        Mock::given(path("/manga/1/chainsaw-man/read/aaa"))
            .and(query_param("style", "list"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<div id="page"><img class="page-image" src="https://cdn.mangaworld.ac/chapters/1.png"></div>"#,
            ))
            .expect(1)
            .mount(&server)
            .await;

        let adapter = MangaWorldAdapter::new(&test_config(PROVIDER, &server.uri())).unwrap();
        let chapter = ProviderEpisodeRef::from(RawEntry::new(
            "1",
            "aaa",
            "/manga/1/chainsaw-man/read/aaa",
        ));
        let pages = adapter.chapter_pages(&chapter).await.unwrap();
        assert_eq!(pages, vec!["https://cdn.mangaworld.ac/chapters/1.png"]);
    }

    #[tokio::test]
    async fn chapter_needs_url() {
        let server = MockServer::start().await;
        let adapter = MangaWorldAdapter::new(&test_config(PROVIDER, &server.uri())).unwrap();
        let chapter = ProviderEpisodeRef::from(RawEntry::new("1", "aaa", ""));
        assert_matches!(
            adapter.chapter_pages(&chapter).await,
            Err(Error::ProviderUnavailable { .. })
        );
    }
}
