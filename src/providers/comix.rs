//! Comix adapter: series JSON, paged chapter listing, chapter images.

use aniweave_common::{
    ProviderEpisodeRef, ProviderId, ProviderRecord, Result, SeriesQuery, SourceRef,
};
use aniweave_extract::comix;
use async_trait::async_trait;
use tracing::warn;

use super::{
    anchor_not_found, configured_profile, require_remote_id, Expect, ProviderAdapter,
    ProviderHttp, RequestProfile, MAX_LISTING_PAGES,
};
use crate::config::Config;

const PROVIDER: ProviderId = ProviderId::Comix;
const CHAPTERS_PER_PAGE: u32 = 100;

pub struct ComixAdapter {
    http: ProviderHttp,
}

impl ComixAdapter {
    pub fn new(config: &Config) -> Result<Self> {
        let profile = configured_profile(config, PROVIDER);
        Ok(Self {
            http: ProviderHttp::new(PROVIDER, profile)?,
        })
    }

    /// `x1-kagurabachi`, `/title/x1-kagurabachi` or `x1` all name the same title.
    fn title_id(id: &str) -> &str {
        id.trim().trim_start_matches("/title/").trim_matches('/')
    }

    /// The API wants the bare hash id, the part before the first dash.
    fn hash_id(id: &str) -> &str {
        let id = Self::title_id(id);
        id.split('-').next().unwrap_or(id)
    }

    fn series_url(&self, id: &str) -> String {
        self.http.url(&format!("/title/{}", Self::title_id(id)))
    }
}

#[async_trait]
impl ProviderAdapter for ComixAdapter {
    fn id(&self) -> ProviderId {
        PROVIDER
    }

    fn profile(&self) -> &RequestProfile {
        self.http.profile()
    }

    async fn fetch_record(&self, query: &SeriesQuery) -> Result<ProviderRecord> {
        let hid = Self::hash_id(&query.id);
        let body = self
            .http
            .get_text(&self.http.url(&format!("/api/v2/manga/{hid}")), Expect::Json)
            .await?;
        let mut record = comix::extract(&body).map_err(anchor_not_found)?;

        let series_url = self.series_url(&query.id);
        let mut page = 1;
        loop {
            let url = self.http.url(&format!(
                "/api/v2/manga/{hid}/chapters?page={page}&limit={CHAPTERS_PER_PAGE}&order[number]=asc"
            ));
            let body = self.http.get_text(&url, Expect::Json).await?;
            let listing = comix::parse_chapter_page(&body, &series_url)?;
            let more = listing.has_more();
            record.episodes_or_chapters.extend(listing.items);

            if !more {
                break;
            }
            if page >= MAX_LISTING_PAGES {
                warn!(provider = %PROVIDER, hid, pages = page, "Chapter listing truncated at page cap");
                break;
            }
            page += 1;
        }
        Ok(record)
    }

    async fn chapter_pages(&self, chapter: &ProviderEpisodeRef) -> Result<Vec<String>> {
        let id = require_remote_id(PROVIDER, chapter)?;
        let url = self
            .http
            .url(&format!("/api/v2/chapters/{}", urlencoding::encode(id)));
        let body = self.http.get_text(&url, Expect::Json).await?;
        Ok(comix::chapter_pages(&body)?)
    }

    fn source_ref(&self, query: &SeriesQuery) -> SourceRef {
        SourceRef {
            provider: PROVIDER,
            external_id: Self::hash_id(&query.id).to_string(),
            canonical_url: self.series_url(&query.id),
            session_token: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::test_config;
    use wiremock::matchers::{path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn ids() {
        assert_eq!(ComixAdapter::hash_id("/title/x1-kagurabachi"), "x1");
        assert_eq!(ComixAdapter::hash_id("x1"), "x1");
        assert_eq!(ComixAdapter::title_id("/title/x1-kagurabachi/"), "x1-kagurabachi");
    }

    #[tokio::test]
    async fn chapters_across_pages() {
        let server = MockServer::start().await;
        Mock::given(path("/api/v2/manga/x1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "result": {"title": "Kagurabachi", "genres": []}
            })))
            .mount(&server)
            .await;
        for page in 1..=2u32 {
            Mock::given(path("/api/v2/manga/x1/chapters"))
                .and(query_param("page", page.to_string().as_str()))
                .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "result": {
                        "items": [{"chapter_id": 500 + page, "number": page}],
                        "pagination": {"current_page": page, "last_page": 2}
                    }
                })))
                .expect(1)
                .mount(&server)
                .await;
        }

        let adapter = ComixAdapter::new(&test_config(PROVIDER, &server.uri())).unwrap();
        let query = SeriesQuery::new(PROVIDER, "x1-kagurabachi");
        let record = adapter.fetch_record(&query).await.unwrap();
        assert_eq!(record.title, "Kagurabachi");
        assert_eq!(record.episodes_or_chapters.len(), 2);
        assert_eq!(
            record.episodes_or_chapters[1].remote_url,
            format!("{}/title/x1-kagurabachi/502-chapter-2", server.uri())
        );

        let source = adapter.source_ref(&query);
        assert_eq!(source.external_id, "x1");
    }
}
