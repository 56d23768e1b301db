//! Unity adapter: JSON API with speculative per-quality stream probes.

use aniweave_common::{
    Error, ProviderEpisodeRef, ProviderId, ProviderRecord, Result, SeriesQuery, StreamDescriptor,
    StreamOptions, StreamVariant,
};
use aniweave_extract::{normalize::parse_quality, unity};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use tracing::debug;

use super::{
    anchor_not_found, configured_profile, require_remote_id, Expect, ProviderAdapter,
    ProviderHttp, RequestProfile,
};
use crate::config::Config;

const PROVIDER: ProviderId = ProviderId::Unity;

/// Resolutions probed per episode, best first.
pub const QUALITY_LADDER: [&str; 4] = ["1080", "720", "480", "360"];

/// Concurrent probes per episode.
const PROBE_CONCURRENCY: usize = 2;

pub struct UnityAdapter {
    http: ProviderHttp,
}

impl UnityAdapter {
    pub fn new(config: &Config) -> Result<Self> {
        let profile = configured_profile(config, PROVIDER);
        Ok(Self {
            http: ProviderHttp::new(PROVIDER, profile)?,
        })
    }

    /// `Ok(None)` when upstream answered but did not confirm the quality.
    async fn probe(&self, episode_id: &str, quality: &'static str) -> Result<Option<StreamVariant>> {
        let url = self.http.url(&format!(
            "/api/episode/{}/stream?res={quality}",
            urlencoding::encode(episode_id)
        ));
        let body = self.http.get_text(&url, Expect::Json).await.map_err(|e| {
            debug!(provider = %PROVIDER, quality, kind = e.kind(), error = %e, "Probe failed");
            e
        })?;
        let confirmed = unity::parse_stream_probe(&body).ok().flatten();
        Ok(confirmed.map(|url| StreamVariant {
            quality: format!("{quality}p"),
            url,
        }))
    }
}

#[async_trait]
impl ProviderAdapter for UnityAdapter {
    fn id(&self) -> ProviderId {
        PROVIDER
    }

    fn profile(&self) -> &RequestProfile {
        self.http.profile()
    }

    async fn fetch_record(&self, query: &SeriesQuery) -> Result<ProviderRecord> {
        let id = query.id.trim().trim_matches('/');
        let url = self
            .http
            .url(&format!("/api/series/{}", urlencoding::encode(id)));
        let body = self.http.get_text(&url, Expect::Json).await?;
        unity::extract(&body).map_err(anchor_not_found)
    }

    async fn resolve_stream(
        &self,
        episode: &ProviderEpisodeRef,
        options: &StreamOptions,
    ) -> Result<StreamDescriptor> {
        let episode_id = require_remote_id(PROVIDER, episode)?;

        let probes = QUALITY_LADDER.map(|q| self.probe(episode_id, q));
        let outcomes: Vec<Result<Option<StreamVariant>>> = stream::iter(probes)
            .buffer_unordered(PROBE_CONCURRENCY)
            .collect()
            .await;

        let mut variants = Vec::new();
        let mut answered = false;
        let mut last_error = None;
        for outcome in outcomes {
            match outcome {
                Ok(variant) => {
                    answered = true;
                    variants.extend(variant);
                }
                Err(e) => last_error = Some(e),
            }
        }
        if variants.is_empty() {
            // Only a successful answer without a stream is NoValidSource.
            return Err(match last_error {
                Some(e) if !answered => e,
                _ => Error::NoValidSource { provider: PROVIDER },
            });
        }
        variants.sort_by_key(|v| std::cmp::Reverse(parse_quality(&v.quality).unwrap_or(0)));

        let wanted = options.quality.as_deref().and_then(parse_quality);
        let chosen = wanted
            .and_then(|q| {
                variants
                    .iter()
                    .find(|v| parse_quality(&v.quality) == Some(q))
            })
            .unwrap_or(&variants[0])
            .url
            .clone();

        let mut stream = StreamDescriptor::from_media_url(chosen);
        stream.variants = variants;
        Ok(stream)
    }
}
