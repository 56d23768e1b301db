//! Stream and page resolution for one reconciled slot.
//!
//! The resolver picks the provider's ref out of an [`EpisodeSlot`], hands it
//! to that provider's adapter and then decides how the result reaches a
//! client: HLS manifests always go through the proxy so the playlist can be
//! rewritten server-side, direct files only when the provider hotlink-protects
//! them, and opaque embeds are returned untouched.

use std::sync::Arc;

use aniweave_common::{
    DeliveryMode, EpisodeSlot, Error, ProviderEpisodeRef, ProviderId, Result, StreamDescriptor,
    StreamOptions,
};
use aniweave_hls::{proxy_url, ResourceKind};
use tracing::{debug, instrument};

use crate::providers::ProviderRegistry;

pub struct StreamResolver {
    registry: Arc<ProviderRegistry>,
    proxy_endpoint: String,
}

impl StreamResolver {
    pub fn new(registry: Arc<ProviderRegistry>, proxy_endpoint: impl Into<String>) -> Self {
        Self {
            registry,
            proxy_endpoint: proxy_endpoint.into(),
        }
    }

    pub fn proxy_endpoint(&self) -> &str {
        &self.proxy_endpoint
    }

    /// Resolve a playable stream for `provider`'s entry in `slot`.
    #[instrument(skip(self, slot, options), fields(ordinal = slot.ordinal))]
    pub async fn resolve(
        &self,
        slot: &EpisodeSlot,
        provider: ProviderId,
        options: &StreamOptions,
    ) -> Result<StreamDescriptor> {
        let episode = slot_ref(slot, provider)?;
        let adapter = self.registry.require(provider)?;
        let descriptor = adapter.resolve_stream(episode, options).await?;
        if descriptor.url.trim().is_empty() {
            return Err(Error::NoValidSource { provider });
        }
        let proxy_media = adapter.profile().proxy_media;
        Ok(self.route(descriptor, proxy_media))
    }

    /// Page image URLs for `provider`'s entry in a chapter slot.
    #[instrument(skip(self, slot), fields(ordinal = slot.ordinal))]
    pub async fn chapter_pages(&self, slot: &EpisodeSlot, provider: ProviderId) -> Result<Vec<String>> {
        let chapter = slot_ref(slot, provider)?;
        let adapter = self.registry.require(provider)?;
        let pages = adapter.chapter_pages(chapter).await?;
        if pages.is_empty() {
            return Err(Error::NoValidSource { provider });
        }
        debug!(provider = %provider, pages = pages.len(), "Chapter pages resolved");
        Ok(pages)
    }

    fn route(&self, mut descriptor: StreamDescriptor, proxy_media: bool) -> StreamDescriptor {
        match descriptor.delivery_mode {
            DeliveryMode::HlsManifest => {
                descriptor.proxied_url = Some(proxy_url(
                    &self.proxy_endpoint,
                    &descriptor.url,
                    ResourceKind::Manifest,
                ));
            }
            DeliveryMode::DirectFile if proxy_media => {
                descriptor.proxied_url = Some(proxy_url(
                    &self.proxy_endpoint,
                    &descriptor.url,
                    ResourceKind::File,
                ));
                for variant in &mut descriptor.variants {
                    variant.url = proxy_url(&self.proxy_endpoint, &variant.url, ResourceKind::File);
                }
            }
            DeliveryMode::DirectFile | DeliveryMode::OpaqueEmbed => {}
        }
        descriptor
    }
}

fn slot_ref(slot: &EpisodeSlot, provider: ProviderId) -> Result<&ProviderEpisodeRef> {
    slot.available(provider).ok_or_else(|| {
        Error::unavailable(provider, format!("no reference for ordinal {}", slot.ordinal))
    })
}
