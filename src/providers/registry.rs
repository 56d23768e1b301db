//! Registry of enabled [`ProviderAdapter`]s.
//!
//! The registry is built once at startup from [`Config`] and shared behind an
//! `Arc`. Lookups by [`ProviderId`] return `ProviderUnavailable` for providers
//! that are disabled or were never registered.

use std::collections::BTreeMap;
use std::sync::Arc;

use aniweave_common::{Error, ProviderId, Result};
use tracing::info;

use super::{
    animegg::AnimeGgAdapter, animepahe::AnimePaheAdapter, animesaturn::AnimeSaturnAdapter,
    animeunity::AnimeUnityAdapter, animeworld::AnimeWorldAdapter, comix::ComixAdapter,
    hnime::HNimeAdapter, mangaworld::MangaWorldAdapter, unity::UnityAdapter, ProviderAdapter,
};
use crate::config::Config;

pub struct ProviderRegistry {
    adapters: BTreeMap<ProviderId, Arc<dyn ProviderAdapter>>,
}

impl ProviderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            adapters: BTreeMap::new(),
        }
    }

    /// Build every enabled adapter from configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut registry = Self::new();
        for id in ProviderId::ALL {
            if !config.provider(id).enabled {
                info!(provider = %id, "Provider disabled");
                continue;
            }
            let adapter: Arc<dyn ProviderAdapter> = match id {
                ProviderId::AnimeWorld => Arc::new(AnimeWorldAdapter::new(config)?),
                ProviderId::AnimeSaturn => Arc::new(AnimeSaturnAdapter::new(config)?),
                ProviderId::AnimeUnity => Arc::new(AnimeUnityAdapter::new(config)?),
                ProviderId::AnimePahe => Arc::new(AnimePaheAdapter::new(config)?),
                ProviderId::HNime => Arc::new(HNimeAdapter::new(config)?),
                ProviderId::Unity => Arc::new(UnityAdapter::new(config)?),
                ProviderId::AnimeGG => Arc::new(AnimeGgAdapter::new(config)?),
                ProviderId::MangaWorld => Arc::new(MangaWorldAdapter::new(config)?),
                ProviderId::Comix => Arc::new(ComixAdapter::new(config)?),
            };
            registry.register(adapter);
        }
        Ok(registry)
    }

    /// Register an adapter, replacing any previous one for the same provider.
    pub fn register(&mut self, adapter: Arc<dyn ProviderAdapter>) {
        self.adapters.insert(adapter.id(), adapter);
    }

    pub fn get(&self, id: ProviderId) -> Option<Arc<dyn ProviderAdapter>> {
        self.adapters.get(&id).cloned()
    }

    /// Like [`get`](Self::get) but with a typed error for missing providers.
    pub fn require(&self, id: ProviderId) -> Result<Arc<dyn ProviderAdapter>> {
        self.get(id)
            .ok_or_else(|| Error::unavailable(id, "provider is not enabled"))
    }

    /// Registered provider ids, in `ProviderId` order.
    pub fn ids(&self) -> Vec<ProviderId> {
        self.adapters.keys().copied().collect()
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}
