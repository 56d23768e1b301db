//! Short-lived cache of provider records.
//!
//! Best-effort only: entries expire after the configured TTL and the cache is
//! never consulted for stream resolution, whose URLs carry expiring tokens.

use std::time::{Duration, Instant};

use aniweave_common::{ProviderRecord, SeriesQuery};
use dashmap::DashMap;

use crate::config::CacheConfig;

pub struct RecordCache {
    ttl: Duration,
    max_entries: usize,
    entries: DashMap<SeriesQuery, (Instant, ProviderRecord)>,
}

impl RecordCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            ttl: Duration::from_secs(config.ttl_secs),
            max_entries: config.max_entries,
            entries: DashMap::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.ttl.is_zero() && self.max_entries > 0
    }

    /// A fresh record, if one is cached.
    pub fn get(&self, query: &SeriesQuery) -> Option<ProviderRecord> {
        if !self.is_enabled() {
            return None;
        }
        let hit = self.entries.get(query).and_then(|entry| {
            let (stored, record) = entry.value();
            (stored.elapsed() < self.ttl).then(|| record.clone())
        });
        if hit.is_none() {
            self.entries.remove_if(query, |_, (stored, _)| stored.elapsed() >= self.ttl);
        }
        hit
    }

    pub fn insert(&self, query: SeriesQuery, record: ProviderRecord) {
        if !self.is_enabled() {
            return;
        }
        if self.entries.len() >= self.max_entries {
            self.evict();
        }
        self.entries.insert(query, (Instant::now(), record));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop expired entries, then the oldest ones until there is room.
    fn evict(&self) {
        self.entries
            .retain(|_, (stored, _)| stored.elapsed() < self.ttl);
        while self.entries.len() >= self.max_entries {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|e| e.value().0)
                .map(|e| e.key().clone());
            match oldest {
                Some(key) => {
                    self.entries.remove(&key);
                }
                None => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aniweave_common::ProviderId;

    fn record(title: &str) -> ProviderRecord {
        ProviderRecord {
            title: title.to_string(),
            ..Default::default()
        }
    }

    fn cache(ttl_secs: u64, max_entries: usize) -> RecordCache {
        RecordCache::new(&CacheConfig {
            ttl_secs,
            max_entries,
        })
    }

    #[test]
    fn hit_and_miss() {
        let cache = cache(60, 8);
        let q = SeriesQuery::new(ProviderId::AnimeWorld, "/play/a.1");
        assert!(cache.get(&q).is_none());
        cache.insert(q.clone(), record("A"));
        assert_eq!(cache.get(&q).unwrap().title, "A");
    }

    #[test]
    fn zero_ttl_disables() {
        let cache = cache(0, 8);
        let q = SeriesQuery::new(ProviderId::Unity, "1");
        cache.insert(q.clone(), record("A"));
        assert!(cache.is_empty());
        assert!(cache.get(&q).is_none());
    }

    #[test]
    fn bounded_size() {
        let cache = cache(60, 2);
        for i in 0..5 {
            cache.insert(SeriesQuery::new(ProviderId::Comix, i.to_string()), record("x"));
        }
        assert!(cache.len() <= 2);
        assert!(cache
            .get(&SeriesQuery::new(ProviderId::Comix, "4"))
            .is_some());
    }
}
