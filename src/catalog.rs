//! Series lookups across providers: metadata with fallback, and reconciled
//! episode/chapter listings.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use aniweave_common::{
    CanonicalSeries, Error, ProviderId, ProviderRecord, Result, SeriesQuery, SourceRef,
};
use tracing::{debug, info, instrument, warn};

use crate::cache::RecordCache;
use crate::config::Config;
use crate::fallback::{resolve_with_fallback, FallbackOutcome};
use crate::providers::ProviderRegistry;
use crate::reconcile::reconcile_with_report;

/// Metadata for one series, from whichever provider answered first.
#[derive(Debug, Clone)]
pub struct MetaLookup {
    pub record: ProviderRecord,
    pub source: SourceRef,
    pub fallback: bool,
    pub attempts: usize,
}

/// A reconciled listing plus what went wrong on the way.
#[derive(Debug)]
pub struct Listing {
    pub series: CanonicalSeries,
    pub offsets: BTreeMap<ProviderId, u32>,
    pub skipped: usize,
    /// Providers that failed while others succeeded.
    pub failures: Vec<(ProviderId, Error)>,
}

pub struct Catalog {
    registry: Arc<ProviderRegistry>,
    cache: RecordCache,
    deadline: Duration,
}

impl Catalog {
    pub fn new(registry: Arc<ProviderRegistry>, config: &Config) -> Self {
        Self {
            registry,
            cache: RecordCache::new(&config.cache),
            deadline: config.fallback.deadline(),
        }
    }

    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        &self.registry
    }

    /// Fetch one record, served from the cache while it is fresh.
    pub async fn fetch_record(&self, query: &SeriesQuery) -> Result<ProviderRecord> {
        if let Some(record) = self.cache.get(query) {
            debug!(query = %query, "Record cache hit");
            return Ok(record);
        }
        let record = self.registry.require(query.provider)?.fetch_record(query).await?;
        self.cache.insert(query.clone(), record.clone());
        Ok(record)
    }

    pub fn source_ref(&self, query: &SeriesQuery) -> Result<SourceRef> {
        Ok(self.registry.require(query.provider)?.source_ref(query))
    }

    /// Series metadata from `primary`, falling back through `fallbacks` in order.
    #[instrument(skip(self, fallbacks), fields(primary = %primary))]
    pub async fn meta(&self, primary: SeriesQuery, fallbacks: Vec<SeriesQuery>) -> Result<MetaLookup> {
        let FallbackOutcome {
            value,
            served_by,
            fallback,
            attempts,
        } = resolve_with_fallback(primary, fallbacks, self.deadline, |query| async move {
            self.fetch_record(&query).await
        })
        .await?;

        Ok(MetaLookup {
            source: self.source_ref(&served_by)?,
            record: value,
            fallback,
            attempts,
        })
    }

    /// Fetch every query concurrently and reconcile the listings.
    ///
    /// Fails only when every provider failed or nothing could be reconciled.
    #[instrument(skip(self, queries), fields(providers = queries.len()))]
    pub async fn listing(&self, queries: &[SeriesQuery]) -> Result<Listing> {
        if queries.is_empty() {
            return Err(Error::validation("no provider handle supplied"));
        }

        let results = futures::future::join_all(queries.iter().map(|query| async move {
            (query, self.fetch_record(query).await)
        }))
        .await;

        let attempts = results.len();
        let mut title = String::new();
        let mut sources = Vec::new();
        let mut lists = Vec::new();
        let mut failures = Vec::new();
        for (query, result) in results {
            match result {
                Ok(record) => {
                    if title.is_empty() {
                        title = record.title.clone();
                    }
                    sources.push(self.source_ref(query)?);
                    lists.push((query.provider, record.episodes_or_chapters));
                }
                Err(e) => {
                    warn!(query = %query, kind = e.kind(), error = %e, "Listing lookup failed");
                    failures.push((query.provider, e));
                }
            }
        }

        if lists.is_empty() {
            let last = failures
                .pop()
                .map(|(_, e)| e)
                .unwrap_or_else(|| Error::Internal("no listing results".into()));
            return Err(Error::AllProvidersFailed {
                attempts,
                last: Box::new(last),
            });
        }

        let report = reconcile_with_report(lists);
        if report.slots.is_empty() {
            return Err(Error::not_found(queries[0].provider, "no episodes found"));
        }
        info!(
            slots = report.slots.len(),
            skipped = report.skipped,
            failed = failures.len(),
            "Listing reconciled"
        );

        sources.sort();
        Ok(Listing {
            series: CanonicalSeries {
                title,
                ordinals: report.slots,
                sources,
            },
            offsets: report.offsets,
            skipped: report.skipped,
            failures,
        })
    }
}
