//! Episode/chapter reconciliation.
//!
//! Providers number the same series differently: zero-padded, prefixed with
//! "Episodio", or continuing a previous season's count. [`reconcile`] merges
//! every provider's raw listing into one ascending sequence of
//! [`EpisodeSlot`]s keyed by canonical ordinal.
//!
//! The algorithm:
//!
//! 1. Parse each ordinal hint; unparseable hints are skipped, as are entries
//!    with neither a remote id nor a URL.
//! 2. Within one provider the first remaining entry for an ordinal wins.
//! 3. A provider whose range starts more than one past the end of all other
//!    providers' ranges, without overlapping them, is a continuation-numbered
//!    season and is shifted down so that it starts at 1.
//! 4. The union is emitted in ascending ordinal order.
//!
//! The output depends only on the set of (provider, entries) pairs, never on
//! the order providers are supplied in.

use std::collections::BTreeMap;

use aniweave_common::{EpisodeSlot, ProviderEpisodeRef, ProviderId, RawEntry};
use aniweave_extract::normalize::parse_ordinal;
use tracing::{debug, info};

/// Reconciliation output with diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub slots: Vec<EpisodeSlot>,
    /// Offsets subtracted from a provider's ordinals.
    pub offsets: BTreeMap<ProviderId, u32>,
    /// Entries dropped for an unparseable hint or a missing reference.
    pub skipped: usize,
}

/// Merge per-provider listings into canonical slots.
pub fn reconcile<I>(lists: I) -> Vec<EpisodeSlot>
where
    I: IntoIterator<Item = (ProviderId, Vec<RawEntry>)>,
{
    reconcile_with_report(lists).slots
}

/// [`reconcile`], also reporting applied offsets and skipped entries.
pub fn reconcile_with_report<I>(lists: I) -> ReconcileReport
where
    I: IntoIterator<Item = (ProviderId, Vec<RawEntry>)>,
{
    let mut grouped: BTreeMap<ProviderId, Vec<RawEntry>> = BTreeMap::new();
    for (provider, entries) in lists {
        grouped.entry(provider).or_default().extend(entries);
    }

    let mut skipped = 0;
    let mut parsed: BTreeMap<ProviderId, BTreeMap<u32, RawEntry>> = BTreeMap::new();
    for (provider, entries) in grouped {
        let by_ordinal = parsed.entry(provider).or_default();
        for entry in entries {
            let Some(ordinal) = parse_ordinal(&entry.ordinal_hint) else {
                debug!(provider = %provider, hint = %entry.ordinal_hint, "Skipping unparseable ordinal");
                skipped += 1;
                continue;
            };
            if entry.remote_id.trim().is_empty() && entry.remote_url.trim().is_empty() {
                debug!(provider = %provider, ordinal, "Dropping entry without reference");
                skipped += 1;
                continue;
            }
            if by_ordinal.contains_key(&ordinal) {
                debug!(provider = %provider, ordinal, "Duplicate ordinal, keeping first");
                continue;
            }
            by_ordinal.insert(ordinal, entry);
        }
    }
    parsed.retain(|_, entries| !entries.is_empty());

    let offsets = detect_offsets(&parsed);
    for (provider, offset) in &offsets {
        info!(provider = %provider, offset, "Continuation numbering detected, remapping");
    }

    let mut slots: BTreeMap<u32, EpisodeSlot> = BTreeMap::new();
    for (provider, entries) in parsed {
        let offset = offsets.get(&provider).copied().unwrap_or(0);
        for (ordinal, entry) in entries {
            let canonical = ordinal - offset;
            slots
                .entry(canonical)
                .or_insert_with(|| EpisodeSlot::new(canonical))
                .per_provider
                .insert(provider, ProviderEpisodeRef::from(entry));
        }
    }

    ReconcileReport {
        slots: slots.into_values().collect(),
        offsets,
        skipped,
    }
}

/// Offsets for providers numbered as a continuation of the others.
///
/// At most one provider can qualify: its minimum must exceed every other
/// provider's maximum.
fn detect_offsets(parsed: &BTreeMap<ProviderId, BTreeMap<u32, RawEntry>>) -> BTreeMap<ProviderId, u32> {
    let mut offsets = BTreeMap::new();
    if parsed.len() < 2 {
        return offsets;
    }

    for (provider, entries) in parsed {
        let Some(&min) = entries.keys().next() else {
            continue;
        };
        let others = parsed
            .iter()
            .filter(|(other, _)| *other != provider)
            .flat_map(|(_, e)| e.keys().copied());
        let mut others_max = None;
        let mut overlap = false;
        for ordinal in others {
            others_max = others_max.max(Some(ordinal));
            overlap |= entries.contains_key(&ordinal);
        }
        let Some(others_max) = others_max else {
            continue;
        };
        if !overlap && min > others_max.saturating_add(1) {
            offsets.insert(*provider, min - 1);
        }
    }
    offsets
}
