//! Property tests for episode reconciliation.

use std::collections::{BTreeMap, BTreeSet};

use aniweave::reconcile::{reconcile, reconcile_with_report};
use aniweave_common::{ProviderId, RawEntry};
use proptest::prelude::*;

type Listing = Vec<(ProviderId, Vec<RawEntry>)>;

fn hint(n: u32, padded: bool) -> String {
    if padded {
        format!("{n:02}")
    } else {
        n.to_string()
    }
}

/// Up to four distinct providers, each with a short list of numbered entries.
fn listings() -> impl Strategy<Value = Listing> {
    prop::collection::btree_map(
        0..ProviderId::ALL.len(),
        prop::collection::vec((1u32..60, any::<bool>()), 0..12),
        1..5,
    )
    .prop_map(|by_index| {
        by_index
            .into_iter()
            .map(|(i, numbers)| {
                let provider = ProviderId::ALL[i];
                let entries = numbers
                    .into_iter()
                    .map(|(n, padded)| {
                        RawEntry::new(hint(n, padded), format!("{provider}-{n}"), "")
                    })
                    .collect();
                (provider, entries)
            })
            .collect()
    })
}

fn listing_and_permutation() -> impl Strategy<Value = (Listing, Listing)> {
    listings().prop_flat_map(|lists| (Just(lists.clone()), Just(lists).prop_shuffle()))
}

proptest! {
    #[test]
    fn provider_order_does_not_matter((lists, shuffled) in listing_and_permutation()) {
        prop_assert_eq!(reconcile_with_report(lists), reconcile_with_report(shuffled));
    }

    #[test]
    fn ordinals_strictly_increase_from_one(lists in listings()) {
        let slots = reconcile(lists);
        for pair in slots.windows(2) {
            prop_assert!(pair[0].ordinal < pair[1].ordinal);
        }
        if let Some(first) = slots.first() {
            prop_assert!(first.ordinal >= 1);
        }
    }

    #[test]
    fn every_distinct_ordinal_lands_once(lists in listings()) {
        let expected: BTreeMap<ProviderId, usize> = lists
            .iter()
            .map(|(provider, entries)| {
                let distinct: BTreeSet<u32> = entries
                    .iter()
                    .filter_map(|e| e.ordinal_hint.parse().ok())
                    .collect();
                (*provider, distinct.len())
            })
            .filter(|(_, n)| *n > 0)
            .collect();

        let mut placed: BTreeMap<ProviderId, usize> = BTreeMap::new();
        for slot in reconcile(lists) {
            prop_assert!(!slot.per_provider.is_empty());
            for provider in slot.per_provider.keys() {
                *placed.entry(*provider).or_default() += 1;
            }
        }
        prop_assert_eq!(placed, expected);
    }
}

#[test]
fn padded_and_plain_hints_merge() {
    let slots = reconcile([
        (ProviderId::AnimeWorld, vec![RawEntry::new("1", "aw-1", "")]),
        (ProviderId::AnimeSaturn, vec![RawEntry::new("01", "as-1", "")]),
    ]);
    assert_eq!(slots.len(), 1);
    assert_eq!(slots[0].ordinal, 1);
    assert_eq!(slots[0].per_provider.len(), 2);
}

#[test]
fn offset_applies_only_to_the_continuation_provider() {
    let numbered = |from: u32, to: u32, tag: &str| -> Vec<RawEntry> {
        (from..=to)
            .map(|n| RawEntry::new(n.to_string(), format!("{tag}{n}"), ""))
            .collect()
    };
    let report = reconcile_with_report([
        (ProviderId::AnimePahe, numbered(25, 30, "ap")),
        (ProviderId::AnimeWorld, numbered(1, 6, "aw")),
        (ProviderId::Unity, numbered(1, 4, "un")),
    ]);
    assert_eq!(report.offsets.len(), 1);
    assert_eq!(report.offsets[&ProviderId::AnimePahe], 24);
    assert_eq!(report.slots.len(), 6);
    assert_eq!(report.slots[5].per_provider[&ProviderId::AnimePahe].remote_id, "ap30");
    assert_eq!(report.slots[5].per_provider.len(), 2);
}
