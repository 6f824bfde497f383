use crate::{Subscription, SubscriptionIndex};
use alloy_primitives::B256;
use chainwatch_types::{MAX_PREFIX_BITS, MIN_PREFIX_BITS, StealthPrefix};

/// The prefixes of `candidate` at every subscribable length, shortest first.
///
/// A stored prefix matches `candidate` exactly when it equals one of these,
/// so one exact lookup per length finds every match without a prefix tree.
pub fn probes(candidate: &B256) -> impl Iterator<Item = StealthPrefix> + '_ {
    (MIN_PREFIX_BITS..=MAX_PREFIX_BITS)
        .map(move |bits| StealthPrefix::truncate(candidate, bits))
}

/// Every stealth subscription whose prefix is a prefix of `candidate`.
///
/// A route subscribed under several matching prefixes appears once per
/// entry. Callers deduplicate before sending.
pub fn match_stealth<'a>(
    index: &'a SubscriptionIndex<StealthPrefix>,
    candidate: &B256,
) -> impl Iterator<Item = &'a Subscription> + use<'a> {
    let probes: Vec<_> = probes(candidate).collect();
    probes.into_iter().flat_map(move |probe| index.find_by_value(&probe))
}

#[cfg(test)]
mod test {
    use super::*;
    use chainwatch_types::Route;
    use std::time::Instant;

    fn candidate(lead: &[u8]) -> B256 {
        let mut value = B256::repeat_byte(0x11);
        value[..lead.len()].copy_from_slice(lead);
        value
    }

    fn subscribe(index: &mut SubscriptionIndex<StealthPrefix>, bits: u8, blocks: &[u8], id: u32) {
        let prefix = StealthPrefix::new(bits, blocks).unwrap();
        index.insert(prefix, Subscription::new(Route::new(&b"r"[..], id), Instant::now()));
    }

    fn matched(index: &SubscriptionIndex<StealthPrefix>, value: &B256) -> Vec<u32> {
        let mut ids: Vec<_> = match_stealth(index, value).map(|s| s.route().id).collect();
        ids.sort_unstable();
        ids
    }

    #[test]
    fn one_probe_per_length() {
        let value = candidate(&[0xab, 0xcd, 0xef, 0x01]);
        let all: Vec<_> = probes(&value).collect();
        assert_eq!(all.len(), usize::from(MAX_PREFIX_BITS - MIN_PREFIX_BITS) + 1);
        assert!(all.iter().all(|p| p.matches(&value)));
        assert_eq!(all.first().map(StealthPrefix::bits), Some(MIN_PREFIX_BITS));
        assert_eq!(all.last().map(StealthPrefix::bits), Some(MAX_PREFIX_BITS));
    }

    #[test]
    fn finds_every_length() {
        let mut index = SubscriptionIndex::new();
        subscribe(&mut index, 8, &[0xab], 1);
        subscribe(&mut index, 13, &[0xab, 0xc8], 2);
        subscribe(&mut index, 24, &[0xab, 0xcd, 0xef], 3);
        subscribe(&mut index, 32, &[0xab, 0xcd, 0xef, 0x01], 4);
        subscribe(&mut index, 8, &[0xac], 5);

        assert_eq!(matched(&index, &candidate(&[0xab, 0xcd, 0xef, 0x01])), vec![1, 2, 3, 4]);
        assert_eq!(matched(&index, &candidate(&[0xab, 0xcd, 0xef, 0x02])), vec![1, 2, 3]);
        assert_eq!(matched(&index, &candidate(&[0xab, 0xcf])), vec![1, 2]);
        assert_eq!(matched(&index, &candidate(&[0xab, 0xd0])), vec![1]);
        assert_eq!(matched(&index, &candidate(&[0xac])), vec![5]);
        assert!(matched(&index, &candidate(&[0x00])).is_empty());
    }

    #[test]
    fn overlapping_prefixes_yield_each_entry() {
        let mut index = SubscriptionIndex::new();
        subscribe(&mut index, 8, &[0xab], 1);
        subscribe(&mut index, 16, &[0xab, 0xcd], 1);
        assert_eq!(matched(&index, &candidate(&[0xab, 0xcd])), vec![1, 1]);
    }
}
