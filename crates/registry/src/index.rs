//! Multi-map from match values to subscriptions, ordered by value and by age.

use chainwatch_types::Route;
use std::{
    collections::{BTreeSet, HashMap},
    hash::Hash,
    time::Instant,
};

/// One registered interest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    route: Route,
    created: Instant,
}

impl Subscription {
    /// Create a subscription for `route`, created at `created`.
    pub const fn new(route: Route, created: Instant) -> Self {
        Self { route, created }
    }

    /// Where notifications go.
    pub const fn route(&self) -> &Route {
        &self.route
    }

    /// When the subscription was registered.
    pub const fn created(&self) -> Instant {
        self.created
    }
}

/// Stable handle shared by both views. Handles are never reused.
type Handle = u64;

#[derive(Debug)]
struct Entry<V> {
    value: V,
    subscription: Subscription,
}

/// The subscriptions of one keyspace.
///
/// Entries are reachable by value, through [`Self::find_by_value`], and by
/// age, through [`Self::oldest_first`] and [`Self::remove_older_than`].
/// Both views hold the same handles into one entry table, and every mutation
/// updates all three structures before returning, so a caller holding the
/// index never sees an entry in one view but not the other.
///
/// Duplicates are allowed: many routes may share a value, and many entries
/// may share a creation instant. Entries with equal `created` are ordered by
/// insertion.
#[derive(Debug)]
pub struct SubscriptionIndex<V> {
    next_handle: Handle,
    entries: HashMap<Handle, Entry<V>>,
    by_value: HashMap<V, BTreeSet<Handle>>,
    by_age: BTreeSet<(Instant, Handle)>,
}

impl<V> Default for SubscriptionIndex<V> {
    fn default() -> Self {
        Self {
            next_handle: 0,
            entries: HashMap::new(),
            by_value: HashMap::new(),
            by_age: BTreeSet::new(),
        }
    }
}

impl<V> SubscriptionIndex<V>
where
    V: Hash + Eq + Clone,
{
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the index holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of distinct values with at least one entry.
    pub fn value_count(&self) -> usize {
        self.by_value.len()
    }

    /// Add an entry.
    pub fn insert(&mut self, value: V, subscription: Subscription) {
        let handle = self.next_handle;
        self.next_handle += 1;

        self.by_age.insert((subscription.created, handle));
        self.by_value.entry(value.clone()).or_default().insert(handle);
        self.entries.insert(handle, Entry { value, subscription });
    }

    /// Remove every entry for `value` sent to `route`. Returns the number
    /// removed, which is zero if there were none.
    pub fn remove(&mut self, value: &V, route: &Route) -> usize {
        let Some(handles) = self.by_value.get_mut(value) else { return 0 };

        let entries = &mut self.entries;
        let by_age = &mut self.by_age;
        let before = handles.len();
        handles.retain(|handle| {
            let Some(entry) = entries.get(handle) else { return false };
            if entry.subscription.route != *route {
                return true;
            }
            by_age.remove(&(entry.subscription.created, *handle));
            entries.remove(handle);
            false
        });
        let removed = before - handles.len();

        if handles.is_empty() {
            self.by_value.remove(value);
        }
        removed
    }

    /// True if an entry exists for `value` sent to `route`.
    pub fn contains(&self, value: &V, route: &Route) -> bool {
        self.find_by_value(value).any(|sub| sub.route == *route)
    }

    /// All subscriptions for `value`, in insertion order.
    pub fn find_by_value<'a>(
        &'a self,
        value: &V,
    ) -> impl Iterator<Item = &'a Subscription> + use<'a, V> {
        self.by_value
            .get(value)
            .into_iter()
            .flatten()
            .filter_map(|handle| self.entries.get(handle))
            .map(|entry| &entry.subscription)
    }

    /// All entries, oldest first.
    pub fn oldest_first(&self) -> impl Iterator<Item = (&V, &Subscription)> + '_ {
        self.by_age
            .iter()
            .filter_map(|(_, handle)| self.entries.get(handle))
            .map(|entry| (&entry.value, &entry.subscription))
    }

    /// Remove every entry created before `cutoff`. Returns the number
    /// removed.
    pub fn remove_older_than(&mut self, cutoff: Instant) -> usize {
        self.remove_older_than_bounded(cutoff, usize::MAX)
    }

    /// Remove at most `limit` of the oldest entries created before
    /// `cutoff`. Returns the number removed; a result below `limit` means
    /// no entry older than `cutoff` remains.
    pub fn remove_older_than_bounded(&mut self, cutoff: Instant, limit: usize) -> usize {
        let mut removed = 0;
        while removed < limit {
            let Some(&(created, handle)) = self.by_age.first() else { break };
            if created >= cutoff {
                break;
            }
            self.by_age.pop_first();
            self.detach(handle);
            removed += 1;
        }
        removed
    }

    /// Drop `handle` from the entry table and the value view. The caller
    /// has already removed it from the age view.
    fn detach(&mut self, handle: Handle) {
        let Some(entry) = self.entries.remove(&handle) else { return };
        if let Some(handles) = self.by_value.get_mut(&entry.value) {
            handles.remove(&handle);
            if handles.is_empty() {
                self.by_value.remove(&entry.value);
            }
        }
    }

    /// Check that the three structures describe the same entry set.
    #[cfg(test)]
    pub(crate) fn assert_consistent(&self) {
        assert_eq!(self.entries.len(), self.by_age.len());
        assert_eq!(self.entries.len(), self.by_value.values().map(BTreeSet::len).sum::<usize>());
        for (created, handle) in &self.by_age {
            assert_eq!(self.entries[handle].subscription.created, *created);
        }
        for (value, handles) in &self.by_value {
            assert!(!handles.is_empty());
            for handle in handles {
                assert!(self.entries[handle].value == *value);
            }
        }
    }
}
