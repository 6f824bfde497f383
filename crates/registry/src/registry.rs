use crate::{Subscription, SubscriptionIndex, matcher, metrics, purge::PurgeTask};
use alloy_primitives::B256;
use chainwatch_config::NotifierConfig;
use chainwatch_types::{Route, StatusCode, StealthPrefix};
use parking_lot::{RwLock, RwLockUpgradableReadGuard};
use std::{
    hash::Hash,
    sync::Arc,
    thread::JoinHandle,
    time::{Duration, Instant},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// Subscriptions removed by one purge pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PurgeReport {
    /// Payment key subscriptions removed.
    pub keys: usize,
    /// Stealth prefix subscriptions removed.
    pub stealth: usize,
}

impl PurgeReport {
    /// Total removed.
    pub const fn total(&self) -> usize {
        self.keys + self.stealth
    }
}

/// Shared handle to the live subscription set.
///
/// Cloning is cheap and every clone sees the same subscriptions. Creating a
/// registry with [`Self::new`] starts a background thread that purges
/// expired subscriptions. The thread holds a [`Weak`] reference and exits
/// once the last clone is dropped or the stop token is cancelled.
///
/// [`Weak`]: std::sync::Weak
#[derive(Clone)]
pub struct SubscriptionRegistry {
    inner: Arc<RegistryInner>,
    purge: Option<Arc<JoinHandle<()>>>,
}

impl SubscriptionRegistry {
    /// Create a registry and start its purge thread.
    pub fn new(config: &NotifierConfig, token: CancellationToken) -> Self {
        let mut this = Self::without_purge(config, token.clone());
        this.purge = PurgeTask::new(
            Arc::downgrade(&this.inner),
            config.purge_interval(),
            config.poll_interval(),
            token,
        )
        .spawn()
        .map(Arc::new);
        this
    }

    /// Create a registry without a purge thread. Expired subscriptions are
    /// only removed by calls to [`RegistryInner::purge_expired`] or
    /// [`RegistryInner::purge_older_than`].
    pub fn without_purge(config: &NotifierConfig, token: CancellationToken) -> Self {
        let inner = RegistryInner {
            keys: RwLock::new(SubscriptionIndex::new()),
            stealth: RwLock::new(SubscriptionIndex::new()),
            expiration: config.subscription_expiration(),
            purge_batch_size: config.purge_batch_size(),
            token,
        };
        Self { inner: Arc::new(inner), purge: None }
    }

    /// True while the purge thread is running. Always false for a registry
    /// created with [`Self::without_purge`].
    pub fn purge_running(&self) -> bool {
        self.purge.as_ref().is_some_and(|thread| !thread.is_finished())
    }
}

impl core::ops::Deref for SubscriptionRegistry {
    type Target = RegistryInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl core::fmt::Debug for SubscriptionRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SubscriptionRegistry")
            .field("keys", &self.key_count())
            .field("stealth", &self.stealth_count())
            .field("purge_running", &self.purge_running())
            .finish_non_exhaustive()
    }
}

/// Inner logic for [`SubscriptionRegistry`].
///
/// Each keyspace has its own lock, so key lookups never wait on stealth
/// writers and the other way round. Lookups take a shared lock. Subscribe
/// calls take an upgradable lock and only upgrade when they mutate, so an
/// unsubscribe for an absent entry never blocks lookups.
#[derive(Debug)]
pub struct RegistryInner {
    keys: RwLock<SubscriptionIndex<B256>>,
    stealth: RwLock<SubscriptionIndex<StealthPrefix>>,
    expiration: Duration,
    purge_batch_size: usize,
    token: CancellationToken,
}

impl RegistryInner {
    /// Add, renew or remove a payment key subscription.
    ///
    /// Subscribing an existing (key, route) pair replaces the entry with a
    /// fresh one, restarting its lifetime. Unsubscribing an absent pair
    /// succeeds without change. Once the stop token is cancelled every call
    /// returns [`StatusCode::ServiceStopped`].
    pub fn subscribe_key(&self, route: Route, key: B256, unsubscribe: bool) -> StatusCode {
        if self.is_stopped() {
            return StatusCode::ServiceStopped;
        }
        trace!(%route, %key, unsubscribe, "key subscription");
        Self::update(&self.keys, key, route, unsubscribe);
        StatusCode::Success
    }

    /// Add, renew or remove a stealth prefix subscription. Same rules as
    /// [`Self::subscribe_key`].
    pub fn subscribe_stealth(
        &self,
        route: Route,
        prefix: StealthPrefix,
        unsubscribe: bool,
    ) -> StatusCode {
        if self.is_stopped() {
            return StatusCode::ServiceStopped;
        }
        trace!(%route, %prefix, unsubscribe, "stealth subscription");
        Self::update(&self.stealth, prefix, route, unsubscribe);
        StatusCode::Success
    }

    fn update<V>(index: &RwLock<SubscriptionIndex<V>>, value: V, route: Route, unsubscribe: bool)
    where
        V: Hash + Eq + Clone,
    {
        let guard = index.upgradable_read();
        let present = guard.contains(&value, &route);
        if unsubscribe && !present {
            return;
        }

        let mut guard = RwLockUpgradableReadGuard::upgrade(guard);
        if present {
            let removed = guard.remove(&value, &route);
            if unsubscribe {
                metrics::record_unsubscribed(removed);
            }
        }
        if !unsubscribe {
            guard.insert(value, Subscription::new(route, Instant::now()));
            metrics::inc_subscribed();
        }
    }

    /// Routes subscribed to `key`, one per entry.
    pub fn key_routes(&self, key: &B256) -> Vec<Route> {
        self.keys.read().find_by_value(key).map(|sub| sub.route().clone()).collect()
    }

    /// Routes subscribed to a prefix of `candidate`, one per entry.
    pub fn stealth_routes(&self, candidate: &B256) -> Vec<Route> {
        let index = self.stealth.read();
        matcher::match_stealth(&index, candidate).map(|sub| sub.route().clone()).collect()
    }

    /// Remove subscriptions older than the configured lifetime.
    ///
    /// Each keyspace computes its own cutoff from a separate clock read and
    /// is purged under its own lock, never both at once.
    pub fn purge_expired(&self) -> PurgeReport {
        let keys = Instant::now()
            .checked_sub(self.expiration)
            .map_or(0, |cutoff| self.purge_index(&self.keys, cutoff));
        let stealth = Instant::now()
            .checked_sub(self.expiration)
            .map_or(0, |cutoff| self.purge_index(&self.stealth, cutoff));
        let report = PurgeReport { keys, stealth };
        if report.total() > 0 {
            debug!(keys, stealth, "purged expired subscriptions");
        }
        report
    }

    /// Remove subscriptions created before `cutoff` from both keyspaces.
    pub fn purge_older_than(&self, cutoff: Instant) -> PurgeReport {
        PurgeReport {
            keys: self.purge_index(&self.keys, cutoff),
            stealth: self.purge_index(&self.stealth, cutoff),
        }
    }

    /// Remove in batches, releasing the write lock between batches so
    /// lookups are held up by at most one batch.
    fn purge_index<V>(&self, index: &RwLock<SubscriptionIndex<V>>, cutoff: Instant) -> usize
    where
        V: Hash + Eq + Clone,
    {
        let batch = self.purge_batch_size.max(1);
        let mut total = 0;
        loop {
            let removed = index.write().remove_older_than_bounded(cutoff, batch);
            total += removed;
            if removed < batch {
                break;
            }
        }
        metrics::record_purged(total);
        total
    }

    /// Number of payment key subscriptions.
    pub fn key_count(&self) -> usize {
        self.keys.read().len()
    }

    /// Number of stealth prefix subscriptions.
    pub fn stealth_count(&self) -> usize {
        self.stealth.read().len()
    }

    /// True if neither keyspace has a subscription.
    pub fn is_empty(&self) -> bool {
        self.keys.read().is_empty() && self.stealth.read().is_empty()
    }

    /// Subscription lifetime.
    pub const fn expiration(&self) -> Duration {
        self.expiration
    }

    /// True once the stop token has been cancelled.
    pub fn is_stopped(&self) -> bool {
        self.token.is_cancelled()
    }

    /// The stop token shared with the purge thread.
    pub const fn token(&self) -> &CancellationToken {
        &self.token
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn registry() -> SubscriptionRegistry {
        SubscriptionRegistry::without_purge(&NotifierConfig::default(), CancellationToken::new())
    }

    fn route(id: u32) -> Route {
        Route::new(&b"client"[..], id)
    }

    #[test]
    fn subscribe_and_unsubscribe_key() {
        let registry = registry();
        let key = B256::ZERO;

        assert_eq!(registry.subscribe_key(route(1), key, false), StatusCode::Success);
        assert_eq!(registry.key_routes(&key), vec![route(1)]);

        assert_eq!(registry.subscribe_key(route(1), key, true), StatusCode::Success);
        assert!(registry.key_routes(&key).is_empty());
        assert!(registry.is_empty());

        // absent pair
        assert_eq!(registry.subscribe_key(route(1), key, true), StatusCode::Success);
        assert!(registry.is_empty());
    }

    #[test]
    fn resubscribe_renews() {
        let registry = registry();
        let key = B256::repeat_byte(1);

        registry.subscribe_key(route(1), key, false);
        let first = registry.keys.read().find_by_value(&key).next().map(Subscription::created);
        std::thread::sleep(Duration::from_millis(5));
        registry.subscribe_key(route(1), key, false);
        let second = registry.keys.read().find_by_value(&key).next().map(Subscription::created);

        assert_eq!(registry.key_count(), 1);
        assert!(second > first);
        registry.keys.read().assert_consistent();
    }

    #[test]
    fn keyspaces_are_independent() {
        let registry = registry();
        let value = B256::repeat_byte(0xab);
        let prefix = StealthPrefix::new(8, &[0xab]).unwrap();

        registry.subscribe_stealth(route(1), prefix, false);
        assert!(registry.key_routes(&value).is_empty());
        assert_eq!(registry.stealth_routes(&value), vec![route(1)]);
        assert_eq!(registry.key_count(), 0);
        assert_eq!(registry.stealth_count(), 1);
        assert!(!registry.is_empty());
    }

    #[test]
    fn stopped_registry_refuses() {
        let token = CancellationToken::new();
        let registry =
            SubscriptionRegistry::without_purge(&NotifierConfig::default(), token.clone());
        token.cancel();
        let status = registry.subscribe_key(route(1), B256::ZERO, false);
        assert_eq!(status, StatusCode::ServiceStopped);
        assert!(registry.is_empty());
    }

    #[test]
    fn purge_in_batches() {
        let mut config = NotifierConfig::default();
        config.set_purge_batch_size(3);
        let registry = SubscriptionRegistry::without_purge(&config, CancellationToken::new());

        for i in 0..10 {
            registry.subscribe_key(route(i), B256::with_last_byte(i as u8), false);
        }
        let prefix = StealthPrefix::new(8, &[1]).unwrap();
        registry.subscribe_stealth(route(0), prefix, false);

        let cutoff = Instant::now() + Duration::from_millis(1);
        let report = registry.purge_older_than(cutoff);
        assert_eq!(report, PurgeReport { keys: 10, stealth: 1 });
        assert!(registry.is_empty());
        registry.keys.read().assert_consistent();
    }

    #[test]
    fn purge_keeps_fresh_entries() {
        let registry = registry();
        registry.subscribe_key(route(1), B256::ZERO, false);
        std::thread::sleep(Duration::from_millis(2));
        let cutoff = Instant::now();
        std::thread::sleep(Duration::from_millis(2));
        registry.subscribe_key(route(2), B256::ZERO, false);

        assert_eq!(registry.purge_older_than(cutoff).total(), 1);
        assert_eq!(registry.key_routes(&B256::ZERO), vec![route(2)]);
        assert_eq!(registry.purge_expired().total(), 0);
    }
}
