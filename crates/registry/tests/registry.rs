//! Integration tests for the subscription registry: concurrent access from
//! many threads and the background purge thread.

use alloy_primitives::B256;
use chainwatch_config::NotifierConfig;
use chainwatch_registry::SubscriptionRegistry;
use chainwatch_types::{Route, StatusCode, StealthPrefix};
use std::{
    sync::Once,
    thread,
    time::{Duration, Instant},
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

fn init_tracing() {
    static TRACING_INIT: Once = Once::new();
    TRACING_INIT.call_once(|| {
        tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();
    });
}

fn route(thread: u32, id: u32) -> Route {
    Route::new(thread.to_be_bytes().to_vec(), id)
}

fn thread_key(thread: u32, slot: u32) -> B256 {
    let mut key = B256::ZERO;
    key[..4].copy_from_slice(&thread.to_be_bytes());
    key[28..].copy_from_slice(&slot.to_be_bytes());
    key
}

fn wait_until(timeout: Duration, mut done: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if done() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    done()
}

// ---------------------------------------------------------------------------
// Concurrency
// ---------------------------------------------------------------------------

#[test]
fn concurrent_operations_on_disjoint_values() {
    init_tracing();

    const THREADS: u32 = 8;
    const SLOTS: u32 = 16;
    const ROUNDS: u32 = 200;

    let registry =
        SubscriptionRegistry::without_purge(&NotifierConfig::default(), CancellationToken::new());

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let registry = registry.clone();
            thread::spawn(move || {
                // live[slot][id] tracks what this thread believes is subscribed
                let mut live = vec![[false; 4]; SLOTS as usize];
                for round in 0..ROUNDS {
                    let slot = (round * 7 + t) % SLOTS;
                    let id = round % 4;
                    let key = thread_key(t, slot);
                    let unsubscribe = round % 3 == 0;
                    let status = registry.subscribe_key(route(t, id), key, unsubscribe);
                    assert_eq!(status, StatusCode::Success);
                    live[slot as usize][id as usize] = !unsubscribe;

                    // readers run against writers on other values
                    let found = registry.key_routes(&key).len();
                    let expected = live[slot as usize].iter().filter(|l| **l).count();
                    assert_eq!(found, expected);
                }
                live
            })
        })
        .collect();

    let mut total = 0;
    for (t, handle) in handles.into_iter().enumerate() {
        let live = handle.join().unwrap();
        for (slot, ids) in live.iter().enumerate() {
            let key = thread_key(t as u32, slot as u32);
            let mut found = registry.key_routes(&key);
            found.sort();
            let expected: Vec<_> = ids
                .iter()
                .enumerate()
                .filter(|(_, l)| **l)
                .map(|(id, _)| route(t as u32, id as u32))
                .collect();
            assert_eq!(found, expected);
            total += expected.len();
        }
    }
    assert_eq!(registry.key_count(), total);
}

#[test]
fn concurrent_keyspaces() {
    init_tracing();

    let registry =
        SubscriptionRegistry::without_purge(&NotifierConfig::default(), CancellationToken::new());
    let candidate = B256::repeat_byte(0xab);

    let writer = {
        let registry = registry.clone();
        thread::spawn(move || {
            for id in 0..500 {
                let prefix = StealthPrefix::truncate(&candidate, 8 + (id % 25) as u8);
                registry.subscribe_stealth(route(0, id), prefix, false);
            }
        })
    };
    let reader = {
        let registry = registry.clone();
        thread::spawn(move || {
            let mut last = 0;
            while last < 500 {
                let now = registry.stealth_routes(&candidate).len();
                assert!(now >= last);
                last = now;
            }
        })
    };

    writer.join().unwrap();
    reader.join().unwrap();
    assert_eq!(registry.stealth_count(), 500);
    assert_eq!(registry.key_count(), 0);
}

// ---------------------------------------------------------------------------
// Purge thread
// ---------------------------------------------------------------------------

fn short_lived_config() -> NotifierConfig {
    let mut config = NotifierConfig::default();
    config.set_subscription_expiration(Duration::from_millis(50));
    config.set_purge_interval(Duration::from_millis(20));
    config.set_poll_interval(Duration::from_millis(5));
    config
}

#[test]
fn purge_thread_removes_expired() {
    init_tracing();

    let registry = SubscriptionRegistry::new(&short_lived_config(), CancellationToken::new());
    registry.subscribe_key(route(0, 1), B256::ZERO, false);
    registry.subscribe_stealth(route(0, 2), StealthPrefix::new(8, &[1]).unwrap(), false);
    assert!(!registry.is_empty());

    assert!(wait_until(Duration::from_secs(5), || registry.is_empty()));
}

#[test]
fn purge_thread_stops_with_token() {
    init_tracing();

    let token = CancellationToken::new();
    let registry = SubscriptionRegistry::new(&short_lived_config(), token.clone());
    assert!(registry.purge_running());

    token.cancel();
    assert!(wait_until(Duration::from_secs(5), || !registry.purge_running()));

    // refused once stopped
    assert_eq!(
        registry.subscribe_key(route(0, 1), B256::ZERO, false),
        StatusCode::ServiceStopped
    );
    assert!(registry.is_empty());
}

#[test]
fn registry_without_purge_has_no_thread() {
    let registry =
        SubscriptionRegistry::without_purge(&short_lived_config(), CancellationToken::new());
    assert!(!registry.purge_running());
}
