#![allow(dead_code)]

use alloy_primitives::B256;
use chainwatch_config::NotifierConfig;
use chainwatch_notify::memory::Delivery;
use chainwatch_registry::SubscriptionRegistry;
use chainwatch_types::{Route, Transaction, TxOutput};
use crossbeam_channel::Receiver;
use std::{
    sync::Once,
    time::{Duration, Instant},
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Install a log subscriber once per test binary. Filter with `RUST_LOG`.
pub fn init_tracing() {
    static TRACING_INIT: Once = Once::new();
    TRACING_INIT.call_once(|| {
        tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();
    });
}

/// Config with a short poll interval so tests stop quickly.
pub fn test_config() -> NotifierConfig {
    let mut config = NotifierConfig::default();
    config.set_poll_interval(Duration::from_millis(10));
    config
}

/// A registry without a purge thread.
pub fn registry() -> SubscriptionRegistry {
    SubscriptionRegistry::without_purge(&test_config(), CancellationToken::new())
}

/// A subscriber route.
pub fn route(id: u32) -> Route {
    Route::new(&b"subscriber"[..], id)
}

/// A transaction paying `key`.
pub fn paying(key: B256) -> Transaction {
    Transaction { version: 1, outputs: vec![TxOutput::new(10_000, key)], stealth: vec![] }
}

/// A transaction with one stealth output whose first byte is `lead`.
pub fn stealth_tx(lead: u8, fill: u8) -> Transaction {
    let mut value = B256::repeat_byte(fill);
    value[0] = lead;
    Transaction { version: 1, outputs: vec![], stealth: vec![value] }
}

/// Receive `count` deliveries, failing after `timeout`.
pub fn expect_deliveries(
    rx: &Receiver<Delivery>,
    count: usize,
    timeout: Duration,
) -> Vec<Delivery> {
    let deadline = Instant::now() + timeout;
    let mut out = Vec::with_capacity(count);
    while out.len() < count {
        let left = deadline.saturating_duration_since(Instant::now());
        match rx.recv_timeout(left) {
            Ok(delivery) => out.push(delivery),
            Err(err) => panic!("expected {count} deliveries, got {}: {err}", out.len()),
        }
    }
    out
}

/// Assert nothing more arrives within `wait`.
pub fn expect_silence(rx: &Receiver<Delivery>, wait: Duration) {
    if let Ok(delivery) = rx.recv_timeout(wait) {
        panic!("unexpected delivery {delivery:?}");
    }
}
