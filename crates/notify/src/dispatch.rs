use crate::{ReplySink, metrics};
use chainwatch_registry::SubscriptionRegistry;
use chainwatch_types::{
    Block, Event, Notification, NotificationKind, Route, Transaction, UNCONFIRMED_HEIGHT,
};
use std::{collections::BTreeMap, ops::AddAssign};
use tracing::{debug, instrument, trace, warn};

/// Outcome of dispatching one or more events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Transactions scanned.
    pub transactions: usize,
    /// Notifications sent.
    pub sent: usize,
    /// Notifications that failed to send.
    pub failed: usize,
}

impl AddAssign for DispatchReport {
    fn add_assign(&mut self, rhs: Self) {
        self.transactions += rhs.transactions;
        self.sent += rhs.sent;
        self.failed += rhs.failed;
    }
}

/// Matches chain events against the registry and sends notifications.
///
/// Events are handled one at a time in the order given. For each
/// transaction, every subscriber matched through its payment keys or
/// stealth values is notified once, even if several of its subscriptions
/// match. A subscriber matched through both keyspaces receives the key
/// notification.
#[derive(Debug)]
pub struct Dispatcher<S> {
    registry: SubscriptionRegistry,
    sink: S,
}

impl<S: ReplySink> Dispatcher<S> {
    /// Create a dispatcher sending through `sink`.
    pub const fn new(registry: SubscriptionRegistry, sink: S) -> Self {
        Self { registry, sink }
    }

    /// The registry consulted for matches.
    pub const fn registry(&self) -> &SubscriptionRegistry {
        &self.registry
    }

    /// Release the sink.
    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Mutable access to the sink.
    pub const fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Dispatch a decoded event frame.
    pub fn handle_event(&mut self, event: &Event) -> DispatchReport {
        match event {
            Event::Block(event) => self.notify_block(event.height, &event.block),
            Event::Transaction(event) => self.notify_transaction(&event.transaction),
        }
    }

    /// Notify subscribers of every transaction in a block confirmed at
    /// `height`.
    #[instrument(skip_all, fields(height = height, txns = block.transactions.len()))]
    pub fn notify_block(&mut self, height: u32, block: &Block) -> DispatchReport {
        let mut report = DispatchReport::default();
        if self.registry.is_empty() {
            trace!("no subscriptions");
            return report;
        }
        for tx in &block.transactions {
            report += self.notify(height, tx);
        }
        debug!(sent = report.sent, failed = report.failed, "block dispatched");
        report
    }

    /// Notify subscribers of a transaction accepted into the pool.
    #[instrument(skip_all, fields(outputs = tx.outputs.len(), stealth = tx.stealth.len()))]
    pub fn notify_transaction(&mut self, tx: &Transaction) -> DispatchReport {
        if self.registry.is_empty() {
            trace!("no subscriptions");
            return DispatchReport::default();
        }
        self.notify(UNCONFIRMED_HEIGHT, tx)
    }

    /// Notify subscribers of the blocks connected by a reorganization.
    ///
    /// `incoming` holds the new branch in order, the first block at
    /// `fork_height + 1`. Transactions of the displaced branch are not
    /// notified again. Blocks whose height would overflow or reach
    /// [`UNCONFIRMED_HEIGHT`] are not notified.
    #[instrument(skip_all, fields(fork_height = fork_height, incoming = incoming.len()))]
    pub fn notify_reorganization(
        &mut self,
        fork_height: u32,
        incoming: &[Block],
    ) -> DispatchReport {
        let mut report = DispatchReport::default();
        for (offset, block) in incoming.iter().enumerate() {
            let Some(height) = branch_height(fork_height, offset) else {
                warn!(offset, skipped = incoming.len() - offset, "reorganization height overflow");
                break;
            };
            report += self.notify_block(height, block);
        }
        report
    }

    /// The routes to notify for `tx`, each with the keyspace that matched.
    pub fn matches(&self, tx: &Transaction) -> BTreeMap<Route, NotificationKind> {
        let mut matched = BTreeMap::new();
        for key in tx.payment_keys() {
            for route in self.registry.key_routes(key) {
                matched.insert(route, NotificationKind::Key);
            }
        }
        for candidate in &tx.stealth {
            for route in self.registry.stealth_routes(candidate) {
                matched.entry(route).or_insert(NotificationKind::Stealth);
            }
        }
        matched
    }

    fn notify(&mut self, height: u32, tx: &Transaction) -> DispatchReport {
        let mut report = DispatchReport { transactions: 1, ..Default::default() };
        let matched = self.matches(tx);
        if matched.is_empty() {
            return report;
        }

        let tx_hash = tx.hash();
        for (route, kind) in matched {
            let notification = Notification::success(kind, height, tx_hash);
            match self.sink.send(&route, &notification) {
                Ok(()) => {
                    trace!(%route, %tx_hash, command = kind.command(), "notified");
                    report.sent += 1;
                }
                Err(err) => {
                    warn!(%err, %route, %tx_hash, "failed to send notification");
                    report.failed += 1;
                }
            }
        }
        metrics::record_dispatch(&report);
        report
    }
}

/// Height of the block `offset` places after the first block of a branch
/// forked at `fork_height`.
fn branch_height(fork_height: u32, offset: usize) -> Option<u32> {
    let offset = u32::try_from(offset).ok()?;
    fork_height
        .checked_add(1)?
        .checked_add(offset)
        .filter(|height| *height != UNCONFIRMED_HEIGHT)
}
