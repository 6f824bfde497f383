use metrics::{Counter, counter, describe_counter};
use std::sync::LazyLock;

const SUBSCRIBED: &str = "chainwatch.registry.subscribed";
const SUBSCRIBED_HELP: &str = "Number of subscriptions registered or renewed";

const UNSUBSCRIBED: &str = "chainwatch.registry.unsubscribed";
const UNSUBSCRIBED_HELP: &str = "Number of subscriptions removed by request";

const PURGED: &str = "chainwatch.registry.subscriptions_purged";
const PURGED_HELP: &str = "Number of subscriptions removed by the purge cycle";

const REJECTED: &str = "chainwatch.registry.requests_rejected";
const REJECTED_HELP: &str = "Number of subscription requests answered with an error status";

static DESCRIBE: LazyLock<()> = LazyLock::new(|| {
    describe_counter!(SUBSCRIBED, SUBSCRIBED_HELP);
    describe_counter!(UNSUBSCRIBED, UNSUBSCRIBED_HELP);
    describe_counter!(PURGED, PURGED_HELP);
    describe_counter!(REJECTED, REJECTED_HELP);
});

fn subscribed() -> Counter {
    LazyLock::force(&DESCRIBE);
    counter!(SUBSCRIBED)
}

pub(crate) fn inc_subscribed() {
    subscribed().increment(1);
}

fn unsubscribed() -> Counter {
    LazyLock::force(&DESCRIBE);
    counter!(UNSUBSCRIBED)
}

pub(crate) fn record_unsubscribed(count: usize) {
    unsubscribed().increment(count as u64);
}

fn purged() -> Counter {
    LazyLock::force(&DESCRIBE);
    counter!(PURGED)
}

pub(crate) fn record_purged(count: usize) {
    purged().increment(count as u64);
}

fn rejected() -> Counter {
    LazyLock::force(&DESCRIBE);
    counter!(REJECTED)
}

pub(crate) fn inc_rejected() {
    rejected().increment(1);
}
