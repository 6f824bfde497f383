use crate::Feed;
use metrics::{Counter, counter, describe_counter};
use std::sync::LazyLock;

const RELAYED: &str = "chainwatch.relay.relayed";
const RELAYED_HELP: &str = "Number of frames relayed to push clients";

const SKIPPED: &str = "chainwatch.relay.skipped";
const SKIPPED_HELP: &str = "Number of malformed frames skipped by a relay";

static DESCRIBE: LazyLock<()> = LazyLock::new(|| {
    describe_counter!(RELAYED, RELAYED_HELP);
    describe_counter!(SKIPPED, SKIPPED_HELP);
});

fn relayed(feed: Feed) -> Counter {
    LazyLock::force(&DESCRIBE);
    counter!(RELAYED, "feed" => feed.name())
}

pub(crate) fn inc_relayed(feed: Feed) {
    relayed(feed).increment(1);
}

fn skipped(feed: Feed) -> Counter {
    LazyLock::force(&DESCRIBE);
    counter!(SKIPPED, "feed" => feed.name())
}

pub(crate) fn inc_skipped(feed: Feed) {
    skipped(feed).increment(1);
}
