use crate::DispatchReport;
use metrics::{Counter, counter, describe_counter};
use std::sync::LazyLock;

const FRAMES_RECEIVED: &str = "chainwatch.notify.frames_received";
const FRAMES_RECEIVED_HELP: &str = "Number of event frames received";

const FRAMES_SKIPPED: &str = "chainwatch.notify.frames_skipped";
const FRAMES_SKIPPED_HELP: &str = "Number of malformed event frames skipped";

const SEQUENCE_GAPS: &str = "chainwatch.notify.sequence_gaps";
const SEQUENCE_GAPS_HELP: &str = "Number of gaps observed in event sequence numbers";

const NOTIFICATIONS_SENT: &str = "chainwatch.notify.notifications_sent";
const NOTIFICATIONS_SENT_HELP: &str = "Number of notifications sent";

const NOTIFICATIONS_FAILED: &str = "chainwatch.notify.notifications_failed";
const NOTIFICATIONS_FAILED_HELP: &str = "Number of notifications that failed to send";

const REQUESTS: &str = "chainwatch.notify.requests";
const REQUESTS_HELP: &str = "Number of subscription requests routed";

static DESCRIBE: LazyLock<()> = LazyLock::new(|| {
    describe_counter!(FRAMES_RECEIVED, FRAMES_RECEIVED_HELP);
    describe_counter!(FRAMES_SKIPPED, FRAMES_SKIPPED_HELP);
    describe_counter!(SEQUENCE_GAPS, SEQUENCE_GAPS_HELP);
    describe_counter!(NOTIFICATIONS_SENT, NOTIFICATIONS_SENT_HELP);
    describe_counter!(NOTIFICATIONS_FAILED, NOTIFICATIONS_FAILED_HELP);
    describe_counter!(REQUESTS, REQUESTS_HELP);
});

fn frames_received() -> Counter {
    LazyLock::force(&DESCRIBE);
    counter!(FRAMES_RECEIVED)
}

pub(crate) fn inc_frames_received() {
    frames_received().increment(1);
}

fn frames_skipped() -> Counter {
    LazyLock::force(&DESCRIBE);
    counter!(FRAMES_SKIPPED)
}

pub(crate) fn inc_frames_skipped() {
    frames_skipped().increment(1);
}

fn sequence_gaps() -> Counter {
    LazyLock::force(&DESCRIBE);
    counter!(SEQUENCE_GAPS)
}

pub(crate) fn inc_sequence_gaps() {
    sequence_gaps().increment(1);
}

fn notifications_sent() -> Counter {
    LazyLock::force(&DESCRIBE);
    counter!(NOTIFICATIONS_SENT)
}

fn notifications_failed() -> Counter {
    LazyLock::force(&DESCRIBE);
    counter!(NOTIFICATIONS_FAILED)
}

pub(crate) fn record_dispatch(report: &DispatchReport) {
    notifications_sent().increment(report.sent as u64);
    if report.failed > 0 {
        notifications_failed().increment(report.failed as u64);
    }
}

fn requests(command: &'static str) -> Counter {
    LazyLock::force(&DESCRIBE);
    counter!(REQUESTS, "command" => command)
}

pub(crate) fn inc_requests(command: &'static str) {
    requests(command).increment(1);
}
