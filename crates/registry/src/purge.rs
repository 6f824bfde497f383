use crate::RegistryInner;
use std::{
    sync::Weak,
    thread::JoinHandle,
    time::{Duration, Instant},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, trace};

/// Task that periodically removes expired subscriptions.
///
/// Runs on its own OS thread. The thread sleeps in slices of at most the
/// poll interval so that cancellation, or the registry being dropped, is
/// noticed promptly even with a long purge interval.
#[derive(Debug)]
pub(crate) struct PurgeTask {
    inner: Weak<RegistryInner>,
    interval: Duration,
    poll: Duration,
    token: CancellationToken,
}

impl PurgeTask {
    /// Create a new purge task.
    pub(crate) const fn new(
        inner: Weak<RegistryInner>,
        interval: Duration,
        poll: Duration,
        token: CancellationToken,
    ) -> Self {
        Self { inner, interval, poll, token }
    }

    /// True if the registry is gone or the service is stopping.
    fn finished(&self) -> bool {
        self.token.is_cancelled() || self.inner.strong_count() == 0
    }

    /// Sleep until the next purge is due. Returns false if the task should
    /// exit instead.
    fn wait(&self) -> bool {
        let deadline = Instant::now() + self.interval;
        loop {
            if self.finished() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            std::thread::sleep(self.poll.min(deadline - now));
        }
    }

    fn run(self) {
        debug!(interval = ?self.interval, "purge task started");
        while self.wait() {
            let Some(inner) = self.inner.upgrade() else { break };
            let report = inner.purge_expired();
            trace!(keys = report.keys, stealth = report.stealth, "purge pass complete");
        }
        debug!("purge task stopped");
    }

    /// Run the task on a dedicated thread. Returns `None` if the thread
    /// could not be spawned.
    pub(crate) fn spawn(self) -> Option<JoinHandle<()>> {
        std::thread::Builder::new()
            .name("subscription-purge".into())
            .spawn(move || self.run())
            .inspect_err(|err| {
                error!(%err, "failed to spawn purge thread, expired subscriptions stay");
            })
            .ok()
    }
}
