use crate::{Dispatcher, EventSource, ReplySink, TransportError, metrics};
use chainwatch_config::NotifierConfig;
use chainwatch_registry::SubscriptionRegistry;
use chainwatch_types::Event;
use std::{ops::ControlFlow, thread::JoinHandle, time::Duration};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Errors starting a worker.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    /// The worker thread could not be spawned.
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),
    /// The worker's setup failed. The worker exited without serving.
    #[error("worker setup failed: {0}")]
    Setup(#[source] TransportError),
    /// The worker thread panicked during setup.
    #[error("worker thread panicked during setup")]
    Panicked,
}

/// A blocking service loop run on a dedicated thread by [`WorkerHandle`].
pub trait Worker: Send + 'static {
    /// Thread name, also used in logs.
    fn name(&self) -> &'static str;

    /// Prepare to serve. Runs on the worker thread before the first poll.
    /// On error the worker exits without serving.
    fn setup(&mut self) -> Result<(), TransportError> {
        Ok(())
    }

    /// Wait for and process at most one message. Implementations block no
    /// longer than their poll interval and check `token` before processing
    /// what they received.
    fn poll(&mut self, token: &CancellationToken) -> ControlFlow<()>;

    /// Release transport resources. Runs once after the last poll.
    fn teardown(&mut self) -> Result<(), TransportError>;
}

/// Owns a running [`Worker`] thread.
#[derive(Debug)]
pub struct WorkerHandle {
    name: &'static str,
    token: CancellationToken,
    thread: JoinHandle<bool>,
}

impl WorkerHandle {
    /// Spawn `worker` on its own thread and wait for its setup to finish.
    ///
    /// The worker stops when `token` or the handle's own child token is
    /// cancelled. Fails if the thread cannot be spawned or setup fails.
    pub fn start<W: Worker>(
        mut worker: W,
        token: &CancellationToken,
    ) -> Result<Self, WorkerError> {
        let name = worker.name();
        let token = token.child_token();
        let (started_tx, started_rx) = crossbeam_channel::bounded(1);

        let thread_token = token.clone();
        let thread = std::thread::Builder::new().name(name.into()).spawn(move || {
            if let Err(err) = worker.setup() {
                error!(worker = name, %err, "worker setup failed");
                let _ = started_tx.send(Err(err));
                return false;
            }
            let _ = started_tx.send(Ok(()));
            info!(worker = name, "worker started");

            while !thread_token.is_cancelled() {
                if worker.poll(&thread_token).is_break() {
                    break;
                }
            }

            let success = match worker.teardown() {
                Ok(()) => true,
                Err(err) => {
                    error!(worker = name, %err, "worker failed to disconnect");
                    false
                }
            };
            info!(worker = name, success, "worker stopped");
            success
        })?;

        match started_rx.recv() {
            Ok(Ok(())) => Ok(Self { name, token, thread }),
            Ok(Err(err)) => {
                let _ = thread.join();
                Err(WorkerError::Setup(err))
            }
            Err(_) => {
                let _ = thread.join();
                Err(WorkerError::Panicked)
            }
        }
    }

    /// The worker's name.
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// True once the worker loop has exited.
    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Signal the worker to stop, wait for it, and return whether it shut
    /// down cleanly.
    pub fn stop(self) -> bool {
        self.token.cancel();
        match self.thread.join() {
            Ok(success) => success,
            Err(_) => {
                error!(worker = self.name, "worker thread panicked");
                false
            }
        }
    }
}

/// Feeds chain events from an [`EventSource`] to a [`Dispatcher`].
///
/// Frames that fail to decode are logged and skipped. A gap in the
/// publisher's sequence numbers is logged, since it means events were lost
/// upstream, but dispatch continues.
#[derive(Debug)]
pub struct NotificationWorker<E, S> {
    source: E,
    dispatcher: Dispatcher<S>,
    poll_interval: Duration,
    last_sequence: Option<u16>,
}

impl<E, S> NotificationWorker<E, S>
where
    E: EventSource,
    S: ReplySink,
{
    /// Create a worker reading `source` and notifying through `sink`.
    pub const fn new(
        config: &NotifierConfig,
        registry: SubscriptionRegistry,
        source: E,
        sink: S,
    ) -> Self {
        Self {
            source,
            dispatcher: Dispatcher::new(registry, sink),
            poll_interval: config.poll_interval(),
            last_sequence: None,
        }
    }

    /// The dispatcher. Only reachable before the worker is started; once
    /// running, reorganizations go through a [`Dispatcher`] the caller owns.
    pub const fn dispatcher_mut(&mut self) -> &mut Dispatcher<S> {
        &mut self.dispatcher
    }

    fn check_sequence(&mut self, sequence: u16) {
        if let Some(last) = self.last_sequence.replace(sequence) {
            let expected = last.wrapping_add(1);
            if sequence != expected {
                warn!(expected, received = sequence, "event sequence gap");
                metrics::inc_sequence_gaps();
            }
        }
    }
}

impl<E, S> Worker for NotificationWorker<E, S>
where
    E: EventSource + 'static,
    S: ReplySink + 'static,
{
    fn name(&self) -> &'static str {
        "notification-worker"
    }

    fn poll(&mut self, token: &CancellationToken) -> ControlFlow<()> {
        let frame = match self.source.receive(self.poll_interval) {
            Ok(Some(frame)) => frame,
            Ok(None) => return ControlFlow::Continue(()),
            Err(err @ (TransportError::Closed | TransportError::Disconnected)) => {
                warn!(%err, "event source gone");
                return ControlFlow::Break(());
            }
            Err(err) => {
                warn!(%err, "failed to receive event");
                std::thread::sleep(self.poll_interval);
                return ControlFlow::Continue(());
            }
        };
        if token.is_cancelled() {
            return ControlFlow::Break(());
        }
        metrics::inc_frames_received();

        match Event::decode(&frame) {
            Ok(event) => {
                self.check_sequence(event.sequence());
                let report = self.dispatcher.handle_event(&event);
                debug!(
                    sequence = event.sequence(),
                    sent = report.sent,
                    failed = report.failed,
                    "event dispatched"
                );
            }
            Err(err) => {
                warn!(%err, parts = frame.len(), "skipping malformed event frame");
                metrics::inc_frames_skipped();
            }
        }
        ControlFlow::Continue(())
    }

    fn teardown(&mut self) -> Result<(), TransportError> {
        let source = self.source.disconnect();
        if let Err(err) = &source {
            error!(%err, "failed to disconnect event source");
        }
        let sink = self.dispatcher.sink_mut().disconnect();
        if let Err(err) = &sink {
            error!(%err, "failed to disconnect notification sink");
        }
        source.and(sink)
    }
}
