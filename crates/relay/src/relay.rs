use crate::{Feed, metrics};
use chainwatch_config::NotifierConfig;
use chainwatch_notify::{EventSource, TransportError, Worker};
use std::{ops::ControlFlow, sync::Arc, time::Duration};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, trace, warn};

/// Fan-out channel of JSON messages for push clients.
///
/// Cloning shares the channel. Clients that fall more than the channel
/// capacity behind miss messages; the relay never waits for them.
#[derive(Debug, Clone)]
pub struct PushChannel {
    tx: broadcast::Sender<Arc<str>>,
}

impl PushChannel {
    /// Create a channel holding up to `capacity` undelivered messages.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Create a channel sized by the configured relay capacity.
    pub fn from_config(config: &NotifierConfig) -> Self {
        Self::new(config.relay_capacity())
    }

    /// Register a new push client.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<str>> {
        self.tx.subscribe()
    }

    /// Number of connected push clients.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Send a message to every connected client. Returns the number of
    /// clients it was queued for.
    pub fn publish(&self, message: Arc<str>) -> usize {
        self.tx.send(message).unwrap_or_default()
    }
}

/// Re-publishes one chain feed to a [`PushChannel`].
///
/// Each frame is decoded according to the relay's [`Feed`] and rendered as
/// JSON. Frames of the wrong shape are logged and skipped.
#[derive(Debug)]
pub struct RelayWorker<E> {
    feed: Feed,
    source: E,
    channel: PushChannel,
    poll_interval: Duration,
}

impl<E: EventSource> RelayWorker<E> {
    /// Create a relay of `feed` from `source` to `channel`.
    pub const fn new(feed: Feed, source: E, channel: PushChannel, poll_interval: Duration) -> Self {
        Self { feed, source, channel, poll_interval }
    }

    /// Create a relay polling at the configured interval.
    pub const fn from_config(
        config: &NotifierConfig,
        feed: Feed,
        source: E,
        channel: PushChannel,
    ) -> Self {
        Self::new(feed, source, channel, config.poll_interval())
    }

    /// The relayed feed.
    pub const fn feed(&self) -> Feed {
        self.feed
    }
}

impl<E: EventSource + 'static> Worker for RelayWorker<E> {
    fn name(&self) -> &'static str {
        self.feed.name()
    }

    fn poll(&mut self, token: &CancellationToken) -> ControlFlow<()> {
        let frame = match self.source.receive(self.poll_interval) {
            Ok(Some(frame)) => frame,
            Ok(None) => return ControlFlow::Continue(()),
            Err(err @ (TransportError::Closed | TransportError::Disconnected)) => {
                warn!(feed = %self.feed, %err, "relay source gone");
                return ControlFlow::Break(());
            }
            Err(err) => {
                warn!(feed = %self.feed, %err, "failed to receive frame");
                std::thread::sleep(self.poll_interval);
                return ControlFlow::Continue(());
            }
        };
        if token.is_cancelled() {
            return ControlFlow::Break(());
        }

        match self.feed.render(&frame) {
            Ok(message) => {
                let clients = self.channel.publish(message.into());
                trace!(feed = %self.feed, clients, "relayed");
                metrics::inc_relayed(self.feed);
            }
            Err(err) => {
                warn!(feed = %self.feed, %err, parts = frame.len(), "skipping malformed frame");
                metrics::inc_skipped(self.feed);
            }
        }
        ControlFlow::Continue(())
    }

    fn teardown(&mut self) -> Result<(), TransportError> {
        self.source.disconnect().inspect_err(|err| {
            error!(feed = %self.feed, %err, "failed to disconnect relay source");
        })?;
        debug!(feed = %self.feed, "relay disconnected");
        Ok(())
    }
}

#[cfg(feature = "zmq")]
impl RelayWorker<chainwatch_notify::zmq::ZmqSource> {
    /// Connect a relay to the configured endpoint of `feed`.
    pub fn connect(
        context: &zmq::Context,
        config: &NotifierConfig,
        feed: Feed,
        channel: PushChannel,
    ) -> Result<Self, TransportError> {
        let endpoint = match feed {
            Feed::Block => config.block_endpoint(),
            Feed::Heartbeat => config.heartbeat_endpoint(),
            Feed::Transaction => config.transaction_endpoint(),
        };
        let source = chainwatch_notify::zmq::ZmqSource::connect(context, &[endpoint])?;
        Ok(Self::from_config(config, feed, source, channel))
    }
}
