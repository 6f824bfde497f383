//! ZeroMQ transport.
//!
//! Event feeds are consumed with a SUB socket subscribed to every message.
//! One SUB socket may connect to several publishers, in which case frames
//! are fair-queued between them. Notifications leave through a DEALER
//! socket as `[address][][command][id:4][body]`, with `id` little-endian,
//! for the query service's router to forward to the subscriber.

use crate::{EventSource, NotificationWorker, ReplySink, TransportError};
use chainwatch_config::NotifierConfig;
use chainwatch_registry::SubscriptionRegistry;
use chainwatch_types::{Frame, Notification, Route};
use std::time::Duration;
use tracing::{debug, info};

fn timeout_millis(timeout: Duration) -> i64 {
    i64::try_from(timeout.as_millis()).unwrap_or(i64::MAX)
}

/// Event source backed by a ZeroMQ SUB socket.
pub struct ZmqSource {
    socket: zmq::Socket,
    endpoints: Vec<String>,
    connected: bool,
}

impl ZmqSource {
    /// Connect to one or more publishers.
    pub fn connect<S: AsRef<str>>(
        context: &zmq::Context,
        endpoints: &[S],
    ) -> Result<Self, TransportError> {
        let socket = context.socket(zmq::SUB)?;
        socket.set_subscribe(b"")?;
        socket.set_linger(0)?;
        socket.set_rcvhwm(0)?;

        let mut connected = Vec::with_capacity(endpoints.len());
        for endpoint in endpoints {
            let endpoint = endpoint.as_ref();
            socket.connect(endpoint)?;
            info!(endpoint, "connected to event feed");
            connected.push(endpoint.to_owned());
        }
        Ok(Self { socket, endpoints: connected, connected: true })
    }
}

impl core::fmt::Debug for ZmqSource {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ZmqSource")
            .field("endpoints", &self.endpoints)
            .field("connected", &self.connected)
            .finish_non_exhaustive()
    }
}

impl EventSource for ZmqSource {
    fn receive(&mut self, timeout: Duration) -> Result<Option<Frame>, TransportError> {
        if !self.connected {
            return Err(TransportError::Disconnected);
        }
        if self.socket.poll(zmq::POLLIN, timeout_millis(timeout))? == 0 {
            return Ok(None);
        }
        match self.socket.recv_multipart(zmq::DONTWAIT) {
            Ok(parts) => Ok(Some(parts.into_iter().collect())),
            Err(zmq::Error::EAGAIN) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn disconnect(&mut self) -> Result<(), TransportError> {
        if !std::mem::replace(&mut self.connected, false) {
            return Err(TransportError::Disconnected);
        }
        for endpoint in &self.endpoints {
            self.socket.disconnect(endpoint)?;
            debug!(endpoint, "disconnected from event feed");
        }
        Ok(())
    }
}

/// Reply sink backed by a ZeroMQ DEALER socket.
pub struct ZmqSink {
    socket: zmq::Socket,
    endpoint: String,
    connected: bool,
}

impl ZmqSink {
    /// Connect to the query service's notification endpoint.
    pub fn connect(context: &zmq::Context, endpoint: &str) -> Result<Self, TransportError> {
        let socket = context.socket(zmq::DEALER)?;
        socket.set_linger(0)?;
        socket.connect(endpoint)?;
        info!(endpoint, "connected notification sink");
        Ok(Self { socket, endpoint: endpoint.to_owned(), connected: true })
    }
}

impl core::fmt::Debug for ZmqSink {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ZmqSink")
            .field("endpoint", &self.endpoint)
            .field("connected", &self.connected)
            .finish_non_exhaustive()
    }
}

impl ReplySink for ZmqSink {
    fn send(&mut self, route: &Route, notification: &Notification) -> Result<(), TransportError> {
        if !self.connected {
            return Err(TransportError::Disconnected);
        }
        let id = route.id.to_le_bytes();
        let body = notification.encode();
        let parts: [&[u8]; 5] =
            [&route.address, &[], notification.command().as_bytes(), &id, &body];
        self.socket.send_multipart(parts, 0).map_err(|err| TransportError::rejected(route, err))
    }

    fn disconnect(&mut self) -> Result<(), TransportError> {
        if !std::mem::replace(&mut self.connected, false) {
            return Err(TransportError::Disconnected);
        }
        self.socket.disconnect(&self.endpoint)?;
        debug!(endpoint = %self.endpoint, "disconnected notification sink");
        Ok(())
    }
}

impl NotificationWorker<ZmqSource, ZmqSink> {
    /// Connect a worker to the configured block and transaction feeds and
    /// notification endpoint.
    pub fn connect(
        context: &zmq::Context,
        config: &NotifierConfig,
        registry: SubscriptionRegistry,
    ) -> Result<Self, TransportError> {
        let source = ZmqSource::connect(
            context,
            &[config.block_endpoint(), config.transaction_endpoint()],
        )?;
        let sink = ZmqSink::connect(context, config.notification_endpoint())?;
        Ok(Self::new(config, registry, source, sink))
    }
}
