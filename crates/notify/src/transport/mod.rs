//! Transport seams between the notification core and the network.

use chainwatch_types::{Frame, Notification, Route};
use std::time::Duration;

pub mod memory;

#[cfg(feature = "zmq")]
pub mod zmq;

/// Errors raised by a transport.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The other end of the channel has gone away.
    #[error("channel closed")]
    Closed,
    /// The endpoint was already disconnected.
    #[error("already disconnected")]
    Disconnected,
    /// A message for one subscriber could not be delivered.
    #[error("delivery to {route} failed: {reason}")]
    Rejected {
        /// The subscriber.
        route: Route,
        /// Transport specific reason.
        reason: String,
    },
    /// ZeroMQ error.
    #[cfg(feature = "zmq")]
    #[error(transparent)]
    Zmq(#[from] ::zmq::Error),
}

impl TransportError {
    /// Delivery failure for one route.
    pub fn rejected(route: &Route, reason: impl core::fmt::Display) -> Self {
        Self::Rejected { route: route.clone(), reason: reason.to_string() }
    }
}

/// A feed of multipart chain event frames.
pub trait EventSource: Send {
    /// Block until a frame arrives or `timeout` elapses. Returns `Ok(None)`
    /// on timeout.
    fn receive(&mut self, timeout: Duration) -> Result<Option<Frame>, TransportError>;

    /// Release the connection. Later calls to [`Self::receive`] fail.
    fn disconnect(&mut self) -> Result<(), TransportError>;
}

/// The outbound channel all notifications of one worker are sent through.
pub trait ReplySink: Send {
    /// Send `notification` to `route`.
    fn send(&mut self, route: &Route, notification: &Notification) -> Result<(), TransportError>;

    /// Release the connection. Later sends fail.
    fn disconnect(&mut self) -> Result<(), TransportError>;
}

impl<T: EventSource + ?Sized> EventSource for Box<T> {
    fn receive(&mut self, timeout: Duration) -> Result<Option<Frame>, TransportError> {
        (**self).receive(timeout)
    }

    fn disconnect(&mut self) -> Result<(), TransportError> {
        (**self).disconnect()
    }
}

impl<T: ReplySink + ?Sized> ReplySink for Box<T> {
    fn send(&mut self, route: &Route, notification: &Notification) -> Result<(), TransportError> {
        (**self).send(route, notification)
    }

    fn disconnect(&mut self) -> Result<(), TransportError> {
        (**self).disconnect()
    }
}
