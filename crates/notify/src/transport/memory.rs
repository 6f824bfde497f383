//! In-process transport over [`crossbeam_channel`].

use crate::{EventSource, ReplySink, TransportError};
use chainwatch_types::{Frame, Notification, Route};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::time::Duration;

/// Create a connected event publisher and source.
pub fn event_channel() -> (EventPublisher, MemorySource) {
    let (tx, rx) = crossbeam_channel::unbounded();
    (EventPublisher { tx }, MemorySource { rx: Some(rx) })
}

/// Create a connected reply sink and the receiver of its deliveries.
pub fn reply_channel() -> (MemorySink, Receiver<Delivery>) {
    let (tx, rx) = crossbeam_channel::unbounded();
    (MemorySink { tx: Some(tx) }, rx)
}

/// Publishing end of an in-process event feed.
#[derive(Debug, Clone)]
pub struct EventPublisher {
    tx: Sender<Frame>,
}

impl EventPublisher {
    /// Publish a frame.
    pub fn publish(&self, frame: Frame) -> Result<(), TransportError> {
        self.tx.send(frame).map_err(|_| TransportError::Closed)
    }
}

/// Receiving end of an in-process event feed.
#[derive(Debug)]
pub struct MemorySource {
    rx: Option<Receiver<Frame>>,
}

impl EventSource for MemorySource {
    fn receive(&mut self, timeout: Duration) -> Result<Option<Frame>, TransportError> {
        let rx = self.rx.as_ref().ok_or(TransportError::Disconnected)?;
        match rx.recv_timeout(timeout) {
            Ok(frame) => Ok(Some(frame)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(TransportError::Closed),
        }
    }

    fn disconnect(&mut self) -> Result<(), TransportError> {
        self.rx.take().map(drop).ok_or(TransportError::Disconnected)
    }
}

/// A notification handed to a [`MemorySink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// The subscriber.
    pub route: Route,
    /// What was sent.
    pub notification: Notification,
}

/// In-process reply sink.
#[derive(Debug)]
pub struct MemorySink {
    tx: Option<Sender<Delivery>>,
}

impl ReplySink for MemorySink {
    fn send(&mut self, route: &Route, notification: &Notification) -> Result<(), TransportError> {
        let tx = self.tx.as_ref().ok_or(TransportError::Disconnected)?;
        tx.send(Delivery { route: route.clone(), notification: *notification })
            .map_err(|_| TransportError::Closed)
    }

    fn disconnect(&mut self) -> Result<(), TransportError> {
        self.tx.take().map(drop).ok_or(TransportError::Disconnected)
    }
}

/// Drain every delivery currently queued on `rx`.
pub fn drain(rx: &Receiver<Delivery>) -> Vec<Delivery> {
    let mut out = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(delivery) => out.push(delivery),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => return out,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use chainwatch_types::{NotificationKind, UNCONFIRMED_HEIGHT};

    #[test]
    fn source_times_out_then_closes() {
        let (publisher, mut source) = event_channel();
        assert!(source.receive(Duration::from_millis(1)).unwrap().is_none());

        let frame: Frame = [vec![1u8, 0]].into_iter().collect();
        publisher.publish(frame.clone()).unwrap();
        assert_eq!(source.receive(Duration::from_millis(1)).unwrap(), Some(frame));

        drop(publisher);
        assert!(matches!(source.receive(Duration::from_millis(1)), Err(TransportError::Closed)));
    }

    #[test]
    fn disconnect_once() {
        let (_publisher, mut source) = event_channel();
        source.disconnect().unwrap();
        assert!(matches!(source.disconnect(), Err(TransportError::Disconnected)));
        assert!(matches!(source.receive(Duration::ZERO), Err(TransportError::Disconnected)));

        let (mut sink, rx) = reply_channel();
        sink.disconnect().unwrap();
        let note = Notification::success(NotificationKind::Key, 1, Default::default());
        assert!(sink.send(&Route::new(&b"r"[..], 1), &note).is_err());
        assert!(drain(&rx).is_empty());
    }

    #[test]
    fn sink_delivers() {
        let (mut sink, rx) = reply_channel();
        let route = Route::new(&b"r"[..], 1);
        let note =
            Notification::success(NotificationKind::Stealth, UNCONFIRMED_HEIGHT, [3; 32].into());
        sink.send(&route, &note).unwrap();
        sink.send(&route, &note).unwrap();
        assert_eq!(drain(&rx), vec![Delivery { route: route.clone(), notification: note }; 2]);

        drop(rx);
        assert!(matches!(sink.send(&route, &note), Err(TransportError::Closed)));
    }
}
