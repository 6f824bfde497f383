use crate::{DecodeError, DecodeResult, HASH_SIZE, Route, StatusCode};
use alloy_primitives::B256;
use bytes::{BufMut, Bytes, BytesMut};

/// Command names used on the query and notification channels.
pub mod commands {
    /// Subscribe to a 32-byte payment key.
    pub const SUBSCRIBE_KEY: &str = "subscribe.key";
    /// Cancel a payment key subscription.
    pub const UNSUBSCRIBE_KEY: &str = "unsubscribe.key";
    /// Subscribe to a stealth prefix.
    pub const SUBSCRIBE_STEALTH: &str = "subscribe.stealth";
    /// Cancel a stealth prefix subscription.
    pub const UNSUBSCRIBE_STEALTH: &str = "unsubscribe.stealth";
    /// Notification sent for a payment key match.
    pub const NOTIFICATION_KEY: &str = "notification.key";
    /// Notification sent for a stealth prefix match.
    pub const NOTIFICATION_STEALTH: &str = "notification.stealth";
}

/// Decode a `subscribe.key` body: exactly 32 bytes.
pub fn decode_key(body: &[u8]) -> DecodeResult<B256> {
    if body.len() != HASH_SIZE {
        return Err(DecodeError::length(HASH_SIZE, body.len()));
    }
    Ok(B256::from_slice(body))
}

/// A query request, as handed over by the query front end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Command name, e.g. [`commands::SUBSCRIBE_KEY`].
    pub command: String,
    /// Where the response, and any notifications, should go.
    pub route: Route,
    /// Command arguments.
    pub body: Bytes,
}

impl Request {
    /// Create a request.
    pub fn new(command: impl Into<String>, route: Route, body: impl Into<Bytes>) -> Self {
        Self { command: command.into(), route, body: body.into() }
    }
}

/// Response to a [`Request`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Command name, copied from the request.
    pub command: String,
    /// Route, copied from the request.
    pub route: Route,
    /// `[status:4]` followed by any command output.
    pub body: Bytes,
}

impl Response {
    /// A response carrying only a status code.
    pub fn status(request: &Request, status: StatusCode) -> Self {
        Self {
            command: request.command.clone(),
            route: request.route.clone(),
            body: Bytes::copy_from_slice(&status.to_le_bytes()),
        }
    }

    /// Decode the status code at the head of the body.
    pub fn status_code(&self) -> DecodeResult<StatusCode> {
        StatusCode::decode(&self.body)
    }
}

/// Which index produced a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NotificationKind {
    /// Matched a payment key subscription.
    Key,
    /// Matched a stealth prefix subscription.
    Stealth,
}

impl NotificationKind {
    /// The command name the notification is sent under.
    pub const fn command(self) -> &'static str {
        match self {
            Self::Key => commands::NOTIFICATION_KEY,
            Self::Stealth => commands::NOTIFICATION_STEALTH,
        }
    }

    /// Look up a kind by its command name.
    pub fn from_command(command: &str) -> Option<Self> {
        match command {
            commands::NOTIFICATION_KEY => Some(Self::Key),
            commands::NOTIFICATION_STEALTH => Some(Self::Stealth),
            _ => None,
        }
    }
}

/// A transaction notification for one subscriber.
///
/// Encoded as `[status:4][height:4][tx_hash:32]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Notification {
    /// Which index matched.
    pub kind: NotificationKind,
    /// Event status.
    pub status: StatusCode,
    /// Block height, or [`UNCONFIRMED_HEIGHT`] for pool transactions.
    ///
    /// [`UNCONFIRMED_HEIGHT`]: crate::UNCONFIRMED_HEIGHT
    pub height: u32,
    /// Hash of the matched transaction.
    pub tx_hash: B256,
}

impl Notification {
    /// Encoded body size.
    pub const SIZE: usize = StatusCode::SIZE + 4 + HASH_SIZE;

    /// A success notification.
    pub const fn success(kind: NotificationKind, height: u32, tx_hash: B256) -> Self {
        Self { kind, status: StatusCode::Success, height, tx_hash }
    }

    /// The command name the notification is sent under.
    pub const fn command(&self) -> &'static str {
        self.kind.command()
    }

    /// Encode the body.
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(Self::SIZE);
        buf.put_slice(&self.status.to_le_bytes());
        buf.put_u32_le(self.height);
        buf.put_slice(self.tx_hash.as_slice());
        buf.freeze()
    }

    /// Decode a body received under `command`.
    pub fn decode(command: &str, body: &[u8]) -> DecodeResult<Self> {
        let kind = NotificationKind::from_command(command)
            .ok_or_else(|| DecodeError::Command(command.to_owned()))?;
        if body.len() != Self::SIZE {
            return Err(DecodeError::length(Self::SIZE, body.len()));
        }
        let status = StatusCode::decode(&body[..4])?;
        let height = u32::from_le_bytes([body[4], body[5], body[6], body[7]]);
        let tx_hash = B256::from_slice(&body[8..]);
        Ok(Self { kind, status, height, tx_hash })
    }
}
