use alloy_primitives::B256;
use chainwatch_types::{
    BlockEvent, DecodeError, Frame, HeartbeatEvent, TransactionEvent, TxOutput,
};
use serde::Serialize;

/// Errors turning a frame into a push message.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// The frame was malformed.
    #[error(transparent)]
    Decode(#[from] DecodeError),
    /// The message could not be serialized.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// The chain feeds that can be relayed to push clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feed {
    /// Confirmed blocks.
    Block,
    /// Liveness heartbeats.
    Heartbeat,
    /// Pool transactions.
    Transaction,
}

impl Feed {
    /// Short feed name used for threads, logs and metric labels.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Block => "block-relay",
            Self::Heartbeat => "heartbeat-relay",
            Self::Transaction => "transaction-relay",
        }
    }

    /// Decode `frame` and render it as a JSON push message.
    pub fn render(self, frame: &Frame) -> Result<String, RelayError> {
        let json = match self {
            Self::Block => {
                let event = BlockEvent::decode(frame)?;
                serde_json::to_string(&BlockMessage::from(&event))?
            }
            Self::Heartbeat => {
                let event = HeartbeatEvent::decode(frame)?;
                serde_json::to_string(&HeartbeatMessage::from(&event))?
            }
            Self::Transaction => {
                let event = TransactionEvent::decode(frame)?;
                serde_json::to_string(&TransactionMessage::from(&event))?
            }
        };
        Ok(json)
    }
}

impl core::fmt::Display for Feed {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Serialize)]
struct BlockMessage {
    sequence: u16,
    height: u32,
    hash: B256,
    transactions: Vec<B256>,
}

impl From<&BlockEvent> for BlockMessage {
    fn from(event: &BlockEvent) -> Self {
        Self {
            sequence: event.sequence,
            height: event.height,
            hash: event.block.hash(),
            transactions: event.block.transactions.iter().map(|tx| tx.hash()).collect(),
        }
    }
}

#[derive(Serialize)]
struct HeartbeatMessage {
    sequence: u16,
    height: u64,
}

impl From<&HeartbeatEvent> for HeartbeatMessage {
    fn from(event: &HeartbeatEvent) -> Self {
        Self { sequence: event.sequence, height: event.height }
    }
}

#[derive(Serialize)]
struct TransactionMessage<'a> {
    sequence: u16,
    hash: B256,
    outputs: &'a [TxOutput],
    stealth: &'a [B256],
}

impl<'a> From<&'a TransactionEvent> for TransactionMessage<'a> {
    fn from(event: &'a TransactionEvent) -> Self {
        Self {
            sequence: event.sequence,
            hash: event.transaction.hash(),
            outputs: &event.transaction.outputs,
            stealth: &event.transaction.stealth,
        }
    }
}
