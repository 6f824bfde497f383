//! Multipart event frames published by the chain event feed.
//!
//! Three shapes exist, all integers little-endian:
//!
//! - block: `[sequence:2][height:4][rlp block]`
//! - transaction: `[sequence:2][rlp transaction]`
//! - heartbeat: `[sequence:2][height:8]`

use crate::{Block, DecodeError, DecodeResult, Transaction};
use bytes::Bytes;

/// A multipart message received from an event source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
    parts: Vec<Bytes>,
}

impl Frame {
    /// Create a frame from its parts.
    pub const fn new(parts: Vec<Bytes>) -> Self {
        Self { parts }
    }

    /// The frame parts.
    pub fn parts(&self) -> &[Bytes] {
        &self.parts
    }

    /// Consume the frame, returning its parts.
    pub fn into_parts(self) -> Vec<Bytes> {
        self.parts
    }

    /// Number of parts.
    pub const fn len(&self) -> usize {
        self.parts.len()
    }

    /// True if the frame has no parts.
    pub const fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Append a part.
    pub fn push(&mut self, part: impl Into<Bytes>) {
        self.parts.push(part.into());
    }

    fn expect_parts(&self, expected: usize) -> DecodeResult<&[Bytes]> {
        if self.parts.len() != expected {
            return Err(DecodeError::parts(expected, self.parts.len()));
        }
        Ok(&self.parts)
    }
}

impl<T: Into<Bytes>> FromIterator<T> for Frame {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(Into::into).collect())
    }
}

fn fixed<const N: usize>(part: &Bytes) -> DecodeResult<[u8; N]> {
    <[u8; N]>::try_from(&part[..]).map_err(|_| DecodeError::length(N, part.len()))
}

/// A confirmed block at a height.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockEvent {
    /// Publisher sequence number.
    pub sequence: u16,
    /// Block height.
    pub height: u32,
    /// The block.
    pub block: Block,
}

impl BlockEvent {
    /// Number of parts in a block frame.
    pub const PARTS: usize = 3;

    /// Decode a block frame.
    pub fn decode(frame: &Frame) -> DecodeResult<Self> {
        let parts = frame.expect_parts(Self::PARTS)?;
        let sequence = u16::from_le_bytes(fixed(&parts[0])?);
        let height = u32::from_le_bytes(fixed(&parts[1])?);
        let block = Block::decode_exact(&parts[2])?;
        Ok(Self { sequence, height, block })
    }

    /// Encode as a block frame.
    pub fn to_frame(&self) -> Frame {
        Frame::new(vec![
            Bytes::copy_from_slice(&self.sequence.to_le_bytes()),
            Bytes::copy_from_slice(&self.height.to_le_bytes()),
            self.block.encoded().into(),
        ])
    }
}

/// A transaction accepted into the pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionEvent {
    /// Publisher sequence number.
    pub sequence: u16,
    /// The transaction.
    pub transaction: Transaction,
}

impl TransactionEvent {
    /// Number of parts in a transaction frame.
    pub const PARTS: usize = 2;

    /// Decode a transaction frame.
    pub fn decode(frame: &Frame) -> DecodeResult<Self> {
        let parts = frame.expect_parts(Self::PARTS)?;
        let sequence = u16::from_le_bytes(fixed(&parts[0])?);
        let transaction = Transaction::decode_exact(&parts[1])?;
        Ok(Self { sequence, transaction })
    }

    /// Encode as a transaction frame.
    pub fn to_frame(&self) -> Frame {
        Frame::new(vec![
            Bytes::copy_from_slice(&self.sequence.to_le_bytes()),
            self.transaction.encoded().into(),
        ])
    }
}

/// A periodic liveness signal carrying the current chain height.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeartbeatEvent {
    /// Publisher sequence number.
    pub sequence: u16,
    /// Current chain height.
    pub height: u64,
}

impl HeartbeatEvent {
    /// Number of parts in a heartbeat frame.
    pub const PARTS: usize = 2;

    /// Decode a heartbeat frame.
    pub fn decode(frame: &Frame) -> DecodeResult<Self> {
        let parts = frame.expect_parts(Self::PARTS)?;
        let sequence = u16::from_le_bytes(fixed(&parts[0])?);
        let height = u64::from_le_bytes(fixed(&parts[1])?);
        Ok(Self { sequence, height })
    }

    /// Encode as a heartbeat frame.
    pub fn to_frame(&self) -> Frame {
        Frame::new(vec![
            Bytes::copy_from_slice(&self.sequence.to_le_bytes()),
            Bytes::copy_from_slice(&self.height.to_le_bytes()),
        ])
    }
}

/// A chain event consumed by the notification dispatcher.
///
/// Block and pool events share one feed and are told apart by part count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A confirmed block.
    Block(BlockEvent),
    /// An unconfirmed transaction.
    Transaction(TransactionEvent),
}

impl Event {
    /// Decode a block or transaction frame.
    pub fn decode(frame: &Frame) -> DecodeResult<Self> {
        match frame.len() {
            BlockEvent::PARTS => BlockEvent::decode(frame).map(Self::Block),
            TransactionEvent::PARTS => TransactionEvent::decode(frame).map(Self::Transaction),
            actual => Err(DecodeError::parts(BlockEvent::PARTS, actual)),
        }
    }

    /// Publisher sequence number.
    pub const fn sequence(&self) -> u16 {
        match self {
            Self::Block(event) => event.sequence,
            Self::Transaction(event) => event.sequence,
        }
    }
}

impl From<BlockEvent> for Event {
    fn from(event: BlockEvent) -> Self {
        Self::Block(event)
    }
}

impl From<TransactionEvent> for Event {
    fn from(event: TransactionEvent) -> Self {
        Self::Transaction(event)
    }
}
