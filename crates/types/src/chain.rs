use crate::{DecodeError, DecodeResult};
use alloy_primitives::{B256, keccak256};
use alloy_rlp::{Decodable, RlpDecodable, RlpEncodable};

/// A transaction output paying to a key commitment.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, RlpEncodable, RlpDecodable, serde::Serialize,
)]
pub struct TxOutput {
    /// Amount paid.
    pub value: u64,
    /// Payment key commitment. Key subscriptions match against this.
    pub key: B256,
}

impl TxOutput {
    /// Create a new output.
    pub const fn new(value: u64, key: B256) -> Self {
        Self { value, key }
    }
}

/// A transaction, as carried by pool and block events.
#[derive(Debug, Clone, Default, PartialEq, Eq, RlpEncodable, RlpDecodable, serde::Serialize)]
pub struct Transaction {
    /// Transaction format version.
    pub version: u32,
    /// Payment outputs.
    pub outputs: Vec<TxOutput>,
    /// Stealth values announced by the transaction. Stealth subscriptions
    /// match against the leading bits of each value.
    pub stealth: Vec<B256>,
}

impl Transaction {
    /// Hash of the RLP encoding.
    pub fn hash(&self) -> B256 {
        keccak256(alloy_rlp::encode(self))
    }

    /// RLP encode the transaction.
    pub fn encoded(&self) -> Vec<u8> {
        alloy_rlp::encode(self)
    }

    /// Decode a transaction, rejecting trailing bytes.
    pub fn decode_exact(buf: &[u8]) -> DecodeResult<Self> {
        decode_exact(buf)
    }

    /// Payment keys committed to by the outputs, in output order. A key may
    /// repeat if several outputs pay to it.
    pub fn payment_keys(&self) -> impl Iterator<Item = &B256> {
        self.outputs.iter().map(|output| &output.key)
    }
}

/// Header of a [`Block`].
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, RlpEncodable, RlpDecodable, serde::Serialize,
)]
pub struct BlockHeader {
    /// Hash of the parent header.
    pub parent: B256,
    /// Block timestamp, in seconds.
    pub timestamp: u64,
    /// Proof-of-work nonce.
    pub nonce: u64,
}

impl BlockHeader {
    /// Hash of the RLP encoding.
    pub fn hash(&self) -> B256 {
        keccak256(alloy_rlp::encode(self))
    }
}

/// A block: a header and its transactions.
#[derive(Debug, Clone, Default, PartialEq, Eq, RlpEncodable, RlpDecodable, serde::Serialize)]
pub struct Block {
    /// The block header.
    pub header: BlockHeader,
    /// Transactions, in block order.
    pub transactions: Vec<Transaction>,
}

impl Block {
    /// Create a block from a header and transactions.
    pub const fn new(header: BlockHeader, transactions: Vec<Transaction>) -> Self {
        Self { header, transactions }
    }

    /// The block hash, which is the hash of its header.
    pub fn hash(&self) -> B256 {
        self.header.hash()
    }

    /// RLP encode the block.
    pub fn encoded(&self) -> Vec<u8> {
        alloy_rlp::encode(self)
    }

    /// Decode a block, rejecting trailing bytes.
    pub fn decode_exact(buf: &[u8]) -> DecodeResult<Self> {
        decode_exact(buf)
    }
}

fn decode_exact<T: Decodable>(mut buf: &[u8]) -> DecodeResult<T> {
    let item = T::decode(&mut buf)?;
    if !buf.is_empty() {
        return Err(DecodeError::Trailing(buf.len()));
    }
    Ok(item)
}
