use crate::{DecodeError, DecodeResult};
use alloy_primitives::B256;

/// Shortest stealth prefix accepted by a subscription.
pub const MIN_PREFIX_BITS: u8 = 8;

/// Longest stealth prefix accepted by a subscription.
pub const MAX_PREFIX_BITS: u8 = 32;

/// A stealth prefix filter of 8 to 32 bits.
///
/// Bits are counted from the most significant bit of the first byte. Bits
/// past [`Self::bits`] are always zero, so two prefixes compare equal
/// exactly when they select the same set of candidate values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StealthPrefix {
    bits: u8,
    blocks: [u8; 4],
}

impl StealthPrefix {
    /// Number of bytes needed to hold `bits` bits.
    pub const fn blocks_size(bits: u8) -> usize {
        (bits as usize).div_ceil(8)
    }

    /// Build a prefix from a bit length and its minimal byte backing.
    ///
    /// Fails if `bits` is outside [`MIN_PREFIX_BITS`]..=[`MAX_PREFIX_BITS`]
    /// or `blocks` is not exactly [`Self::blocks_size`] bytes. Unused low
    /// bits of the last byte are cleared.
    pub fn new(bits: u8, blocks: &[u8]) -> DecodeResult<Self> {
        if !(MIN_PREFIX_BITS..=MAX_PREFIX_BITS).contains(&bits) {
            return Err(DecodeError::PrefixBits(bits));
        }
        let size = Self::blocks_size(bits);
        if blocks.len() != size {
            return Err(DecodeError::length(size, blocks.len()));
        }
        let mut buf = [0u8; 4];
        buf[..size].copy_from_slice(blocks);
        Ok(Self::masked(bits, buf))
    }

    /// Decode the `[bits:1][blocks:ceil(bits/8)]` wire form.
    pub fn decode(body: &[u8]) -> DecodeResult<Self> {
        let (&bits, blocks) = body.split_first().ok_or(DecodeError::Empty)?;
        if !(MIN_PREFIX_BITS..=MAX_PREFIX_BITS).contains(&bits) {
            return Err(DecodeError::PrefixBits(bits));
        }
        let expected = 1 + Self::blocks_size(bits);
        if body.len() != expected {
            return Err(DecodeError::length(expected, body.len()));
        }
        Self::new(bits, blocks)
    }

    /// Encode to the `[bits:1][blocks]` wire form.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(1 + self.blocks().len());
        out.push(self.bits);
        out.extend_from_slice(self.blocks());
        out
    }

    /// The leading `bits` bits of `candidate`. `bits` is clamped to 32.
    pub fn truncate(candidate: &B256, bits: u8) -> Self {
        let bits = bits.min(MAX_PREFIX_BITS);
        let mut buf = [0u8; 4];
        buf.copy_from_slice(&candidate[..4]);
        Self::masked(bits, buf)
    }

    /// True if the first [`Self::bits`] bits of `candidate` equal this
    /// prefix. Bits after that are ignored.
    pub fn matches(&self, candidate: &B256) -> bool {
        Self::truncate(candidate, self.bits) == *self
    }

    /// Prefix length in bits.
    pub const fn bits(&self) -> u8 {
        self.bits
    }

    /// The minimal byte backing.
    pub fn blocks(&self) -> &[u8] {
        &self.blocks[..Self::blocks_size(self.bits)]
    }

    fn masked(bits: u8, blocks: [u8; 4]) -> Self {
        let mask = u32::MAX.checked_shl(32 - u32::from(bits)).unwrap_or(0);
        let value = u32::from_be_bytes(blocks) & mask;
        Self { bits, blocks: value.to_be_bytes() }
    }
}

impl core::fmt::Display for StealthPrefix {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let value = u32::from_be_bytes(self.blocks);
        let digits = usize::from(self.bits);
        let shifted = if digits == 0 { 0 } else { value >> (32 - digits) };
        write!(f, "{shifted:0digits$b}")
    }
}
