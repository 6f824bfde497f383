/// Result using [`DecodeError`] as the default error type.
pub type DecodeResult<T, E = DecodeError> = std::result::Result<T, E>;

/// Errors decoding a request body or an event frame.
///
/// These are always local to one request or one frame. A request that fails
/// to decode is answered with [`StatusCode::BadStream`], a frame that fails
/// to decode is skipped.
///
/// [`StatusCode::BadStream`]: crate::StatusCode::BadStream
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The body or field had the wrong size.
    #[error("expected {expected} bytes, found {actual}")]
    Length {
        /// Required size.
        expected: usize,
        /// Size received.
        actual: usize,
    },
    /// The body was empty.
    #[error("empty body")]
    Empty,
    /// Stealth prefix bit length outside the supported range.
    #[error("prefix bit length {0} outside [8, 32]")]
    PrefixBits(u8),
    /// A frame had the wrong number of parts.
    #[error("expected {expected} frame parts, found {actual}")]
    Parts {
        /// Required part count.
        expected: usize,
        /// Part count received.
        actual: usize,
    },
    /// The payload was not valid RLP.
    #[error(transparent)]
    Rlp(#[from] alloy_rlp::Error),
    /// The payload decoded, but bytes were left over.
    #[error("{0} trailing bytes after payload")]
    Trailing(usize),
    /// A message arrived under a command this decoder does not handle.
    #[error("unexpected command {0:?}")]
    Command(String),
    /// A notification or response carried an unknown status code.
    #[error("unknown status code {0}")]
    Status(u32),
}

impl DecodeError {
    /// Wrong size error.
    pub const fn length(expected: usize, actual: usize) -> Self {
        Self::Length { expected, actual }
    }

    /// Wrong part count error.
    pub const fn parts(expected: usize, actual: usize) -> Self {
        Self::Parts { expected, actual }
    }
}
