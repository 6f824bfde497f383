use crate::DecodeError;

/// Status codes carried by responses and notifications.
///
/// Encoded on the wire as a 4-byte little-endian integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum StatusCode {
    /// The request succeeded, or the event matched.
    Success = 0,
    /// The request body was malformed.
    BadStream = 1,
    /// The command is not known.
    NotFound = 2,
    /// The service is shutting down.
    ServiceStopped = 3,
}

impl StatusCode {
    /// Encoded size.
    pub const SIZE: usize = 4;

    /// True for [`StatusCode::Success`].
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }

    /// Little-endian wire encoding.
    pub const fn to_le_bytes(self) -> [u8; 4] {
        (self as u32).to_le_bytes()
    }

    /// Look up a status by its numeric value.
    pub const fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::Success),
            1 => Some(Self::BadStream),
            2 => Some(Self::NotFound),
            3 => Some(Self::ServiceStopped),
            _ => None,
        }
    }

    /// Decode a status from the first four bytes of `buf`.
    pub fn decode(buf: &[u8]) -> Result<Self, DecodeError> {
        let bytes: [u8; 4] = buf
            .get(..Self::SIZE)
            .and_then(|b| b.try_into().ok())
            .ok_or(DecodeError::length(Self::SIZE, buf.len()))?;
        let value = u32::from_le_bytes(bytes);
        Self::from_u32(value).ok_or(DecodeError::Status(value))
    }
}

impl core::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            Self::Success => "success",
            Self::BadStream => "bad_stream",
            Self::NotFound => "not_found",
            Self::ServiceStopped => "service_stopped",
        };
        f.write_str(s)
    }
}

impl From<&DecodeError> for StatusCode {
    fn from(_: &DecodeError) -> Self {
        Self::BadStream
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn wire_values() {
        assert_eq!(StatusCode::Success.to_le_bytes(), [0, 0, 0, 0]);
        assert_eq!(StatusCode::BadStream.to_le_bytes(), [1, 0, 0, 0]);
        assert_eq!(StatusCode::decode(&[3, 0, 0, 0, 0xff]).unwrap(), StatusCode::ServiceStopped);
        assert!(matches!(StatusCode::decode(&[9, 0, 0, 0]), Err(DecodeError::Status(9))));
        assert!(matches!(StatusCode::decode(&[0, 0]), Err(DecodeError::Length { .. })));
    }
}
