use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeError {
    BufferTooSmall,
    ValueTooLarge,
    InvalidData,
    NotImplemented,
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BufferTooSmall => f.write_str("buffer too small"),
            Self::ValueTooLarge => f.write_str("value too large for the wire format"),
            Self::InvalidData => f.write_str("invalid data"),
            Self::NotImplemented => f.write_str("not implemented"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for EncodeError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    InsufficientData,
    InvalidData,
    NotImplemented,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InsufficientData => f.write_str("unexpected end of data"),
            Self::InvalidData => f.write_str("invalid data"),
            Self::NotImplemented => f.write_str("not implemented"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for DecodeError {}
