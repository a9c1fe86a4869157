use crate::DecodeError;

/// PDU types from the high nibble of an APDU's first byte.
///
/// Simple-ack (nibble 2) is recognised but not supported by this
/// implementation; nibbles above 7 are not assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ApduType {
    ConfirmedRequest = 0,
    UnconfirmedRequest = 1,
    ComplexAck = 3,
    SegmentAck = 4,
    Error = 5,
    Reject = 6,
    Abort = 7,
}

impl ApduType {
    pub fn from_nibble(value: u8) -> Result<Self, DecodeError> {
        match value {
            0 => Ok(Self::ConfirmedRequest),
            1 => Ok(Self::UnconfirmedRequest),
            2 => Err(DecodeError::NotImplemented),
            3 => Ok(Self::ComplexAck),
            4 => Ok(Self::SegmentAck),
            5 => Ok(Self::Error),
            6 => Ok(Self::Reject),
            7 => Ok(Self::Abort),
            _ => Err(DecodeError::InvalidData),
        }
    }
}
