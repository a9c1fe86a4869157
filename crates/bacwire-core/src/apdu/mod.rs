pub mod confirmed;
pub mod pdu;
pub mod unconfirmed;

pub use confirmed::{
    AbortPdu, ComplexAck, ConfirmedRequest, ErrorPdu, RejectPdu, SegmentAck,
};
pub use pdu::ApduType;
pub use unconfirmed::{UnconfirmedRequest, UnconfirmedService};

use crate::encoding::{reader::Reader, writer::Writer};
use crate::{DecodeError, EncodeError};

/// An application-layer message, discriminated by the high nibble of the
/// first byte.
#[derive(Debug, Clone, PartialEq)]
pub enum Apdu {
    ConfirmedRequest(ConfirmedRequest),
    UnconfirmedRequest(UnconfirmedRequest),
    ComplexAck(ComplexAck),
    SegmentAck(SegmentAck),
    Error(ErrorPdu),
    Reject(RejectPdu),
    Abort(AbortPdu),
}

impl Apdu {
    pub fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        match self {
            Self::ConfirmedRequest(pdu) => pdu.encode(w),
            Self::UnconfirmedRequest(pdu) => pdu.encode(w),
            Self::ComplexAck(pdu) => pdu.encode(w),
            Self::SegmentAck(pdu) => pdu.encode(w),
            Self::Error(pdu) => pdu.encode(w),
            Self::Reject(pdu) => pdu.encode(w),
            Self::Abort(pdu) => pdu.encode(w),
        }
    }

    pub fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        // Reader is Copy, so peek at the type nibble without consuming it.
        let mut peek = *r;
        let first = peek.read_u8()?;
        match ApduType::from_nibble(first >> 4)? {
            ApduType::ConfirmedRequest => Ok(Self::ConfirmedRequest(ConfirmedRequest::decode(r)?)),
            ApduType::UnconfirmedRequest => {
                Ok(Self::UnconfirmedRequest(UnconfirmedRequest::decode(r)?))
            }
            ApduType::ComplexAck => Ok(Self::ComplexAck(ComplexAck::decode(r)?)),
            ApduType::SegmentAck => Ok(Self::SegmentAck(SegmentAck::decode(r)?)),
            ApduType::Error => Ok(Self::Error(ErrorPdu::decode(r)?)),
            ApduType::Reject => Ok(Self::Reject(RejectPdu::decode(r)?)),
            ApduType::Abort => Ok(Self::Abort(AbortPdu::decode(r)?)),
        }
    }
}
