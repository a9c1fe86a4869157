use crate::apdu::ApduType;
use crate::encoding::{reader::Reader, value::TaggedValue, writer::Writer};
use crate::{DecodeError, EncodeError};
use alloc::vec::Vec;

/// Unconfirmed service choices. Service ids outside this set decode to
/// [`DecodeError::NotImplemented`].
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnconfirmedService {
    IAm = 0,
    IHave = 1,
    CovNotification = 2,
    EventNotification = 3,
    PrivateTransfer = 4,
    TextMessage = 5,
    TimeSync = 6,
    WhoHas = 7,
    WhoIs = 8,
    UtcTimeSync = 9,
    WriteGroup = 10,
}

impl UnconfirmedService {
    pub fn from_u8(value: u8) -> Result<Self, DecodeError> {
        match value {
            0 => Ok(Self::IAm),
            1 => Ok(Self::IHave),
            2 => Ok(Self::CovNotification),
            3 => Ok(Self::EventNotification),
            4 => Ok(Self::PrivateTransfer),
            5 => Ok(Self::TextMessage),
            6 => Ok(Self::TimeSync),
            7 => Ok(Self::WhoHas),
            8 => Ok(Self::WhoIs),
            9 => Ok(Self::UtcTimeSync),
            10 => Ok(Self::WriteGroup),
            _ => Err(DecodeError::NotImplemented),
        }
    }
}

/// An Unconfirmed-Request APDU:
///
/// ```text
///   7   6   5   4   3   2   1   0
/// | PDU Type      | 0 | 0 | 0 | 0 |
/// | Service Choice                |
/// | Service Request ...           |
/// ```
///
/// Parameter decoding is service-specific and tag-order-sensitive; services
/// other than WhoIs and IAm are not implemented.
#[derive(Debug, Clone, PartialEq)]
pub struct UnconfirmedRequest {
    pub service: UnconfirmedService,
    pub parameters: Vec<TaggedValue>,
}

impl UnconfirmedRequest {
    pub fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        w.write_u8((ApduType::UnconfirmedRequest as u8) << 4)?;
        w.write_u8(self.service as u8)?;
        for parameter in &self.parameters {
            parameter.encode(w)?;
        }
        Ok(())
    }

    pub fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let b0 = r.read_u8()?;
        if (b0 >> 4) != ApduType::UnconfirmedRequest as u8 {
            return Err(DecodeError::InvalidData);
        }
        let service = UnconfirmedService::from_u8(r.read_u8()?)?;
        let parameters = match service {
            UnconfirmedService::WhoIs => decode_who_is_parameters(r)?,
            UnconfirmedService::IAm => decode_i_am_parameters(r)?,
            _ => return Err(DecodeError::NotImplemented),
        };
        Ok(Self {
            service,
            parameters,
        })
    }
}

// WhoIs: either no range at all, or a low limit at context tag 0 followed by
// a high limit at context tag 1.
fn decode_who_is_parameters(r: &mut Reader<'_>) -> Result<Vec<TaggedValue>, DecodeError> {
    if r.is_empty() {
        return Ok(Vec::new());
    }
    let low = expect_tag_number(TaggedValue::decode_context_unsigned(r)?, 0)?;
    let high = expect_tag_number(TaggedValue::decode_context_unsigned(r)?, 1)?;
    Ok([low, high].into())
}

// IAm: device object-id, max APDU length accepted, segmentation-supported
// flag, vendor id, at context tags 0 through 3.
fn decode_i_am_parameters(r: &mut Reader<'_>) -> Result<Vec<TaggedValue>, DecodeError> {
    let device_id = expect_tag_number(TaggedValue::decode_context_object_id(r)?, 0)?;
    let max_apdu = expect_tag_number(TaggedValue::decode_context_unsigned(r)?, 1)?;
    let segmentation = expect_tag_number(TaggedValue::decode_context_bool(r)?, 2)?;
    let vendor_id = expect_tag_number(TaggedValue::decode_context_unsigned(r)?, 3)?;
    Ok([device_id, max_apdu, segmentation, vendor_id].into())
}

fn expect_tag_number(value: TaggedValue, expected: u8) -> Result<TaggedValue, DecodeError> {
    if value.tag_number != expected {
        return Err(DecodeError::InvalidData);
    }
    Ok(value)
}
