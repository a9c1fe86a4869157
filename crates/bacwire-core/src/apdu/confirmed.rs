use crate::apdu::ApduType;
use crate::encoding::{
    primitives::encode_app_enumerated,
    reader::Reader,
    tag::{AppTag, Tag},
    writer::Writer,
};
use crate::{DecodeError, EncodeError};
use alloc::vec::Vec;

/// A Confirmed-Request APDU.
///
/// ```text
///   7   6   5   4   3   2   1   0
/// | PDU Type      |SEG|MOR| SA| 0 |
/// | 0 | Max Segs  | Max Resp      |
/// | Invoke ID                     |
/// | Sequence Number               |  iff SEG
/// | Proposed Window Size          |  iff SEG
/// | Service Choice                |
/// | Service Request ...           |
/// ```
///
/// The segmentation flags round-trip, but nothing here reassembles
/// segments; `service_data` is carried opaque.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfirmedRequest {
    pub segmented: bool,
    pub more_follows: bool,
    pub segmented_response_accepted: bool,
    /// Encoded index, 0..=7.
    pub max_segments: u8,
    /// Encoded index, 0..=8.
    pub max_apdu: u8,
    pub invoke_id: u8,
    pub sequence_number: Option<u8>,
    pub proposed_window_size: Option<u8>,
    pub service_choice: u8,
    pub service_data: Vec<u8>,
}

impl ConfirmedRequest {
    pub fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        if self.max_segments > 7 || self.max_apdu > 8 {
            return Err(EncodeError::InvalidData);
        }
        let mut b0 = (ApduType::ConfirmedRequest as u8) << 4;
        if self.segmented {
            b0 |= 0b0000_1000;
        }
        if self.more_follows {
            b0 |= 0b0000_0100;
        }
        if self.segmented_response_accepted {
            b0 |= 0b0000_0010;
        }

        w.write_u8(b0)?;
        w.write_u8((self.max_segments << 4) | (self.max_apdu & 0x0F))?;
        w.write_u8(self.invoke_id)?;
        if self.segmented {
            w.write_u8(self.sequence_number.unwrap_or(0))?;
            w.write_u8(self.proposed_window_size.unwrap_or(1))?;
        }
        w.write_u8(self.service_choice)?;
        w.write_all(&self.service_data)
    }

    pub fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let b0 = r.read_u8()?;
        if (b0 >> 4) != ApduType::ConfirmedRequest as u8 {
            return Err(DecodeError::InvalidData);
        }
        let segmented = (b0 & 0b0000_1000) != 0;
        let more_follows = (b0 & 0b0000_0100) != 0;
        let segmented_response_accepted = (b0 & 0b0000_0010) != 0;
        let seg_apdu = r.read_u8()?;
        let invoke_id = r.read_u8()?;
        let (sequence_number, proposed_window_size) = if segmented {
            (Some(r.read_u8()?), Some(r.read_u8()?))
        } else {
            (None, None)
        };
        let service_choice = r.read_u8()?;
        Ok(Self {
            segmented,
            more_follows,
            segmented_response_accepted,
            max_segments: (seg_apdu >> 4) & 0x07,
            max_apdu: seg_apdu & 0x0F,
            invoke_id,
            sequence_number,
            proposed_window_size,
            service_choice,
            service_data: r.rest().to_vec(),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComplexAck {
    pub segmented: bool,
    pub more_follows: bool,
    pub invoke_id: u8,
    pub sequence_number: Option<u8>,
    pub proposed_window_size: Option<u8>,
    pub service_choice: u8,
    pub service_data: Vec<u8>,
}

impl ComplexAck {
    pub fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        let mut b0 = (ApduType::ComplexAck as u8) << 4;
        if self.segmented {
            b0 |= 0b0000_1000;
        }
        if self.more_follows {
            b0 |= 0b0000_0100;
        }
        w.write_u8(b0)?;
        w.write_u8(self.invoke_id)?;
        if self.segmented {
            w.write_u8(self.sequence_number.unwrap_or(0))?;
            w.write_u8(self.proposed_window_size.unwrap_or(1))?;
        }
        w.write_u8(self.service_choice)?;
        w.write_all(&self.service_data)
    }

    pub fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let b0 = r.read_u8()?;
        if (b0 >> 4) != ApduType::ComplexAck as u8 {
            return Err(DecodeError::InvalidData);
        }
        let segmented = (b0 & 0b0000_1000) != 0;
        let more_follows = (b0 & 0b0000_0100) != 0;
        let invoke_id = r.read_u8()?;
        let (sequence_number, proposed_window_size) = if segmented {
            (Some(r.read_u8()?), Some(r.read_u8()?))
        } else {
            (None, None)
        };
        let service_choice = r.read_u8()?;
        Ok(Self {
            segmented,
            more_follows,
            invoke_id,
            sequence_number,
            proposed_window_size,
            service_choice,
            service_data: r.rest().to_vec(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentAck {
    pub negative_ack: bool,
    pub sent_by_server: bool,
    pub invoke_id: u8,
    pub sequence_number: u8,
    pub actual_window_size: u8,
}

impl SegmentAck {
    pub fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        let mut b0 = (ApduType::SegmentAck as u8) << 4;
        if self.negative_ack {
            b0 |= 0b0000_0010;
        }
        if self.sent_by_server {
            b0 |= 0b0000_0001;
        }
        w.write_u8(b0)?;
        w.write_u8(self.invoke_id)?;
        w.write_u8(self.sequence_number)?;
        w.write_u8(self.actual_window_size)
    }

    pub fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let b0 = r.read_u8()?;
        if (b0 >> 4) != ApduType::SegmentAck as u8 {
            return Err(DecodeError::InvalidData);
        }
        Ok(Self {
            negative_ack: (b0 & 0b0000_0010) != 0,
            sent_by_server: (b0 & 0b0000_0001) != 0,
            invoke_id: r.read_u8()?,
            sequence_number: r.read_u8()?,
            actual_window_size: r.read_u8()?,
        })
    }
}

/// An Error PDU. The class and code are absent on some malformed senders,
/// and arrive either as bare values or wrapped in an opening/closing tag
/// pair; both forms decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorPdu {
    pub invoke_id: u8,
    pub service_choice: u8,
    pub error_class: Option<u64>,
    pub error_code: Option<u64>,
}

impl ErrorPdu {
    pub fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        w.write_u8((ApduType::Error as u8) << 4)?;
        w.write_u8(self.invoke_id)?;
        w.write_u8(self.service_choice)?;
        match (self.error_class, self.error_code) {
            (Some(class), Some(code)) => {
                encode_app_enumerated(w, class)?;
                encode_app_enumerated(w, code)
            }
            (None, None) => Ok(()),
            _ => Err(EncodeError::InvalidData),
        }
    }

    pub fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let b0 = r.read_u8()?;
        if (b0 >> 4) != ApduType::Error as u8 {
            return Err(DecodeError::InvalidData);
        }
        let invoke_id = r.read_u8()?;
        let service_choice = r.read_u8()?;
        let mut error_class = None;
        let mut error_code = None;
        if !r.is_empty() {
            match Tag::decode(r)? {
                Tag::Opening { tag_num: 0 } => {
                    let class_tag = Tag::decode(r)?;
                    error_class = Some(decode_error_value(r, class_tag, 0)?);
                    let code_tag = Tag::decode(r)?;
                    error_code = Some(decode_error_value(r, code_tag, 1)?);
                    match Tag::decode(r)? {
                        Tag::Closing { tag_num: 0 } => {}
                        _ => return Err(DecodeError::InvalidData),
                    }
                }
                first_tag => {
                    error_class = Some(decode_error_value(r, first_tag, 0)?);
                    let second_tag = Tag::decode(r)?;
                    error_code = Some(decode_error_value(r, second_tag, 1)?);
                }
            }
        }
        Ok(Self {
            invoke_id,
            service_choice,
            error_class,
            error_code,
        })
    }
}

fn decode_error_value(
    r: &mut Reader<'_>,
    tag: Tag,
    expected_ctx_tag: u8,
) -> Result<u64, DecodeError> {
    match tag {
        Tag::Context { tag_num, len } if tag_num == expected_ctx_tag => {
            r.read_unsigned(len as usize)
        }
        Tag::Application {
            tag: AppTag::Enumerated,
            len,
        } => r.read_unsigned(len as usize),
        _ => Err(DecodeError::InvalidData),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RejectPdu {
    pub invoke_id: u8,
    pub reason: u8,
}

impl RejectPdu {
    pub fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        w.write_u8((ApduType::Reject as u8) << 4)?;
        w.write_u8(self.invoke_id)?;
        w.write_u8(self.reason)
    }

    pub fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let b0 = r.read_u8()?;
        if (b0 >> 4) != ApduType::Reject as u8 {
            return Err(DecodeError::InvalidData);
        }
        Ok(Self {
            invoke_id: r.read_u8()?,
            reason: r.read_u8()?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AbortPdu {
    pub server: bool,
    pub invoke_id: u8,
    pub reason: u8,
}

impl AbortPdu {
    pub fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        let mut b0 = (ApduType::Abort as u8) << 4;
        if self.server {
            b0 |= 0x01;
        }
        w.write_u8(b0)?;
        w.write_u8(self.invoke_id)?;
        w.write_u8(self.reason)
    }

    pub fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let b0 = r.read_u8()?;
        if (b0 >> 4) != ApduType::Abort as u8 {
            return Err(DecodeError::InvalidData);
        }
        Ok(Self {
            server: (b0 & 0x01) != 0,
            invoke_id: r.read_u8()?,
            reason: r.read_u8()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{AbortPdu, ConfirmedRequest, ErrorPdu, RejectPdu, SegmentAck};
    use crate::encoding::{reader::Reader, writer::Writer};
    use crate::EncodeError;

    #[test]
    fn confirmed_request_roundtrip_unsegmented() {
        let request = ConfirmedRequest {
            segmented: false,
            more_follows: false,
            segmented_response_accepted: true,
            max_segments: 0,
            max_apdu: 5,
            invoke_id: 42,
            sequence_number: None,
            proposed_window_size: None,
            service_choice: 12,
            service_data: vec![0x09, 0x01],
        };

        let mut buf = [0u8; 32];
        let mut w = Writer::new(&mut buf);
        request.encode(&mut w).unwrap();
        assert_eq!(w.as_written()[0], 0x02);
        assert_eq!(w.as_written()[1], 0x05);

        let mut r = Reader::new(w.as_written());
        assert_eq!(ConfirmedRequest::decode(&mut r).unwrap(), request);
    }

    #[test]
    fn confirmed_request_roundtrip_segmented() {
        let request = ConfirmedRequest {
            segmented: true,
            more_follows: true,
            segmented_response_accepted: false,
            max_segments: 3,
            max_apdu: 4,
            invoke_id: 7,
            sequence_number: Some(2),
            proposed_window_size: Some(16),
            service_choice: 15,
            service_data: vec![],
        };

        let mut buf = [0u8; 32];
        let mut w = Writer::new(&mut buf);
        request.encode(&mut w).unwrap();
        assert_eq!(w.as_written()[0], 0x0C);

        let mut r = Reader::new(w.as_written());
        assert_eq!(ConfirmedRequest::decode(&mut r).unwrap(), request);
    }

    #[test]
    fn confirmed_request_rejects_out_of_range_indices() {
        let mut request = ConfirmedRequest {
            segmented: false,
            more_follows: false,
            segmented_response_accepted: false,
            max_segments: 8,
            max_apdu: 0,
            invoke_id: 0,
            sequence_number: None,
            proposed_window_size: None,
            service_choice: 0,
            service_data: vec![],
        };
        let mut buf = [0u8; 16];
        let mut w = Writer::new(&mut buf);
        assert_eq!(request.encode(&mut w).unwrap_err(), EncodeError::InvalidData);

        request.max_segments = 0;
        request.max_apdu = 9;
        let mut w = Writer::new(&mut buf);
        assert_eq!(request.encode(&mut w).unwrap_err(), EncodeError::InvalidData);
    }

    #[test]
    fn error_pdu_decodes_without_details() {
        let mut r = Reader::new(&[0x50, 1, 15]);
        let e = ErrorPdu::decode(&mut r).unwrap();
        assert_eq!(e.invoke_id, 1);
        assert_eq!(e.service_choice, 15);
        assert_eq!(e.error_class, None);
        assert_eq!(e.error_code, None);
    }

    #[test]
    fn error_pdu_decodes_context_tagged_details() {
        let mut r = Reader::new(&[0x50, 1, 15, 0x09, 0x02, 0x19, 0x20]);
        let e = ErrorPdu::decode(&mut r).unwrap();
        assert_eq!(e.error_class, Some(2));
        assert_eq!(e.error_code, Some(32));
    }

    #[test]
    fn error_pdu_roundtrips_application_enumerated_details() {
        let pdu = ErrorPdu {
            invoke_id: 1,
            service_choice: 15,
            error_class: Some(2),
            error_code: Some(32),
        };
        let mut buf = [0u8; 16];
        let mut w = Writer::new(&mut buf);
        pdu.encode(&mut w).unwrap();
        assert_eq!(w.as_written(), &[0x50, 1, 15, 0x91, 0x02, 0x91, 0x20]);

        let mut r = Reader::new(w.as_written());
        assert_eq!(ErrorPdu::decode(&mut r).unwrap(), pdu);
    }

    #[test]
    fn error_pdu_decodes_opening_wrapped_details() {
        let mut r = Reader::new(&[0x50, 1, 15, 0x0E, 0x91, 0x02, 0x91, 0x20, 0x0F]);
        let e = ErrorPdu::decode(&mut r).unwrap();
        assert_eq!(e.error_class, Some(2));
        assert_eq!(e.error_code, Some(32));
    }

    #[test]
    fn segment_ack_roundtrip() {
        let ack = SegmentAck {
            negative_ack: true,
            sent_by_server: false,
            invoke_id: 9,
            sequence_number: 4,
            actual_window_size: 8,
        };
        let mut buf = [0u8; 8];
        let mut w = Writer::new(&mut buf);
        ack.encode(&mut w).unwrap();
        let mut r = Reader::new(w.as_written());
        assert_eq!(SegmentAck::decode(&mut r).unwrap(), ack);
    }

    #[test]
    fn reject_and_abort_roundtrip() {
        let reject = RejectPdu {
            invoke_id: 3,
            reason: 9,
        };
        let mut buf = [0u8; 8];
        let mut w = Writer::new(&mut buf);
        reject.encode(&mut w).unwrap();
        let mut r = Reader::new(w.as_written());
        assert_eq!(RejectPdu::decode(&mut r).unwrap(), reject);

        let abort = AbortPdu {
            server: true,
            invoke_id: 3,
            reason: 4,
        };
        let mut w = Writer::new(&mut buf);
        abort.encode(&mut w).unwrap();
        let mut r = Reader::new(w.as_written());
        assert_eq!(AbortPdu::decode(&mut r).unwrap(), abort);
    }
}
