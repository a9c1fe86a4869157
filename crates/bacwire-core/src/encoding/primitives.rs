use crate::encoding::{
    reader::Reader,
    tag::{AppTag, Tag},
    writer::Writer,
};
use crate::types::ObjectId;
use crate::{DecodeError, EncodeError};

/// Smallest number of bytes (1..=8) that can hold `value` big-endian.
///
/// BACnet transmits unsigned integers in the minimum width per call: a
/// 64-bit value of 0x05 goes on the wire as a single byte. Encoders pick
/// the width here and record it in the tag; decoders read it back with
/// [`Reader::read_unsigned`].
pub const fn byte_size(value: u64) -> usize {
    if value <= 0xFF {
        1
    } else if value <= 0xFFFF {
        2
    } else if value <= 0xFF_FFFF {
        3
    } else if value <= 0xFFFF_FFFF {
        4
    } else if value <= 0xFF_FFFF_FFFF {
        5
    } else if value <= 0xFFFF_FFFF_FFFF {
        6
    } else if value <= 0xFF_FFFF_FFFF_FFFF {
        7
    } else {
        8
    }
}

pub fn encode_ctx_unsigned(w: &mut Writer<'_>, tag_num: u8, value: u64) -> Result<(), EncodeError> {
    let width = byte_size(value);
    Tag::Context {
        tag_num,
        len: width as u32,
    }
    .encode(w)?;
    w.write_unsigned(value, width)
}

/// Context boolean: one payload byte, 0 or 1 (unlike the application class,
/// where the value lives in the control byte).
pub fn encode_ctx_bool(w: &mut Writer<'_>, tag_num: u8, value: bool) -> Result<(), EncodeError> {
    Tag::Context { tag_num, len: 1 }.encode(w)?;
    w.write_u8(value as u8)
}

pub fn encode_ctx_object_id(
    w: &mut Writer<'_>,
    tag_num: u8,
    object_id: ObjectId,
) -> Result<(), EncodeError> {
    Tag::Context { tag_num, len: 4 }.encode(w)?;
    w.write_be_u32(object_id.raw())
}

pub fn encode_app_unsigned(w: &mut Writer<'_>, value: u64) -> Result<(), EncodeError> {
    encode_app_unsigned_like(w, AppTag::UnsignedInt, value)
}

pub fn encode_app_enumerated(w: &mut Writer<'_>, value: u64) -> Result<(), EncodeError> {
    encode_app_unsigned_like(w, AppTag::Enumerated, value)
}

pub fn encode_app_object_id(w: &mut Writer<'_>, object_id: ObjectId) -> Result<(), EncodeError> {
    Tag::Application {
        tag: AppTag::ObjectId,
        len: 4,
    }
    .encode(w)?;
    w.write_be_u32(object_id.raw())
}

fn encode_app_unsigned_like(w: &mut Writer<'_>, tag: AppTag, value: u64) -> Result<(), EncodeError> {
    let width = byte_size(value);
    Tag::Application {
        tag,
        len: width as u32,
    }
    .encode(w)?;
    w.write_unsigned(value, width)
}

pub fn decode_app_unsigned(r: &mut Reader<'_>) -> Result<u64, DecodeError> {
    match Tag::decode(r)? {
        Tag::Application {
            tag: AppTag::UnsignedInt,
            len,
        } => r.read_unsigned(len as usize),
        _ => Err(DecodeError::InvalidData),
    }
}
