use crate::encoding::{reader::Reader, writer::Writer};
use crate::{DecodeError, EncodeError};

// The control byte of every tag:
//
//    7   6   5   4   3   2   1   0
//  |-- tag number --|cls|   lvt   |
//
// cls is 0 for the application class and 1 for context-specific. lvt is the
// payload length for most types; for an application boolean it is the value
// itself, and for context tags 6 and 7 mark opening/closing of a
// constructed value.

/// Application-class tag numbers double as the data-type discriminant.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppTag {
    Null = 0,
    Boolean = 1,
    UnsignedInt = 2,
    SignedInt = 3,
    Real = 4,
    Double = 5,
    OctetString = 6,
    CharacterString = 7,
    BitString = 8,
    Enumerated = 9,
    Date = 10,
    Time = 11,
    ObjectId = 12,
}

impl AppTag {
    pub fn from_u8(value: u8) -> Result<Self, DecodeError> {
        match value {
            0 => Ok(Self::Null),
            1 => Ok(Self::Boolean),
            2 => Ok(Self::UnsignedInt),
            3 => Ok(Self::SignedInt),
            4 => Ok(Self::Real),
            5 => Ok(Self::Double),
            6 => Ok(Self::OctetString),
            7 => Ok(Self::CharacterString),
            8 => Ok(Self::BitString),
            9 => Ok(Self::Enumerated),
            10 => Ok(Self::Date),
            11 => Ok(Self::Time),
            // 13-15 are reserved by ASHRAE
            12 => Ok(Self::ObjectId),
            _ => Err(DecodeError::InvalidData),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    Application { tag: AppTag, len: u32 },
    Context { tag_num: u8, len: u32 },
    Opening { tag_num: u8 },
    Closing { tag_num: u8 },
}

impl Tag {
    pub fn encode(self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        match self {
            Tag::Application { tag, len } => encode_with_meta(w, tag as u8, false, len),
            Tag::Context { tag_num, len } => encode_with_meta(w, tag_num, true, len),
            Tag::Opening { tag_num } => encode_open_close(w, tag_num, true),
            Tag::Closing { tag_num } => encode_open_close(w, tag_num, false),
        }
    }

    pub fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let first = r.read_u8()?;
        let class_context = (first & 0b0000_1000) != 0;

        let mut tag_num = (first >> 4) & 0x0F;
        if tag_num == 0x0F {
            tag_num = r.read_u8()?;
        }

        let lvt = first & 0x07;

        if class_context && lvt == 6 {
            return Ok(Tag::Opening { tag_num });
        }
        if class_context && lvt == 7 {
            return Ok(Tag::Closing { tag_num });
        }

        let len = decode_len(r, lvt)?;
        if class_context {
            Ok(Tag::Context { tag_num, len })
        } else {
            Ok(Tag::Application {
                tag: AppTag::from_u8(tag_num)?,
                len,
            })
        }
    }
}

// Returns true when the tag number overflows into a trailing byte.
fn encode_tag_number(first: &mut u8, tag_num: u8) -> Result<bool, EncodeError> {
    if tag_num > 254 {
        return Err(EncodeError::ValueTooLarge);
    }
    if tag_num < 15 {
        *first |= tag_num << 4;
        Ok(false)
    } else {
        *first |= 0xF0;
        Ok(true)
    }
}

fn encode_with_meta(
    w: &mut Writer<'_>,
    tag_num: u8,
    is_context: bool,
    len: u32,
) -> Result<(), EncodeError> {
    let mut first: u8 = 0;
    let overflow = encode_tag_number(&mut first, tag_num)?;

    if is_context {
        first |= 0b0000_1000;
    }

    let len_code = if len <= 4 { len as u8 } else { 5 };
    first |= len_code;
    w.write_u8(first)?;

    if overflow {
        w.write_u8(tag_num)?;
    }

    if len_code == 5 {
        if len <= 253 {
            w.write_u8(len as u8)?;
        } else if len <= 65535 {
            w.write_u8(254)?;
            w.write_be_u16(len as u16)?;
        } else {
            w.write_u8(255)?;
            w.write_be_u32(len)?;
        }
    }

    Ok(())
}

fn encode_open_close(w: &mut Writer<'_>, tag_num: u8, opening: bool) -> Result<(), EncodeError> {
    let mut first: u8 = 0b0000_1000;
    let overflow = encode_tag_number(&mut first, tag_num)?;

    first |= if opening { 6 } else { 7 };
    w.write_u8(first)?;

    if overflow {
        w.write_u8(tag_num)?;
    }

    Ok(())
}

fn decode_len(r: &mut Reader<'_>, lvt: u8) -> Result<u32, DecodeError> {
    match lvt {
        0..=4 => Ok(lvt as u32),
        5 => {
            let first = r.read_u8()?;
            if first <= 253 {
                Ok(first as u32)
            } else if first == 254 {
                Ok(r.read_be_u16()? as u32)
            } else {
                r.read_be_u32()
            }
        }
        _ => Err(DecodeError::InvalidData),
    }
}
