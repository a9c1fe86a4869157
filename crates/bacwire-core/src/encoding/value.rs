use crate::encoding::{
    primitives::{
        encode_app_object_id, encode_app_unsigned, encode_ctx_bool, encode_ctx_object_id,
        encode_ctx_unsigned,
    },
    reader::Reader,
    tag::{AppTag, Tag},
    writer::Writer,
};
use crate::types::ObjectId;
use crate::{DecodeError, EncodeError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagClass {
    Application,
    ContextSpecific,
}

/// Payload of a tagged parameter.
///
/// Signed integers, reals, doubles, octet strings, character strings, bit
/// strings, enumerations, dates and times are recognised by their tags but
/// decode to [`DecodeError::NotImplemented`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamValue {
    Null,
    Boolean(bool),
    Unsigned(u64),
    ObjectId(ObjectId),
}

impl ParamValue {
    /// The application-class tag number for this payload type.
    const fn app_tag(self) -> AppTag {
        match self {
            Self::Null => AppTag::Null,
            Self::Boolean(_) => AppTag::Boolean,
            Self::Unsigned(_) => AppTag::UnsignedInt,
            Self::ObjectId(_) => AppTag::ObjectId,
        }
    }
}

/// A tagged parameter: class and tag number in the common part, the payload
/// in [`ParamValue`].
///
/// Application-class values use the tag number as the data-type
/// discriminant; context-specific values use it as a position marker
/// assigned by the service definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaggedValue {
    pub class: TagClass,
    pub tag_number: u8,
    pub value: ParamValue,
}

impl TaggedValue {
    pub fn application(value: ParamValue) -> Self {
        Self {
            class: TagClass::Application,
            tag_number: value.app_tag() as u8,
            value,
        }
    }

    pub const fn context_null(tag_number: u8) -> Self {
        Self {
            class: TagClass::ContextSpecific,
            tag_number,
            value: ParamValue::Null,
        }
    }

    pub const fn context_bool(tag_number: u8, value: bool) -> Self {
        Self {
            class: TagClass::ContextSpecific,
            tag_number,
            value: ParamValue::Boolean(value),
        }
    }

    pub const fn context_unsigned(tag_number: u8, value: u64) -> Self {
        Self {
            class: TagClass::ContextSpecific,
            tag_number,
            value: ParamValue::Unsigned(value),
        }
    }

    pub const fn context_object_id(tag_number: u8, value: ObjectId) -> Self {
        Self {
            class: TagClass::ContextSpecific,
            tag_number,
            value: ParamValue::ObjectId(value),
        }
    }

    pub fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        match self.class {
            TagClass::Application => self.encode_application(w),
            TagClass::ContextSpecific => self.encode_context(w),
        }
    }

    fn encode_application(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        if self.tag_number != self.value.app_tag() as u8 {
            return Err(EncodeError::InvalidData);
        }
        match self.value {
            // Null and boolean live entirely in the control byte.
            ParamValue::Null => Tag::Application {
                tag: AppTag::Null,
                len: 0,
            }
            .encode(w),
            ParamValue::Boolean(v) => Tag::Application {
                tag: AppTag::Boolean,
                len: v as u32,
            }
            .encode(w),
            ParamValue::Unsigned(v) => encode_app_unsigned(w, v),
            ParamValue::ObjectId(id) => encode_app_object_id(w, id),
        }
    }

    fn encode_context(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        let tag_num = self.tag_number;
        match self.value {
            ParamValue::Null => Tag::Context { tag_num, len: 0 }.encode(w),
            ParamValue::Boolean(v) => encode_ctx_bool(w, tag_num, v),
            ParamValue::Unsigned(v) => encode_ctx_unsigned(w, tag_num, v),
            ParamValue::ObjectId(id) => encode_ctx_object_id(w, tag_num, id),
        }
    }

    /// Decodes a self-describing application-class value.
    pub fn decode_application(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let (tag, len) = match Tag::decode(r)? {
            Tag::Application { tag, len } => (tag, len),
            _ => return Err(DecodeError::InvalidData),
        };
        let value = match tag {
            AppTag::Null => {
                if len != 0 {
                    return Err(DecodeError::InvalidData);
                }
                ParamValue::Null
            }
            AppTag::Boolean => match len {
                0 => ParamValue::Boolean(false),
                1 => ParamValue::Boolean(true),
                _ => return Err(DecodeError::InvalidData),
            },
            AppTag::UnsignedInt => ParamValue::Unsigned(r.read_unsigned(len as usize)?),
            AppTag::ObjectId => {
                if len != 4 {
                    return Err(DecodeError::InvalidData);
                }
                ParamValue::ObjectId(ObjectId::from_raw(r.read_be_u32()?))
            }
            _ => return Err(DecodeError::NotImplemented),
        };
        Ok(Self {
            class: TagClass::Application,
            tag_number: tag as u8,
            value,
        })
    }

    /// Decodes a context-specific unsigned integer. The data type is implied
    /// by the service and parameter position, so the caller picks the
    /// decoder.
    pub fn decode_context_unsigned(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let (tag_num, len) = expect_context_tag(r)?;
        Ok(Self::context_unsigned(
            tag_num,
            r.read_unsigned(len as usize)?,
        ))
    }

    /// Decodes a context-specific boolean: exactly one payload byte, 0 or 1.
    pub fn decode_context_bool(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let (tag_num, len) = expect_context_tag(r)?;
        if len != 1 {
            return Err(DecodeError::InvalidData);
        }
        let value = match r.read_u8()? {
            0 => false,
            1 => true,
            _ => return Err(DecodeError::InvalidData),
        };
        Ok(Self::context_bool(tag_num, value))
    }

    /// Decodes a context-specific object identifier (always 4 bytes).
    pub fn decode_context_object_id(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let (tag_num, len) = expect_context_tag(r)?;
        if len != 4 {
            return Err(DecodeError::InvalidData);
        }
        Ok(Self::context_object_id(
            tag_num,
            ObjectId::from_raw(r.read_be_u32()?),
        ))
    }
}

fn expect_context_tag(r: &mut Reader<'_>) -> Result<(u8, u32), DecodeError> {
    match Tag::decode(r)? {
        Tag::Context { tag_num, len } => Ok((tag_num, len)),
        _ => Err(DecodeError::InvalidData),
    }
}

#[cfg(test)]
mod tests {
    use super::{ParamValue, TaggedValue};
    use crate::encoding::{reader::Reader, writer::Writer};
    use crate::types::ObjectId;
    use crate::DecodeError;
    use proptest::prelude::*;

    fn encode_to_vec(value: &TaggedValue) -> Vec<u8> {
        let mut buf = [0u8; 32];
        let mut w = Writer::new(&mut buf);
        value.encode(&mut w).unwrap();
        w.as_written().to_vec()
    }

    #[test]
    fn context_bool_fixtures() {
        assert_eq!(
            encode_to_vec(&TaggedValue::context_bool(2, true)),
            [0x29, 0x01]
        );
        assert_eq!(
            encode_to_vec(&TaggedValue::context_bool(96, true)),
            [0xF9, 0x60, 0x01]
        );
        assert_eq!(
            encode_to_vec(&TaggedValue::context_bool(1, false)),
            [0x19, 0x00]
        );
    }

    #[test]
    fn context_bool_roundtrip() {
        for v in [
            TaggedValue::context_bool(2, true),
            TaggedValue::context_bool(96, true),
            TaggedValue::context_bool(1, false),
        ] {
            let bytes = encode_to_vec(&v);
            let mut r = Reader::new(&bytes);
            assert_eq!(TaggedValue::decode_context_bool(&mut r).unwrap(), v);
        }
    }

    #[test]
    fn context_bool_rejects_wrong_length() {
        // length 2 where the type requires exactly 1
        let mut r = Reader::new(&[0x2A, 0x00, 0x01]);
        assert_eq!(
            TaggedValue::decode_context_bool(&mut r).unwrap_err(),
            DecodeError::InvalidData
        );
    }

    #[test]
    fn context_object_id_fixture() {
        let id = ObjectId::new(1, 0x32).unwrap();
        assert_eq!(
            encode_to_vec(&TaggedValue::context_object_id(2, id)),
            [0x2C, 0x00, 0x40, 0x00, 0x32]
        );

        let mut r = Reader::new(&[0x2C, 0x00, 0x40, 0x00, 0x32]);
        let decoded = TaggedValue::decode_context_object_id(&mut r).unwrap();
        assert_eq!(decoded, TaggedValue::context_object_id(2, id));
        match decoded.value {
            ParamValue::ObjectId(got) => {
                assert_eq!(got.object_type(), 1);
                assert_eq!(got.instance(), 0x32);
            }
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn application_bool_lives_in_the_control_byte() {
        assert_eq!(
            encode_to_vec(&TaggedValue::application(ParamValue::Boolean(true))),
            [0x11]
        );
        assert_eq!(
            encode_to_vec(&TaggedValue::application(ParamValue::Boolean(false))),
            [0x10]
        );
        assert_eq!(
            encode_to_vec(&TaggedValue::application(ParamValue::Null)),
            [0x00]
        );
    }

    #[test]
    fn unimplemented_application_types_decode_to_not_implemented() {
        // application real, length 4
        let mut r = Reader::new(&[0x44, 0x42, 0x20, 0x00, 0x00]);
        assert_eq!(
            TaggedValue::decode_application(&mut r).unwrap_err(),
            DecodeError::NotImplemented
        );
    }

    #[test]
    fn context_tag_where_application_is_required_is_invalid() {
        let mut r = Reader::new(&[0x29, 0x01]);
        assert_eq!(
            TaggedValue::decode_application(&mut r).unwrap_err(),
            DecodeError::InvalidData
        );
    }

    proptest! {
        #[test]
        fn tagged_value_roundtrip(tag_num in 0u8..=254, v in any::<u64>()) {
            let value = TaggedValue::context_unsigned(tag_num, v);
            let bytes = encode_to_vec(&value);
            let mut r = Reader::new(&bytes);
            prop_assert_eq!(TaggedValue::decode_context_unsigned(&mut r).unwrap(), value);
        }

        #[test]
        fn application_roundtrip(v in any::<u64>()) {
            for value in [
                TaggedValue::application(ParamValue::Unsigned(v)),
                TaggedValue::application(ParamValue::Boolean(v % 2 == 0)),
                TaggedValue::application(ParamValue::Null),
                TaggedValue::application(ParamValue::ObjectId(ObjectId::from_raw(v as u32))),
            ] {
                let bytes = encode_to_vec(&value);
                let mut r = Reader::new(&bytes);
                prop_assert_eq!(TaggedValue::decode_application(&mut r).unwrap(), value);
            }
        }
    }
}
