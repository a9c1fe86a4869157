use crate::apdu::{UnconfirmedRequest, UnconfirmedService};
use crate::encoding::value::{ParamValue, TaggedValue};
use crate::encoding::writer::Writer;
use crate::types::ObjectId;
use crate::{DecodeError, EncodeError};

/// IAm device-announcement request: the device's object identifier, the
/// largest APDU it accepts, whether it supports segmentation, and its
/// vendor id, at context tags 0 through 3.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IAmRequest {
    pub device_id: ObjectId,
    pub max_apdu_length_accepted: u64,
    pub segmentation_supported: bool,
    pub vendor_id: u16,
}

impl IAmRequest {
    pub fn to_request(&self) -> UnconfirmedRequest {
        UnconfirmedRequest {
            service: UnconfirmedService::IAm,
            parameters: [
                TaggedValue::context_object_id(0, self.device_id),
                TaggedValue::context_unsigned(1, self.max_apdu_length_accepted),
                TaggedValue::context_bool(2, self.segmentation_supported),
                TaggedValue::context_unsigned(3, self.vendor_id as u64),
            ]
            .into(),
        }
    }

    pub fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        self.to_request().encode(w)
    }

    pub fn from_request(request: &UnconfirmedRequest) -> Result<Self, DecodeError> {
        if request.service != UnconfirmedService::IAm {
            return Err(DecodeError::InvalidData);
        }
        match request.parameters.as_slice() {
            [device, max_apdu, segmentation, vendor] => {
                match (
                    device.value,
                    max_apdu.value,
                    segmentation.value,
                    vendor.value,
                ) {
                    (
                        ParamValue::ObjectId(device_id),
                        ParamValue::Unsigned(max_apdu_length_accepted),
                        ParamValue::Boolean(segmentation_supported),
                        ParamValue::Unsigned(vendor_id),
                    ) => Ok(Self {
                        device_id,
                        max_apdu_length_accepted,
                        segmentation_supported,
                        vendor_id: u16::try_from(vendor_id)
                            .map_err(|_| DecodeError::InvalidData)?,
                    }),
                    _ => Err(DecodeError::InvalidData),
                }
            }
            _ => Err(DecodeError::InvalidData),
        }
    }
}
