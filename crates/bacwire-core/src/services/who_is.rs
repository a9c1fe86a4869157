use crate::apdu::{UnconfirmedRequest, UnconfirmedService};
use crate::encoding::value::{ParamValue, TaggedValue};
use crate::encoding::writer::Writer;
use crate::{DecodeError, EncodeError};
use alloc::vec::Vec;

/// WhoIs device-discovery request. The instance-range limits are optional
/// but must be given together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WhoIsRequest {
    pub low_limit: Option<u64>,
    pub high_limit: Option<u64>,
}

impl WhoIsRequest {
    pub const fn global() -> Self {
        Self {
            low_limit: None,
            high_limit: None,
        }
    }

    pub const fn range(low: u64, high: u64) -> Self {
        Self {
            low_limit: Some(low),
            high_limit: Some(high),
        }
    }

    pub fn to_request(&self) -> Result<UnconfirmedRequest, EncodeError> {
        let parameters: Vec<TaggedValue> = match (self.low_limit, self.high_limit) {
            (Some(low), Some(high)) => [
                TaggedValue::context_unsigned(0, low),
                TaggedValue::context_unsigned(1, high),
            ]
            .into(),
            (None, None) => Vec::new(),
            _ => return Err(EncodeError::InvalidData),
        };
        Ok(UnconfirmedRequest {
            service: UnconfirmedService::WhoIs,
            parameters,
        })
    }

    pub fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        self.to_request()?.encode(w)
    }

    pub fn from_request(request: &UnconfirmedRequest) -> Result<Self, DecodeError> {
        if request.service != UnconfirmedService::WhoIs {
            return Err(DecodeError::InvalidData);
        }
        match request.parameters.as_slice() {
            [] => Ok(Self::global()),
            [low, high] => match (low.value, high.value) {
                (ParamValue::Unsigned(low), ParamValue::Unsigned(high)) => {
                    Ok(Self::range(low, high))
                }
                _ => Err(DecodeError::InvalidData),
            },
            _ => Err(DecodeError::InvalidData),
        }
    }
}
