use bacwire_core::encoding::{reader::Reader, writer::Writer};
use bacwire_core::{DecodeError, EncodeError};

/// The only BVLC type byte: BACnet/IP.
pub const BVLC_TYPE_BIP: u8 = 0x81;

/// Fixed header size; the on-wire length field includes it.
pub const BVLC_HEADER_LEN: usize = 4;

/// BVLC function codes this stack recognises. Foreign-device registration
/// and broadcast-distribution maintenance stop at recognition of their
/// decode-side table functions; anything else is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BvlcFunction {
    Result,
    WriteBroadcastDistributionTable,
    ReadBroadcastDistributionTable,
    ReadBroadcastDistributionTableAck,
    ForwardedNpdu,
    OriginalUnicastNpdu,
    OriginalBroadcastNpdu,
}

impl BvlcFunction {
    pub fn from_u8(value: u8) -> Result<Self, DecodeError> {
        match value {
            0x00 => Ok(Self::Result),
            0x01 => Ok(Self::WriteBroadcastDistributionTable),
            0x02 => Ok(Self::ReadBroadcastDistributionTable),
            0x03 => Ok(Self::ReadBroadcastDistributionTableAck),
            0x04 => Ok(Self::ForwardedNpdu),
            0x0A => Ok(Self::OriginalUnicastNpdu),
            0x0B => Ok(Self::OriginalBroadcastNpdu),
            _ => Err(DecodeError::InvalidData),
        }
    }

    pub const fn to_u8(self) -> u8 {
        match self {
            Self::Result => 0x00,
            Self::WriteBroadcastDistributionTable => 0x01,
            Self::ReadBroadcastDistributionTable => 0x02,
            Self::ReadBroadcastDistributionTableAck => 0x03,
            Self::ForwardedNpdu => 0x04,
            Self::OriginalUnicastNpdu => 0x0A,
            Self::OriginalBroadcastNpdu => 0x0B,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BvlcHeader {
    pub function: BvlcFunction,
    /// Total frame length including the 4-byte header, big-endian.
    pub length: u16,
}

impl BvlcHeader {
    pub fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        w.write_u8(BVLC_TYPE_BIP)?;
        w.write_u8(self.function.to_u8())?;
        w.write_be_u16(self.length)
    }

    pub fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        if r.read_u8()? != BVLC_TYPE_BIP {
            return Err(DecodeError::InvalidData);
        }
        let function = BvlcFunction::from_u8(r.read_u8()?)?;
        let length = r.read_be_u16()?;
        if (length as usize) < BVLC_HEADER_LEN {
            return Err(DecodeError::InvalidData);
        }
        Ok(Self { function, length })
    }
}

/// A complete BVLC frame: the function code plus its payload, usually an
/// encoded NPDU.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BvlcFrame {
    pub function: BvlcFunction,
    pub data: Vec<u8>,
}

impl BvlcFrame {
    pub fn new(function: BvlcFunction, data: Vec<u8>) -> Self {
        Self { function, data }
    }

    /// Writes the header with a placeholder length, appends the payload,
    /// then patches the total (header included) back in.
    pub fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        let start = w.position();
        w.write_u8(BVLC_TYPE_BIP)?;
        w.write_u8(self.function.to_u8())?;
        let length_mark = w.mark();
        w.write_be_u16(0)?;
        w.write_all(&self.data)?;
        let total =
            u16::try_from(w.position() - start).map_err(|_| EncodeError::ValueTooLarge)?;
        w.patch_be_u16(length_mark, total)
    }

    pub fn to_vec(&self) -> Result<Vec<u8>, EncodeError> {
        if BVLC_HEADER_LEN + self.data.len() > usize::from(u16::MAX) {
            return Err(EncodeError::ValueTooLarge);
        }
        let mut buf = vec![0u8; BVLC_HEADER_LEN + self.data.len()];
        let mut w = Writer::new(&mut buf);
        self.encode(&mut w)?;
        Ok(buf)
    }

    /// Decodes a datagram. Trailing bytes beyond the declared length are
    /// accepted when they are zero padding (some senders pad) and rejected
    /// otherwise.
    pub fn decode(datagram: &[u8]) -> Result<Self, DecodeError> {
        let mut r = Reader::new(datagram);
        let header = BvlcHeader::decode(&mut r)?;
        let data = r.read_exact(header.length as usize - BVLC_HEADER_LEN)?;
        if r.rest().iter().any(|&b| b != 0) {
            return Err(DecodeError::InvalidData);
        }
        Ok(Self {
            function: header.function,
            data: data.to_vec(),
        })
    }
}
