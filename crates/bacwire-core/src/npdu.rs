use crate::encoding::{reader::Reader, writer::Writer};
use crate::{DecodeError, EncodeError};
use alloc::vec::Vec;

/// BACnet network layer protocol version (always `0x01`).
pub const PROTOCOL_VERSION: u8 = 0x01;

/// Hop count written when a destination is present and the caller gave none.
pub const DEFAULT_HOP_COUNT: u8 = 0xFF;

/// Network-layer message types, carried when control bit 7 is set.
/// 0x14..=0x7F are reserved by ASHRAE; 0x80..=0xFF are vendor proprietary
/// and carry a vendor id.
pub mod message_type {
    pub const WHO_IS_ROUTER_TO_NETWORK: u8 = 0x00;
    pub const I_AM_ROUTER_TO_NETWORK: u8 = 0x01;
    pub const I_COULD_BE_ROUTER_TO_NETWORK: u8 = 0x02;
    pub const REJECT_MESSAGE_TO_NETWORK: u8 = 0x03;
    pub const ROUTER_BUSY_TO_NETWORK: u8 = 0x04;
    pub const ROUTER_AVAILABLE_TO_NETWORK: u8 = 0x05;
    pub const INITIALIZE_ROUTING_TABLE: u8 = 0x06;
    pub const INITIALIZE_ROUTING_TABLE_ACK: u8 = 0x07;
    pub const ESTABLISH_CONNECTION_TO_NETWORK: u8 = 0x08;
    pub const DISCONNECT_CONNECTION_TO_NETWORK: u8 = 0x09;
    pub const WHAT_IS_NETWORK_NUMBER: u8 = 0x12;
    pub const NETWORK_NUMBER_IS: u8 = 0x13;
    pub const VENDOR_PROPRIETARY_START: u8 = 0x80;
}

/// Message priority from the low two bits of the control byte.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    Normal = 0,
    Urgent = 1,
    CriticalEquipment = 2,
    LifeSafety = 3,
}

impl Priority {
    pub const fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0 => Self::Normal,
            1 => Self::Urgent,
            2 => Self::CriticalEquipment,
            _ => Self::LifeSafety,
        }
    }
}

/// A network-layer address: network number plus a variable-length MAC.
/// A MAC length of zero is the broadcast marker and carries no bytes;
/// network 0xFFFF in a destination means global broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NpduAddress {
    pub network: u16,
    mac: [u8; 8],
    mac_len: u8,
}

impl NpduAddress {
    pub const GLOBAL_BROADCAST_NETWORK: u16 = 0xFFFF;

    pub fn new(network: u16, mac: &[u8]) -> Result<Self, EncodeError> {
        if mac.len() > 8 {
            return Err(EncodeError::InvalidData);
        }
        let mut buf = [0u8; 8];
        buf[..mac.len()].copy_from_slice(mac);
        Ok(Self {
            network,
            mac: buf,
            mac_len: mac.len() as u8,
        })
    }

    pub const fn broadcast(network: u16) -> Self {
        Self {
            network,
            mac: [0; 8],
            mac_len: 0,
        }
    }

    pub fn mac(&self) -> &[u8] {
        &self.mac[..self.mac_len as usize]
    }

    pub const fn is_broadcast(&self) -> bool {
        self.mac_len == 0
    }
}

/// What follows the NPDU header: a network-layer message or an encoded APDU,
/// never both and never neither.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NpduContent {
    Network {
        message_type: u8,
        /// Required iff `message_type` is vendor proprietary (>= 0x80).
        vendor_id: Option<u16>,
    },
    Application(Vec<u8>),
}

/// BACnet Network Protocol Data Unit.
///
/// The control byte is derived from the fields on encode:
///
/// ```text
///   7   6   5   4   3   2   1   0
/// | N | r | D | r | S | C | Prio  |
/// ```
///
/// N selects [`NpduContent::Network`], D/S mirror the presence of the
/// destination/source addresses, C is the expecting-reply flag, and the
/// reserved bits encode as zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Npdu {
    pub priority: Priority,
    pub expecting_reply: bool,
    pub destination: Option<NpduAddress>,
    pub source: Option<NpduAddress>,
    /// Encoded iff a destination is present; [`DEFAULT_HOP_COUNT`] when unset.
    pub hop_count: Option<u8>,
    pub content: NpduContent,
}

impl Npdu {
    /// A local NPDU wrapping an encoded APDU.
    pub fn application(priority: Priority, apdu: Vec<u8>) -> Self {
        Self {
            priority,
            expecting_reply: false,
            destination: None,
            source: None,
            hop_count: None,
            content: NpduContent::Application(apdu),
        }
    }

    /// A network-layer message with no addressing.
    pub fn network_message(priority: Priority, message_type: u8, vendor_id: Option<u16>) -> Self {
        Self {
            priority,
            expecting_reply: false,
            destination: None,
            source: None,
            hop_count: None,
            content: NpduContent::Network {
                message_type,
                vendor_id,
            },
        }
    }

    pub fn control_byte(&self) -> u8 {
        let mut control = self.priority as u8;
        if matches!(self.content, NpduContent::Network { .. }) {
            control |= 0x80;
        }
        if self.destination.is_some() {
            control |= 0x20;
        }
        if self.source.is_some() {
            control |= 0x08;
        }
        if self.expecting_reply {
            control |= 0x04;
        }
        control
    }

    pub fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        w.write_u8(PROTOCOL_VERSION)?;
        w.write_u8(self.control_byte())?;

        if let Some(dest) = self.destination {
            encode_addr(w, dest)?;
        }
        if let Some(src) = self.source {
            encode_addr(w, src)?;
        }
        if self.destination.is_some() {
            w.write_u8(self.hop_count.unwrap_or(DEFAULT_HOP_COUNT))?;
        }

        match &self.content {
            NpduContent::Network {
                message_type,
                vendor_id,
            } => {
                w.write_u8(*message_type)?;
                let proprietary = *message_type >= message_type::VENDOR_PROPRIETARY_START;
                match (proprietary, vendor_id) {
                    (true, Some(vendor)) => w.write_be_u16(*vendor)?,
                    (false, None) => {}
                    // vendor id present iff the message type is proprietary
                    _ => return Err(EncodeError::InvalidData),
                }
            }
            NpduContent::Application(apdu) => {
                if apdu.is_empty() {
                    return Err(EncodeError::InvalidData);
                }
                w.write_all(apdu)?;
            }
        }
        Ok(())
    }

    pub fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let version = r.read_u8()?;
        if version != PROTOCOL_VERSION {
            return Err(DecodeError::InvalidData);
        }

        let control = r.read_u8()?;
        let is_network_msg = (control & 0x80) != 0;
        let has_dest = (control & 0x20) != 0;
        let has_src = (control & 0x08) != 0;
        let expecting_reply = (control & 0x04) != 0;
        let priority = Priority::from_bits(control);

        let destination = if has_dest {
            Some(decode_addr(r)?)
        } else {
            None
        };
        let source = if has_src { Some(decode_addr(r)?) } else { None };
        let hop_count = if has_dest { Some(r.read_u8()?) } else { None };

        let content = if is_network_msg {
            let message_type = r.read_u8()?;
            let vendor_id = if message_type >= message_type::VENDOR_PROPRIETARY_START {
                Some(r.read_be_u16()?)
            } else {
                None
            };
            NpduContent::Network {
                message_type,
                vendor_id,
            }
        } else {
            let apdu = r.rest();
            if apdu.is_empty() {
                return Err(DecodeError::InvalidData);
            }
            NpduContent::Application(apdu.to_vec())
        };

        Ok(Self {
            priority,
            expecting_reply,
            destination,
            source,
            hop_count,
            content,
        })
    }
}

fn encode_addr(w: &mut Writer<'_>, addr: NpduAddress) -> Result<(), EncodeError> {
    w.write_be_u16(addr.network)?;
    w.write_u8(addr.mac_len)?;
    w.write_all(addr.mac())
}

fn decode_addr(r: &mut Reader<'_>) -> Result<NpduAddress, DecodeError> {
    let network = r.read_be_u16()?;
    let mac_len = r.read_u8()? as usize;
    // A declared MAC length past the buffer or the 8-byte capacity is a
    // structural violation, not a short read.
    if mac_len > 8 || mac_len > r.remaining() {
        return Err(DecodeError::InvalidData);
    }
    let mut mac = [0u8; 8];
    mac[..mac_len].copy_from_slice(r.read_exact(mac_len)?);
    Ok(NpduAddress {
        network,
        mac,
        mac_len: mac_len as u8,
    })
}
