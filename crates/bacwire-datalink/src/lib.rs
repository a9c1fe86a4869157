//! BACnet/IP data link: the BVLC envelope and the UDP socket it rides on.

pub mod bip;

pub use bip::bvlc::{BvlcFrame, BvlcFunction, BvlcHeader, BVLC_HEADER_LEN, BVLC_TYPE_BIP};
pub use bip::link::{BacnetIpLink, LinkError, BACNET_DEFAULT_PORT, MAX_FRAME_LEN};
