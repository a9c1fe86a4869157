/// BVLC (BACnet Virtual Link Control) framing.
pub mod bvlc;
/// UDP socket wrapper with broadcast-address computation.
pub mod link;
