//! Message dispatch for BACnet/IP.
//!
//! Inbound datagrams are peeled one layer at a time: the [`Connection`]
//! decodes the BVLC envelope and hands it to the [`MessageNexus`], which
//! fans frames out to registered handlers by bitmask filter. A built-in
//! router handler decodes the NPDU inside unicast/broadcast frames and
//! re-dispatches, and decodes unconfirmed APDUs out of those NPDUs for the
//! service-level registry.

pub mod connection;
pub mod handler;
pub mod nexus;

pub use connection::{new_connection, Connection, ConnectionConfig};
pub use handler::{ApduHandler, BvlcHandler, HandlerId, MessageHandler, NpduHandler};
pub use nexus::{MessageNexus, NexusConfig};

use bacwire_core::EncodeError;
use bacwire_datalink::LinkError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("link error: {0}")]
    Link(#[from] LinkError),
    #[error("encode error: {0}")]
    Encode(#[from] EncodeError),
    #[error("already started")]
    AlreadyStarted,
    #[error("no message router set")]
    RouterNotSet,
}
