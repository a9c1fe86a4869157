//! BACnet/IP protocol encoding and decoding in pure Rust.
//!
//! `bacwire-core` provides encoding and decoding of the layers that carry
//! BACnet messages over UDP: the APDU tag system and service payloads, the
//! NPDU network-layer envelope, and the primitive variable-width integer
//! encodings they share. The BVLC outer framing lives in `bacwire-datalink`;
//! message dispatch lives in `bacwire-transport`.
//!
//! # Feature flags
//!
//! - **`std`** (default) — enables `std::error::Error` implementations.
//! - **`alloc`** (default) — enables the owned NPDU/APDU message types and
//!   service decoders that allocate.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "alloc")]
extern crate alloc;
#[cfg(feature = "std")]
extern crate std;

/// APDU (Application Protocol Data Unit) types for confirmed/unconfirmed requests and responses.
#[cfg(feature = "alloc")]
pub mod apdu;
/// Binary encoding primitives, the tag system, and the zero-copy reader/writer.
pub mod encoding;
/// Error types for encoding and decoding operations.
pub mod error;
/// NPDU (Network Protocol Data Unit) encoding and decoding.
#[cfg(feature = "alloc")]
pub mod npdu;
/// BACnet service request codecs.
#[cfg(feature = "alloc")]
pub mod services;
/// Core BACnet data types.
pub mod types;

pub use error::{DecodeError, EncodeError};
