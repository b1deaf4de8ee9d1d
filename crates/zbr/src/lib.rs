//! The wire protocol spoken by Tuya Zigbee router modules over a serial
//! line.
//!
//! This crate provides APIs to:
//!
//! - Encode and decode the frames exchanged between a host MCU and the
//!   router module. Every message travels in the same envelope: a fixed
//!   two-byte header, a protocol version, a sequence number, a command
//!   opcode, a variable-length payload, and an additive checksum.
//! - Describe the remote commands a module accepts, together with the
//!   string keys under which a host automation layer exposes them.
//! - Decode the connection status values a module reports and serialize
//!   them for diagnostic consumers.
//! - Build the product identification payload a module requests from its
//!   host during startup.
//!
//! Status values and product information are serializable so that a host
//! can forward them to its own reporting channels. A host that never needs
//! to parse them back can disable the `deserialize` feature at compile
//! time.
//!
//! This crate can be compiled for both `std` and `no_std` environments.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![no_std]

extern crate alloc;

/// Remote commands and their opcodes.
pub mod command;
/// Frame envelope encoding and decoding.
pub mod frame;
/// Product identification payload.
pub mod product;
/// Connection status values.
pub mod status;

#[cfg(test)]
#[cfg(feature = "deserialize")]
pub(crate) fn serialize<T: serde::Serialize>(value: T) -> serde_json::Value {
    serde_json::to_value(value).unwrap()
}

#[cfg(test)]
#[cfg(feature = "deserialize")]
pub(crate) fn deserialize<T: serde::de::DeserializeOwned>(value: serde_json::Value) -> T {
    serde_json::from_value(value).unwrap()
}
