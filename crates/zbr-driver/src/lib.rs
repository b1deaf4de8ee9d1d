//! `zbr-driver` is a library crate that provides an architecture-agnostic
//! driver for Tuya Zigbee router serial modules.
//!
//! The driver is implemented using only the [`embedded-hal-nb`] serial
//! traits, ensuring compatibility with any platform that supports these
//! abstractions. All operations are non-blocking and run on a single
//! control thread: the hosting firmware drives the driver from its main
//! loop and invokes commands from its automation layer.
//!
//! [`embedded-hal-nb`]: https://crates.io/crates/embedded-hal-nb

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![no_std]

extern crate alloc;

/// Command wrappers and the named-command dispatch table.
pub mod actions;
/// Connection status sinks.
pub mod reporter;
/// The router module driver.
pub mod router;
