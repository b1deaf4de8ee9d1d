//! # Zigbee Router Module Driver
//!
//! This module provides an architecture-agnostic driver for Tuya Zigbee
//! router modules attached over a serial line.
//!
//! The driver is non-blocking throughout: [`ZigbeeRouter::poll`] drains
//! only the bytes the link already has buffered, and command writes are
//! fire-and-forget. The hosting firmware calls `poll` on every iteration
//! of its main loop and invokes commands from its automation layer; both
//! run on the same control thread.
//!
//! The module pushes its network status over the line. Decoded status
//! values are kept in the driver and forwarded to an optional
//! [`StatusReporter`] sink, once per actual change. A caller that needs an
//! acknowledgement for a command observes the status transitions that
//! follow it.

use alloc::borrow::Cow;
use alloc::boxed::Box;
use alloc::vec::Vec;

use embedded_hal_nb::nb;
use embedded_hal_nb::serial::{Read, Write};

use log::{debug, info, warn};

use zbr::command::{Command, QUERY_NETWORK_STATUS, QUERY_PRODUCT_INFO, SYNC_NETWORK_STATUS};
use zbr::frame::{Frame, FrameCodec, SeqCounter};
use zbr::product::{DEFAULT_MCU_VERSION, DEFAULT_PRODUCT_ID, ProductInfo};
use zbr::status::ConnectionStatus;

use crate::reporter::StatusReporter;

/// Errors that may occur while configuring a [`ZigbeeRouter`].
///
/// These are setup mistakes: they abort construction or registration and
/// are not recoverable at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// The serial link is not ready to carry traffic.
    LinkNotReady,
    /// A status sink is already attached.
    SinkAlreadyAttached,
    /// The configured product identifier is empty.
    InvalidProductId,
    /// A command with the same name is already registered.
    DuplicateCommand,
}

/// Errors that may occur while writing a command to the serial link.
///
/// Surfaced to the caller that invoked the command; the driver never
/// retries a failed write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkError<E> {
    /// The link cannot accept more bytes right now.
    Busy,
    /// The underlying serial write failed.
    Write(E),
}

impl<E> From<nb::Error<E>> for LinkError<E> {
    fn from(e: nb::Error<E>) -> Self {
        match e {
            nb::Error::WouldBlock => LinkError::Busy,
            nb::Error::Other(e) => LinkError::Write(e),
        }
    }
}

/// Configuration for a [`ZigbeeRouter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterConfig {
    /// Product identifier reported to the module.
    pub product_id: Cow<'static, str>,
    /// Host firmware version reported to the module.
    pub mcu_version: Cow<'static, str>,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            product_id: Cow::Borrowed(DEFAULT_PRODUCT_ID),
            mcu_version: Cow::Borrowed(DEFAULT_MCU_VERSION),
        }
    }
}

/// The Zigbee router module driver.
///
/// The driver is the only user of its serial link: no other component may
/// read or write it. It tracks the module's connection status, answers the
/// module's product information handshake, and exposes the remote commands
/// the module accepts.
pub struct ZigbeeRouter<L>
where
    L: Read<u8> + Write<u8>,
{
    link: L,
    codec: FrameCodec,
    seq: SeqCounter,
    product: ProductInfo,
    status: ConnectionStatus,
    sink: Option<Box<dyn StatusReporter>>,
    initialized: bool,
}

impl<L> ZigbeeRouter<L>
where
    L: Read<u8> + Write<u8>,
{
    /// Binds the driver to its serial link.
    ///
    /// The link is probed before use: a transport that fails a flush is
    /// considered not ready. On error, no driver state exists.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::InvalidProductId`] if the configured product
    ///   identifier is empty.
    /// - [`ConfigError::LinkNotReady`] if the link is not ready to carry
    ///   traffic.
    pub fn initialize(mut link: L, config: RouterConfig) -> Result<Self, ConfigError> {
        if config.product_id.is_empty() {
            return Err(ConfigError::InvalidProductId);
        }

        // A transmitter still draining its queue reports `WouldBlock`;
        // only a hard error marks the link as unusable.
        if let Err(nb::Error::Other(_)) = link.flush() {
            return Err(ConfigError::LinkNotReady);
        }

        info!("initializing Zigbee router module driver");

        Ok(Self {
            link,
            codec: FrameCodec::new(),
            seq: SeqCounter::new(),
            product: ProductInfo {
                product_id: config.product_id,
                mcu_version: config.mcu_version,
                gateway: 1,
            },
            status: ConnectionStatus::default(),
            sink: None,
            initialized: false,
        })
    }

    /// Attaches the sink that receives connection status changes.
    ///
    /// At most one sink can be attached over the driver's lifetime.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::SinkAlreadyAttached`] if a sink is already
    /// attached; the existing sink is left in place.
    pub fn attach_status_sink(&mut self, sink: Box<dyn StatusReporter>) -> Result<(), ConfigError> {
        if self.sink.is_some() {
            return Err(ConfigError::SinkAlreadyAttached);
        }

        self.sink = Some(sink);

        Ok(())
    }

    /// Drains and processes the bytes currently buffered on the link.
    ///
    /// The call never blocks: it returns as soon as the link has nothing
    /// more to read. Malformed frames are dropped and decoding resumes at
    /// the next frame header; a hard read error ends the round. Intended
    /// to be called on every iteration of the host's main loop.
    pub fn poll(&mut self) {
        loop {
            let byte = match self.link.read() {
                Ok(byte) => byte,
                Err(nb::Error::WouldBlock) => break,
                Err(nb::Error::Other(_)) => {
                    warn!("serial read failed, ending poll round");
                    break;
                }
            };

            match self.codec.push(byte) {
                Ok(Some(frame)) => self.handle_frame(frame),
                Ok(None) => {}
                Err(e) => warn!("dropped malformed frame: {e:?}"),
            }
        }
    }

    /// Asks the module to reset and restart within its current network.
    ///
    /// # Errors
    ///
    /// Returns a [`LinkError`] if the command frame cannot be written; the
    /// write is not retried.
    pub fn reset(&mut self) -> Result<(), LinkError<L::Error>> {
        self.send_command(Command::Reset)
    }

    /// Asks the module to leave its mesh and attempt to rejoin.
    ///
    /// Recovers a module stuck in a desynchronized or orphaned state.
    ///
    /// # Errors
    ///
    /// Returns a [`LinkError`] if the command frame cannot be written; the
    /// write is not retried.
    pub fn leave_and_rejoin(&mut self) -> Result<(), LinkError<L::Error>> {
        self.send_command(Command::LeaveAndRejoin)
    }

    /// Asks the module for its current network status.
    ///
    /// The answer arrives asynchronously through a later
    /// [`poll`](Self::poll). The host decides the query cadence.
    ///
    /// # Errors
    ///
    /// Returns a [`LinkError`] if the query frame cannot be written.
    pub fn query_network_status(&mut self) -> Result<(), LinkError<L::Error>> {
        let frame = Frame::new(self.seq.next(), QUERY_NETWORK_STATUS, Vec::new());
        self.write_frame(&frame)?;

        debug!("network status query sent");

        Ok(())
    }

    /// Returns the last decoded connection status.
    #[must_use]
    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    /// Whether the module has completed its product information handshake.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn handle_frame(&mut self, frame: Frame) {
        debug!(
            "frame received: command 0x{:02X}, seq 0x{:04X}, {} payload bytes",
            frame.command,
            frame.seq,
            frame.payload.len()
        );

        match frame.command {
            QUERY_PRODUCT_INFO => self.answer_product_query(frame.seq),
            SYNC_NETWORK_STATUS | QUERY_NETWORK_STATUS => self.handle_status(&frame.payload),
            command => debug!("unhandled command 0x{command:02X}"),
        }
    }

    // Replies echo the peer's sequence number instead of consuming the
    // outbound counter.
    fn answer_product_query(&mut self, seq: u16) {
        let reply = Frame::new(seq, QUERY_PRODUCT_INFO, self.product.to_payload());

        if self.write_frame(&reply).is_err() {
            warn!("product info reply not written");
            return;
        }

        self.initialized = true;

        info!(
            "product info sent: {} {}",
            self.product.product_id, self.product.mcu_version
        );
    }

    fn handle_status(&mut self, payload: &[u8]) {
        let Some(&byte) = payload.first() else {
            warn!("status frame with empty payload");
            return;
        };

        let status = ConnectionStatus::from_wire(byte);
        if status == self.status {
            return;
        }

        info!("network status changed: {} -> {}", self.status, status);
        self.status = status;

        if let Some(sink) = self.sink.as_mut() {
            sink.publish(status);
        }
    }

    fn send_command(&mut self, command: Command) -> Result<(), LinkError<L::Error>> {
        let frame = command.into_frame(self.seq.next());
        self.write_frame(&frame)?;

        info!("command sent: {command}");

        Ok(())
    }

    fn write_frame(&mut self, frame: &Frame) -> Result<(), LinkError<L::Error>> {
        for byte in frame.encode() {
            self.link.write(byte)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    extern crate std;
    use std::vec;

    use alloc::rc::Rc;
    use core::cell::RefCell;

    use embedded_hal_mock::eh1::serial::{Mock as SerialMock, Transaction as SerialTransaction};
    use embedded_hal_nb::serial::ErrorKind;

    use crate::reporter::LastStatus;

    #[derive(Default)]
    struct CountingReporter {
        publishes: usize,
        last: Option<ConnectionStatus>,
    }

    impl StatusReporter for CountingReporter {
        fn publish(&mut self, status: ConnectionStatus) {
            self.publishes += 1;
            self.last = Some(status);
        }
    }

    fn status_frame(seq: u16, status_byte: u8) -> Vec<u8> {
        Frame::new(seq, SYNC_NETWORK_STATUS, vec![status_byte]).encode()
    }

    #[test]
    fn test_initialize() {
        let expectations = [SerialTransaction::flush()];
        let link = SerialMock::new(&expectations);

        let mut router = ZigbeeRouter::initialize(link, RouterConfig::default()).unwrap();

        assert_eq!(router.status(), ConnectionStatus::Unknown);
        assert!(!router.is_initialized());

        router.link.done();
    }

    #[test]
    fn test_initialize_link_not_ready() {
        let expectations = [SerialTransaction::flush_error(nb::Error::Other(
            ErrorKind::Other,
        ))];
        let link = SerialMock::new(&expectations);
        let mut handle = link.clone();

        let result = ZigbeeRouter::initialize(link, RouterConfig::default());
        assert!(matches!(result, Err(ConfigError::LinkNotReady)));

        handle.done();
    }

    #[test]
    fn test_initialize_empty_product_id() {
        let link = SerialMock::new(&[]);
        let mut handle = link.clone();

        let config = RouterConfig {
            product_id: Cow::Borrowed(""),
            ..RouterConfig::default()
        };

        let result = ZigbeeRouter::initialize(link, config);
        assert!(matches!(result, Err(ConfigError::InvalidProductId)));

        handle.done();
    }

    #[test]
    fn test_poll_without_bytes_changes_nothing() {
        let expectations = [
            SerialTransaction::flush(),
            SerialTransaction::read_error(nb::Error::WouldBlock),
            SerialTransaction::read_error(nb::Error::WouldBlock),
        ];
        let link = SerialMock::new(&expectations);

        let mut router = ZigbeeRouter::initialize(link, RouterConfig::default()).unwrap();
        let cell = Rc::new(RefCell::new(CountingReporter::default()));
        router
            .attach_status_sink(Box::new(Rc::clone(&cell)))
            .unwrap();

        router.poll();
        router.poll();

        assert_eq!(router.status(), ConnectionStatus::Unknown);
        assert_eq!(cell.borrow().publishes, 0);

        router.link.done();
    }

    #[test]
    fn test_poll_publishes_only_on_change() {
        let joined = status_frame(0x0001, 0x01);
        let expectations = [
            SerialTransaction::flush(),
            SerialTransaction::read_many(&joined),
            SerialTransaction::read_error(nb::Error::WouldBlock),
            SerialTransaction::read_many(&joined),
            SerialTransaction::read_error(nb::Error::WouldBlock),
        ];
        let link = SerialMock::new(&expectations);

        let mut router = ZigbeeRouter::initialize(link, RouterConfig::default()).unwrap();
        let cell = Rc::new(RefCell::new(CountingReporter::default()));
        router
            .attach_status_sink(Box::new(Rc::clone(&cell)))
            .unwrap();

        router.poll();
        assert_eq!(router.status(), ConnectionStatus::Joined);
        assert_eq!(cell.borrow().publishes, 1);
        assert_eq!(cell.borrow().last, Some(ConnectionStatus::Joined));

        // The same value again publishes nothing.
        router.poll();
        assert_eq!(router.status(), ConnectionStatus::Joined);
        assert_eq!(cell.borrow().publishes, 1);

        router.link.done();
    }

    #[test]
    fn test_poll_recovers_from_corruption() {
        let mut corrupted = status_frame(0x0001, 0x01);
        let last = corrupted.len() - 1;
        corrupted[last] = corrupted[last].wrapping_add(1);

        let valid = status_frame(0x0002, 0x00);

        let mut bytes = vec![0x42, 0x13];
        bytes.extend_from_slice(&corrupted);
        bytes.extend_from_slice(&valid);

        let expectations = [
            SerialTransaction::flush(),
            SerialTransaction::read_many(&bytes),
            SerialTransaction::read_error(nb::Error::WouldBlock),
        ];
        let link = SerialMock::new(&expectations);

        let mut router = ZigbeeRouter::initialize(link, RouterConfig::default()).unwrap();
        let cell = Rc::new(RefCell::new(CountingReporter::default()));
        router
            .attach_status_sink(Box::new(Rc::clone(&cell)))
            .unwrap();

        router.poll();

        assert_eq!(router.status(), ConnectionStatus::NotJoined);
        assert_eq!(cell.borrow().publishes, 1);

        router.link.done();
    }

    #[test]
    fn test_poll_ignores_empty_status_payload() {
        let empty = Frame::new(0x0001, SYNC_NETWORK_STATUS, Vec::new()).encode();
        let expectations = [
            SerialTransaction::flush(),
            SerialTransaction::read_many(&empty),
            SerialTransaction::read_error(nb::Error::WouldBlock),
        ];
        let link = SerialMock::new(&expectations);

        let mut router = ZigbeeRouter::initialize(link, RouterConfig::default()).unwrap();
        router.poll();

        assert_eq!(router.status(), ConnectionStatus::Unknown);

        router.link.done();
    }

    #[test]
    fn test_product_info_handshake() {
        let query = Frame::new(0x0005, QUERY_PRODUCT_INFO, Vec::new()).encode();
        let reply = Frame::new(0x0005, QUERY_PRODUCT_INFO, ProductInfo::default().to_payload())
            .encode();

        let expectations = [
            SerialTransaction::flush(),
            SerialTransaction::read_many(&query),
            SerialTransaction::write_many(&reply),
            SerialTransaction::read_error(nb::Error::WouldBlock),
        ];
        let link = SerialMock::new(&expectations);

        let mut router = ZigbeeRouter::initialize(link, RouterConfig::default()).unwrap();
        assert!(!router.is_initialized());

        router.poll();
        assert!(router.is_initialized());

        router.link.done();
    }

    #[test]
    fn test_attach_status_sink_twice() {
        let joined = status_frame(0x0001, 0x01);
        let expectations = [
            SerialTransaction::flush(),
            SerialTransaction::read_many(&joined),
            SerialTransaction::read_error(nb::Error::WouldBlock),
        ];
        let link = SerialMock::new(&expectations);

        let mut router = ZigbeeRouter::initialize(link, RouterConfig::default()).unwrap();

        let first = Rc::new(RefCell::new(LastStatus::new()));
        router
            .attach_status_sink(Box::new(Rc::clone(&first)))
            .unwrap();

        let second = Rc::new(RefCell::new(LastStatus::new()));
        let result = router.attach_status_sink(Box::new(Rc::clone(&second)));
        assert!(matches!(result, Err(ConfigError::SinkAlreadyAttached)));

        // The first sink stays in place and keeps receiving updates.
        router.poll();
        assert_eq!(first.borrow().get(), Some(ConnectionStatus::Joined));
        assert_eq!(second.borrow().get(), None);

        router.link.done();
    }

    #[test]
    fn test_reset_writes_one_frame() {
        let frame = Command::Reset.into_frame(0).encode();
        let expectations = [
            SerialTransaction::flush(),
            SerialTransaction::write_many(&frame),
        ];
        let link = SerialMock::new(&expectations);

        let mut router = ZigbeeRouter::initialize(link, RouterConfig::default()).unwrap();
        router.reset().unwrap();

        router.link.done();
    }

    #[test]
    fn test_leave_and_rejoin_writes_one_frame() {
        let frame = Command::LeaveAndRejoin.into_frame(0).encode();
        let expectations = [
            SerialTransaction::flush(),
            SerialTransaction::write_many(&frame),
        ];
        let link = SerialMock::new(&expectations);

        let mut router = ZigbeeRouter::initialize(link, RouterConfig::default()).unwrap();
        router.leave_and_rejoin().unwrap();

        router.link.done();
    }

    #[test]
    fn test_commands_advance_sequence() {
        let reset = Command::Reset.into_frame(0).encode();
        let rejoin = Command::LeaveAndRejoin.into_frame(1).encode();
        let expectations = [
            SerialTransaction::flush(),
            SerialTransaction::write_many(&reset),
            SerialTransaction::write_many(&rejoin),
        ];
        let link = SerialMock::new(&expectations);

        let mut router = ZigbeeRouter::initialize(link, RouterConfig::default()).unwrap();
        router.reset().unwrap();
        router.leave_and_rejoin().unwrap();

        router.link.done();
    }

    #[test]
    fn test_reset_on_busy_link() {
        let expectations = [
            SerialTransaction::flush(),
            SerialTransaction::write_error(0x55, nb::Error::WouldBlock),
        ];
        let link = SerialMock::new(&expectations);

        let mut router = ZigbeeRouter::initialize(link, RouterConfig::default()).unwrap();

        assert_eq!(router.reset(), Err(LinkError::Busy));

        router.link.done();
    }

    #[test]
    fn test_query_network_status() {
        let query = Frame::new(0, QUERY_NETWORK_STATUS, Vec::new()).encode();
        let expectations = [
            SerialTransaction::flush(),
            SerialTransaction::write_many(&query),
        ];
        let link = SerialMock::new(&expectations);

        let mut router = ZigbeeRouter::initialize(link, RouterConfig::default()).unwrap();
        router.query_network_status().unwrap();

        router.link.done();
    }
}
