//! The frame envelope carrying every message on the line.
//!
//! A frame has the layout:
//!
//! ```text
//! 0x55 0xAA | version (1) | sequence (2, BE) | command (1) | length (2, BE) | payload | checksum (1)
//! ```
//!
//! The checksum is the low 8 bits of the byte-wise sum of everything that
//! precedes it. The version byte is fixed on encode and ignored on decode.

use alloc::vec::Vec;

use core::mem;

/// First byte of the frame header.
pub const HEADER_HIGH: u8 = 0x55;
/// Second byte of the frame header.
pub const HEADER_LOW: u8 = 0xAA;
/// Protocol version written into every outbound frame.
pub const PROTOCOL_VERSION: u8 = 0x02;

/// Largest payload length accepted by the decoder.
///
/// The module only ever sends short JSON and status payloads; a declared
/// length above this bound can only come from line corruption.
pub const MAX_PAYLOAD_LEN: usize = 512;

// Header (2) + version (1) + sequence (2) + command (1) + length (2).
const PREFIX_LEN: usize = 8;

// Sequence numbers cycle through 0..=0xFFF0; values above are reserved
// for replies.
const SEQ_MODULUS: u16 = 0xFFF1;

/// Errors that may occur while decoding bytes into a [`Frame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// The second header byte did not follow the first.
    Header,
    /// The computed checksum did not match the transmitted one.
    ChecksumMismatch,
    /// The declared payload length exceeds [`MAX_PAYLOAD_LEN`].
    PayloadTooLarge,
}

/// A single protocol frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Sequence number.
    pub seq: u16,
    /// Command opcode.
    pub command: u8,
    /// Command payload.
    pub payload: Vec<u8>,
}

impl Frame {
    /// Creates a [`Frame`].
    #[must_use]
    pub const fn new(seq: u16, command: u8, payload: Vec<u8>) -> Self {
        Self {
            seq,
            command,
            payload,
        }
    }

    /// Encodes the frame into the bytes sent on the line, checksum
    /// included.
    ///
    /// Encoding is deterministic: equal frames always produce equal bytes.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let len = self.payload.len() as u16;

        let mut bytes = Vec::with_capacity(PREFIX_LEN + self.payload.len() + 1);
        bytes.extend_from_slice(&[
            HEADER_HIGH,
            HEADER_LOW,
            PROTOCOL_VERSION,
            (self.seq >> 8) as u8,
            (self.seq & 0xFF) as u8,
            self.command,
            (len >> 8) as u8,
            (len & 0xFF) as u8,
        ]);
        bytes.extend_from_slice(&self.payload);
        bytes.push(checksum(&bytes));

        bytes
    }
}

/// Computes the additive frame checksum over `bytes`.
#[must_use]
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |sum, byte| sum.wrapping_add(*byte))
}

/// An incremental frame decoder fed one byte at a time.
///
/// The decoder resynchronizes on the frame header: bytes received before a
/// [`HEADER_HIGH`] are skipped, and any malformed frame empties the
/// internal buffer so the next header byte starts a fresh frame.
#[derive(Debug, Default)]
pub struct FrameCodec {
    buf: Vec<u8>,
}

impl FrameCodec {
    /// Creates an empty [`FrameCodec`].
    #[must_use]
    pub const fn new() -> Self {
        Self { buf: Vec::new() }
    }

    /// Feeds one byte into the decoder.
    ///
    /// Returns a [`Frame`] once a complete, checksum-valid one has
    /// accumulated, and `None` while a frame is still in flight.
    ///
    /// # Errors
    ///
    /// Returns an error when the accumulated bytes cannot form a valid
    /// frame. The internal buffer is emptied, so decoding resumes at the
    /// next header byte.
    pub fn push(&mut self, byte: u8) -> Result<Option<Frame>, DecodeError> {
        if self.buf.is_empty() && byte != HEADER_HIGH {
            return Ok(None);
        }

        self.buf.push(byte);

        if self.buf.len() == 2 && self.buf[1] != HEADER_LOW {
            self.buf.clear();
            return Err(DecodeError::Header);
        }

        if self.buf.len() < PREFIX_LEN {
            return Ok(None);
        }

        let payload_len = usize::from(u16::from_be_bytes([self.buf[6], self.buf[7]]));
        if payload_len > MAX_PAYLOAD_LEN {
            self.buf.clear();
            return Err(DecodeError::PayloadTooLarge);
        }

        // Everything up to the length field plus the payload and the
        // trailing checksum byte.
        if self.buf.len() < PREFIX_LEN + payload_len + 1 {
            return Ok(None);
        }

        let bytes = mem::take(&mut self.buf);
        let (body, received) = bytes.split_at(bytes.len() - 1);
        if checksum(body) != received[0] {
            return Err(DecodeError::ChecksumMismatch);
        }

        Ok(Some(Frame {
            seq: u16::from_be_bytes([body[3], body[4]]),
            command: body[5],
            payload: body[PREFIX_LEN..].to_vec(),
        }))
    }
}

/// The counter producing outbound sequence numbers.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeqCounter(u16);

impl SeqCounter {
    /// Creates a [`SeqCounter`] starting at zero.
    #[must_use]
    pub const fn new() -> Self {
        Self(0)
    }

    /// Returns the next sequence number, advancing the counter.
    pub fn next(&mut self) -> u16 {
        let seq = self.0;
        self.0 = (self.0 + 1) % SEQ_MODULUS;
        seq
    }
}
