//! The commands exchanged with a router module.
//!
//! Opcodes cover both directions: the module queries its host for product
//! information and pushes status updates, while the host queries the
//! status and requests module resets.

use alloc::vec;

use crate::frame::Frame;

/// Opcode: the module asks the host for its product identification.
pub const QUERY_PRODUCT_INFO: u8 = 0x01;
/// Opcode: the module pushes its current network status unprompted.
pub const SYNC_NETWORK_STATUS: u8 = 0x02;
/// Opcode: the host asks the module to reset, optionally leaving its mesh.
pub const RESET_MODULE: u8 = 0x03;
/// Opcode: the host asks the module for its current network status.
pub const QUERY_NETWORK_STATUS: u8 = 0x20;

/// A remote command accepted by a router module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Resets the module and restarts it within its current network.
    Reset,
    /// Makes the module leave its mesh and attempt to rejoin.
    LeaveAndRejoin,
}

impl Command {
    /// Returns the string key under which a host automation layer exposes
    /// this command.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Reset => "reset",
            Self::LeaveAndRejoin => "leave_and_rejoin",
        }
    }

    /// Returns the reset mode byte carried in the command payload.
    #[must_use]
    pub const fn mode(&self) -> u8 {
        match self {
            Self::Reset => 0x00,
            Self::LeaveAndRejoin => 0x01,
        }
    }

    /// Builds the frame sent on the line for this command.
    #[must_use]
    pub fn into_frame(self, seq: u16) -> Frame {
        Frame::new(seq, RESET_MODULE, vec![self.mode()])
    }
}

impl core::fmt::Display for Command {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        self.name().fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_names() {
        assert_eq!(Command::Reset.name(), "reset");
        assert_eq!(Command::LeaveAndRejoin.name(), "leave_and_rejoin");
    }

    #[test]
    fn test_command_encodings_are_distinct() {
        let reset = Command::Reset.into_frame(0).encode();
        let rejoin = Command::LeaveAndRejoin.into_frame(0).encode();

        assert_ne!(reset, rejoin);
    }

    #[test]
    fn test_command_frame_layout() {
        let frame = Command::LeaveAndRejoin.into_frame(0x0007);

        assert_eq!(frame.command, RESET_MODULE);
        assert_eq!(frame.seq, 0x0007);
        assert_eq!(frame.payload, [0x01]);
    }
}
