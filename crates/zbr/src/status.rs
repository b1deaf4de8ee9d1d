//! The network connection status a router module reports.

use serde::Serialize;

/// The connection status of a router module within its mesh.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[cfg_attr(feature = "deserialize", derive(serde::Deserialize))]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    /// No status frame has been decoded yet, or the module reported a
    /// value this protocol version does not know.
    #[default]
    Unknown,
    /// The module is not joined to any mesh.
    NotJoined,
    /// The module is joined to a mesh and routing traffic.
    Joined,
    /// The module is pairing.
    Pairing,
    /// The module reported a network error.
    Error,
}

impl ConnectionStatus {
    /// Decodes the status byte carried in a status frame payload.
    #[must_use]
    pub const fn from_wire(byte: u8) -> Self {
        match byte {
            0x00 => Self::NotJoined,
            0x01 => Self::Joined,
            0x02 => Self::Error,
            0x03 => Self::Pairing,
            _ => Self::Unknown,
        }
    }

    /// Returns the status name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::NotJoined => "not_joined",
            Self::Joined => "joined",
            Self::Pairing => "pairing",
            Self::Error => "error",
        }
    }
}

impl core::fmt::Debug for ConnectionStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        self.name().fmt(f)
    }
}

impl core::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        self.name().fmt(f)
    }
}
