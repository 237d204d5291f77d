//! Connection handles, roles, and preferred LE connection parameters.

use core::fmt;

/// An HCI connection handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::From, derive_more::Into)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConnHandle(u16);

impl ConnHandle {
    /// Sentinel for "no connection on this transport".
    pub const INVALID: ConnHandle = ConnHandle(0xFFFF);

    /// Creates a handle from its raw value.
    pub const fn new(raw: u16) -> Self {
        Self(raw)
    }

    /// Returns the raw handle value.
    pub const fn raw(self) -> u16 {
        self.0
    }

    /// Checks that this handle refers to a connection.
    pub const fn is_valid(self) -> bool {
        self.0 != Self::INVALID.0
    }
}

impl Default for ConnHandle {
    fn default() -> Self {
        Self::INVALID
    }
}

impl fmt::Display for ConnHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:04x}", self.0)
    }
}

/// Role of the local device on an established connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::FromRepr)]
#[strum(serialize_all = "snake_case")]
#[repr(u8)]
pub enum ConnectionRole {
    Central = 0x00,
    Peripheral = 0x01,
}

/// Preferred LE connection parameters requested by a peer.
///
/// Each field defaults to [`ConnParams::UNSPECIFIED`], letting the
/// background connection logic pick its own values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConnParams {
    pub min_interval: u16,
    pub max_interval: u16,
    pub peripheral_latency: u16,
    pub supervision_timeout: u16,
}

impl ConnParams {
    /// Per-field sentinel for "no preference recorded".
    pub const UNSPECIFIED: u16 = 0xFFFF;

    /// Checks if no parameter has been recorded.
    pub fn is_unspecified(&self) -> bool {
        *self == Self::default()
    }
}

impl Default for ConnParams {
    fn default() -> Self {
        Self {
            min_interval: Self::UNSPECIFIED,
            max_interval: Self::UNSPECIFIED,
            peripheral_latency: Self::UNSPECIFIED,
            supervision_timeout: Self::UNSPECIFIED,
        }
    }
}
