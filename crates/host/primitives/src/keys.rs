//! Pairing key material and capability types.

use core::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

/// A 128 bit secret key block.
///
/// The backing bytes are zeroed when the value is dropped or wiped, and
/// `Debug` never prints them. Deliberately not serializable; callers that
/// persist bonds must export the bytes explicitly.
#[derive(Clone, PartialEq, Eq, Default, Zeroize, ZeroizeOnDrop)]
pub struct Octet16([u8; 16]);

impl Octet16 {
    /// Number of bytes in the block.
    pub const LEN: usize = 16;

    /// Creates a key block from raw bytes.
    pub const fn new(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Returns the underlying bytes.
    pub const fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Checks if every byte is zero, the wiped/absent state.
    pub fn is_zero(&self) -> bool {
        self.0 == [0; 16]
    }
}

impl fmt::Debug for Octet16 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Octet16(***)")
    }
}

/// A BR/EDR link key.
pub type LinkKey = Octet16;

/// Type of a stored BR/EDR link key, as reported by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, strum::Display, strum::FromRepr)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[strum(serialize_all = "snake_case")]
#[repr(u8)]
pub enum LinkKeyType {
    #[default]
    Combination = 0x00,
    LocalUnit = 0x01,
    RemoteUnit = 0x02,
    DebugCombination = 0x03,
    UnauthenticatedP192 = 0x04,
    AuthenticatedP192 = 0x05,
    ChangedCombination = 0x06,
    UnauthenticatedP256 = 0x07,
    AuthenticatedP256 = 0x08,
}

impl LinkKeyType {
    /// Returns true for key types produced by MITM protected pairing.
    pub fn is_authenticated(self) -> bool {
        matches!(
            self,
            LinkKeyType::AuthenticatedP192 | LinkKeyType::AuthenticatedP256
        )
    }
}

/// IO capabilities a device advertises for Secure Simple Pairing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, strum::Display, strum::FromRepr)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[strum(serialize_all = "snake_case")]
#[repr(u8)]
pub enum IoCapability {
    DisplayOnly = 0x00,
    DisplayYesNo = 0x01,
    KeyboardOnly = 0x02,
    None = 0x03,
    KeyboardDisplay = 0x04,
    #[default]
    Unknown = 0xFF,
}
