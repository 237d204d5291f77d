//! Bluetooth device addresses and LE address types.

use core::fmt;
use core::str::FromStr;

use crate::error::BdAddrParseError;

/// A 48 bit Bluetooth device address, stored in display order
/// (most significant byte first).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, derive_more::From)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BdAddr([u8; 6]);

impl BdAddr {
    /// Number of bytes in an address.
    pub const LEN: usize = 6;

    /// The all-zero address, used as a wildcard and as "no address recorded".
    pub const ANY: BdAddr = BdAddr([0; 6]);

    /// Creates an address from raw bytes in display order.
    pub const fn new(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }

    /// Returns the underlying bytes.
    pub const fn as_bytes(&self) -> &[u8; 6] {
        &self.0
    }

    /// Checks if this is the all-zero wildcard address.
    pub fn is_any(&self) -> bool {
        self.0 == [0; 6]
    }
}

impl AsRef<[u8]> for BdAddr {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for BdAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

impl FromStr for BdAddr {
    type Err = BdAddrParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; 6];
        let mut octets = s.split(':');
        for byte in &mut bytes {
            let octet = octets.next().ok_or(BdAddrParseError::WrongOctetCount)?;
            if octet.len() != 2 {
                return Err(BdAddrParseError::InvalidOctet {
                    octet: octet.to_owned(),
                });
            }
            *byte = u8::from_str_radix(octet, 16).map_err(|_| BdAddrParseError::InvalidOctet {
                octet: octet.to_owned(),
            })?;
        }
        if octets.next().is_some() {
            return Err(BdAddrParseError::WrongOctetCount);
        }
        Ok(Self(bytes))
    }
}

/// LE address type reported with an advertising report or connection.
///
/// Identity variants indicate the controller already resolved a private
/// address down to the peer's stable identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, strum::Display, strum::FromRepr)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[strum(serialize_all = "snake_case")]
#[repr(u8)]
pub enum AddrType {
    #[default]
    Public = 0x00,
    Random = 0x01,
    PublicIdentity = 0x02,
    RandomIdentity = 0x03,
    /// The advertisement carried no address at all.
    Anonymous = 0xFF,
}

impl AddrType {
    /// Returns true if this is one of the resolved identity address types.
    pub fn is_identity(self) -> bool {
        matches!(self, AddrType::PublicIdentity | AddrType::RandomIdentity)
    }

    /// Returns true if the address type carries a usable address.
    pub fn is_known(self) -> bool {
        !matches!(self, AddrType::Anonymous)
    }
}
