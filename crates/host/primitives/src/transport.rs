//! Transports and per-transport device capabilities.

use bitflags::bitflags;

/// The two Bluetooth transports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum Transport {
    BrEdr,
    Le,
}

bitflags! {
    /// Transports a device is known to support.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct DeviceType: u8 {
        const BR_EDR = 1 << 0;
        const LE = 1 << 1;
        const DUAL = Self::BR_EDR.bits() | Self::LE.bits();
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for DeviceType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.bits())
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for DeviceType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Self::from_bits_retain(u8::deserialize(deserializer)?))
    }
}
