//! Class of Device.

use core::{fmt, str::FromStr};

use crate::error::DeviceClassParseError;

/// A 24 bit Class of Device field, as carried in inquiry results and
/// connection requests. All-zero means the class is not known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, derive_more::From)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DeviceClass([u8; 3]);

impl DeviceClass {
    /// The unknown class.
    pub const UNKNOWN: DeviceClass = DeviceClass([0; 3]);

    /// Creates a class from its raw on-air bytes.
    pub const fn new(bytes: [u8; 3]) -> Self {
        Self(bytes)
    }

    /// Returns the underlying bytes.
    pub const fn as_bytes(&self) -> &[u8; 3] {
        &self.0
    }

    /// Checks if no class has been recorded.
    pub fn is_unknown(&self) -> bool {
        self.0 == [0; 3]
    }
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c] = self.0;
        write!(f, "{a:02x}{b:02x}{c:02x}")
    }
}

impl FromStr for DeviceClass {
    type Err = DeviceClassParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 6 {
            return Err(DeviceClassParseError::WrongLength);
        }
        let mut bytes = [0u8; 3];
        for (byte, pos) in bytes.iter_mut().zip((0..6).step_by(2)) {
            let digits = s.get(pos..pos + 2).ok_or(DeviceClassParseError::WrongLength)?;
            *byte =
                u8::from_str_radix(digits, 16).map_err(|_| DeviceClassParseError::InvalidDigit {
                    text: s.to_owned(),
                })?;
        }
        Ok(Self(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_display_output() {
        let class = DeviceClass::new([0x00, 0x25, 0x40]);
        let parsed: DeviceClass = class.to_string().parse().unwrap();
        assert_eq!(parsed, class);
    }

    #[test]
    fn rejects_malformed_text() {
        assert_eq!(
            "0025".parse::<DeviceClass>(),
            Err(DeviceClassParseError::WrongLength)
        );
        assert!(matches!(
            "00254g".parse::<DeviceClass>(),
            Err(DeviceClassParseError::InvalidDigit { .. })
        ));
    }
}
