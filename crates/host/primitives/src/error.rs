//! Error types for the primitives crate.

use thiserror::Error;

/// Error parsing a textual Bluetooth device address.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BdAddrParseError {
    /// The string did not contain exactly six colon-separated octets.
    #[error("address must be six colon-separated octets")]
    WrongOctetCount,

    /// An octet was not two hexadecimal digits.
    #[error("invalid octet {octet:?} in address")]
    InvalidOctet { octet: String },
}

/// Error parsing a textual Class of Device field.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeviceClassParseError {
    /// The string was not exactly six hexadecimal digits.
    #[error("class of device must be six hexadecimal digits")]
    WrongLength,

    /// A character was not a hexadecimal digit.
    #[error("invalid hex digit in class of device {text:?}")]
    InvalidDigit { text: String },
}
