//! Core primitive types for the Bluetooth host stack.
//!
//! This crate provides fundamental types used across the host stack,
//! kept separate to avoid circular dependencies: device addresses,
//! connection handles, key material, and capability enums. No I/O and
//! no transport plumbing lives here.

pub mod addr;
pub mod class;
pub mod conn;
pub mod error;
pub mod keys;
pub mod remote;
pub mod transport;

pub use addr::{AddrType, BdAddr};
pub use class::DeviceClass;
pub use conn::{ConnHandle, ConnParams, ConnectionRole};
pub use error::{BdAddrParseError, DeviceClassParseError};
pub use keys::{IoCapability, LinkKey, LinkKeyType, Octet16};
pub use remote::{RemoteFeatures, RemoteName};
pub use transport::{DeviceType, Transport};
