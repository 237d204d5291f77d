//! Information reported by or about a remote device.

use core::fmt;

/// A remote device name.
///
/// UTF-8, truncated to [`RemoteName::MAX_LEN`] bytes on construction.
/// Empty means the name is not known.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RemoteName(String);

impl RemoteName {
    /// Maximum length of a device name in bytes.
    pub const MAX_LEN: usize = 248;

    /// Creates a name, truncating to the maximum length on a character
    /// boundary.
    pub fn new(name: &str) -> Self {
        let mut end = Self::MAX_LEN.min(name.len());
        while !name.is_char_boundary(end) {
            end -= 1;
        }
        Self(name[..end].to_owned())
    }

    /// Returns the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Checks if the name is unknown.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Resets the name to unknown.
    pub fn clear(&mut self) {
        self.0.clear();
    }
}

impl fmt::Display for RemoteName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RemoteName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// One page of remote supported features, stored verbatim as read from
/// the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::From)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RemoteFeatures([u8; 8]);

impl RemoteFeatures {
    /// Creates a feature page from raw bytes.
    pub const fn new(bytes: [u8; 8]) -> Self {
        Self(bytes)
    }

    /// Returns the underlying bytes.
    pub const fn as_bytes(&self) -> &[u8; 8] {
        &self.0
    }
}
