//! Subscriber identifiers
//!
//! IDs are opaque byte strings. The event source and the subscribers agree on
//! them byte for byte, so nothing here assumes they are valid UTF-8.

use std::borrow::Borrow;
use std::fmt;

use bytes::Bytes;

/// Identifier a subscriber announces on connect and events refer to
///
/// Hashes and compares like the underlying byte slice, so maps keyed by
/// `SubscriberId` can be queried with a plain `&[u8]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(Bytes);

impl SubscriberId {
    /// Wrap raw ID bytes
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    /// Copy an ID out of a borrowed slice
    pub fn copy_from_slice(bytes: &[u8]) -> Self {
        Self(Bytes::copy_from_slice(bytes))
    }

    /// Raw ID bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Whether the ID has no bytes
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Borrow<[u8]> for SubscriberId {
    fn borrow(&self) -> &[u8] {
        &self.0
    }
}

impl AsRef<[u8]> for SubscriberId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<&str> for SubscriberId {
    fn from(id: &str) -> Self {
        Self::copy_from_slice(id.as_bytes())
    }
}

impl From<&[u8]> for SubscriberId {
    fn from(id: &[u8]) -> Self {
        Self::copy_from_slice(id)
    }
}

impl From<Bytes> for SubscriberId {
    fn from(id: Bytes) -> Self {
        Self(id)
    }
}

/// Lossy for logging only; bytes that are not UTF-8 show as U+FFFD
impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.0))
    }
}
