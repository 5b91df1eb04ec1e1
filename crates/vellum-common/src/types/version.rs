//! Per-record version stamps.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Monotonic per-record version used by optimistic concurrency control.
///
/// The storage layer treats versions as opaque: it only needs a total
/// order, an increment, and a fixed-width byte codec. The width is the
/// compile-time constant [`RecordVersion::SIZE`]; slot geometry in the
/// storage crate is derived from it.
///
/// # Example
///
/// ```rust
/// use vellum_common::types::RecordVersion;
///
/// let v = RecordVersion::new(7);
/// assert!(v < v.next());
/// assert_eq!(RecordVersion::from_le_bytes(v.to_le_bytes()), v);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct RecordVersion(u16);

impl RecordVersion {
    /// Serialized width in bytes.
    pub const SIZE: usize = 2;

    /// The initial version of a freshly inserted record.
    pub const ZERO: Self = Self(0);

    /// Creates a version from a raw counter value.
    #[inline]
    #[must_use]
    pub const fn new(value: u16) -> Self {
        Self(value)
    }

    /// Returns the raw counter value.
    #[inline]
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self.0
    }

    /// Returns the next version in the total order.
    #[inline]
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }

    /// Serializes the version to its fixed-width byte form.
    #[inline]
    #[must_use]
    pub fn to_le_bytes(self) -> [u8; Self::SIZE] {
        self.0.to_le_bytes()
    }

    /// Deserializes a version from its fixed-width byte form.
    #[inline]
    #[must_use]
    pub fn from_le_bytes(bytes: [u8; Self::SIZE]) -> Self {
        Self(u16::from_le_bytes(bytes))
    }
}

impl Default for RecordVersion {
    fn default() -> Self {
        Self::ZERO
    }
}

impl fmt::Debug for RecordVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecordVersion({})", self.0)
    }
}

impl fmt::Display for RecordVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u16> for RecordVersion {
    #[inline]
    fn from(value: u16) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering_and_increment() {
        let v = RecordVersion::new(10);
        assert!(v < v.next());
        assert_eq!(v.next().as_u16(), 11);
        assert!(RecordVersion::ZERO < v);
    }

    #[test]
    fn test_byte_roundtrip() {
        for raw in [0u16, 1, 0x1234, u16::MAX] {
            let v = RecordVersion::new(raw);
            assert_eq!(RecordVersion::from_le_bytes(v.to_le_bytes()), v);
        }
    }

    #[test]
    fn test_wrapping_increment() {
        let v = RecordVersion::new(u16::MAX);
        assert_eq!(v.next(), RecordVersion::ZERO);
    }
}
