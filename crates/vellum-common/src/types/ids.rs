//! Core identifier types for Vellum.
//!
//! These types give the storage layer's numeric identifiers distinct
//! types, so a slot index cannot stand in for a page index (or any other
//! stray integer) without the compiler objecting.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Page identifier - the numeric index of a page within its file.
///
/// WAL records address a page by the pair (file name, page index); the
/// page-index half is this type. Pages also name each other through the
/// sibling link fields of the page header, where a missing sibling is
/// stored as `-1`; [`from_link`](Self::from_link) and
/// [`as_link`](Self::as_link) are that codec, so the on-disk sentinel
/// never leaks past the header layout.
///
/// # Example
///
/// ```rust
/// use vellum_common::types::PageId;
///
/// assert_eq!(PageId::from_link(PageId::NO_LINK), None);
/// assert_eq!(PageId::from_link(42), Some(PageId::new(42)));
/// assert_eq!(PageId::new(42).as_link(), 42);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct PageId(u64);

impl PageId {
    /// Encoded form of "no sibling" in a page header link field.
    pub const NO_LINK: i64 = -1;

    /// Creates a new `PageId` from a raw page index.
    #[inline]
    #[must_use]
    pub const fn new(index: u64) -> Self {
        Self(index)
    }

    /// Returns the raw page index.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Decodes a sibling link field; a negative link means no sibling.
    #[inline]
    #[must_use]
    pub const fn from_link(link: i64) -> Option<Self> {
        if link < 0 {
            None
        } else {
            Some(Self(link as u64))
        }
    }

    /// Encodes this page index for a sibling link field.
    #[inline]
    #[must_use]
    pub const fn as_link(self) -> i64 {
        self.0 as i64
    }
}

impl fmt::Debug for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PageId({})", self.0)
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Slot identifier - an index into a page's slot directory.
///
/// Slot ids are dense indexes starting at zero and stay stable for the
/// life of the page: deleting a record tombstones its slot rather than
/// removing it, and a later insert may reuse the id. The freelist
/// threaded through tombstoned slots names its members by slot id, as
/// does the `owning_slot` field of every heap entry.
///
/// A `SlotId` only means something relative to one page; the type exists
/// so ids from different pages (or arbitrary integers) cannot be mixed
/// up silently.
///
/// # Example
///
/// ```rust
/// use vellum_common::types::SlotId;
///
/// let slot = SlotId::new(3);
/// assert_eq!(slot.as_u32(), 3);
/// assert_eq!(slot.index(), 3);
/// assert!(SlotId::FIRST < slot);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct SlotId(u32);

impl SlotId {
    /// The first slot of a page.
    pub const FIRST: Self = Self(0);

    /// Creates a new `SlotId` from a raw directory index.
    #[inline]
    #[must_use]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Returns the raw directory index.
    #[inline]
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Returns the index widened for directory offset arithmetic.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SlotId({})", self.0)
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_id() {
        let page = PageId::new(42);
        assert_eq!(page.as_u64(), 42);
        assert!(PageId::new(1) < PageId::new(2));
        assert_eq!(page.to_string(), "42");
        assert_eq!(format!("{:?}", page), "PageId(42)");
    }

    #[test]
    fn test_page_link_codec() {
        assert_eq!(PageId::from_link(PageId::NO_LINK), None);
        assert_eq!(PageId::from_link(-7), None);
        assert_eq!(PageId::from_link(0), Some(PageId::new(0)));
        assert_eq!(PageId::from_link(42), Some(PageId::new(42)));

        // A decoded link encodes back to itself.
        let page = PageId::from_link(99).unwrap();
        assert_eq!(page.as_link(), 99);
    }

    #[test]
    fn test_slot_id() {
        let slot = SlotId::new(7);
        assert_eq!(slot.as_u32(), 7);
        assert_eq!(slot.index(), 7);
        assert_eq!(SlotId::FIRST.as_u32(), 0);
        assert!(SlotId::FIRST < slot);
        assert!(SlotId::new(1) < SlotId::new(2));
    }

    #[test]
    fn test_slot_id_display() {
        assert_eq!(SlotId::new(12).to_string(), "12");
        assert_eq!(format!("{:?}", SlotId::new(12)), "SlotId(12)");
    }
}
