//! Page header format.
//!
//! Every page starts with a 64-byte header (fields occupy 60 bytes; 4
//! reserved bytes keep the slot directory aligned):
//!
//! ```text
//! Offset  Size  Field
//! ------  ----  -----
//!   0       8   magic (reserved for page typing; written by higher layer)
//!   8       4   crc32 (computed by higher layer at flush)
//!  12       8   wal_segment (segment half of the last applied LSN)
//!  20       4   wal_position (position half of the last applied LSN)
//!  24       8   next_page (i64 sibling page index; -1 = none)
//!  32       8   prev_page (i64 sibling page index; -1 = none)
//!  40       4   freelist_head (0 = empty, else head slot id + 1)
//!  44       4   free_position (start of the record heap)
//!  48       4   free_space (bytes available for a new slot + entry)
//!  52       4   entries_count (live records)
//!  56       4   slot_count (slots ever allocated, live + tombstoned)
//!  60       4   reserved
//! ```
//!
//! The slotted page writes these fields exclusively through its logged
//! write path; this module only defines the geometry and a read-only view.

use vellum_common::types::{Lsn, PageId};

/// Size of the page header in bytes. The slot directory starts here.
pub const PAGE_HEADER_SIZE: usize = 64;

/// Offset of the magic field (reserved for the higher layer).
pub const MAGIC_OFFSET: usize = 0;

/// Offset of the crc32 field (computed by the higher layer at flush).
pub const CRC_OFFSET: usize = 8;

/// Offset of the segment half of the page LSN.
pub const WAL_SEGMENT_OFFSET: usize = 12;

/// Offset of the position half of the page LSN.
pub const WAL_POSITION_OFFSET: usize = 20;

/// Offset of the next sibling page index.
pub const NEXT_PAGE_OFFSET: usize = 24;

/// Offset of the previous sibling page index.
pub const PREV_PAGE_OFFSET: usize = 32;

/// Offset of the freelist head.
pub const FREELIST_HEAD_OFFSET: usize = 40;

/// Offset of the heap low-water mark.
pub const FREE_POSITION_OFFSET: usize = 44;

/// Offset of the free space counter.
pub const FREE_SPACE_OFFSET: usize = 48;

/// Offset of the live entry counter.
pub const ENTRIES_COUNT_OFFSET: usize = 52;

/// Offset of the slot directory length.
pub const SLOT_COUNT_OFFSET: usize = 56;

/// Read-only view over a page header.
///
/// Useful to higher layers (flush, recovery inspection) that hold the raw
/// page image without constructing a full page. Reads are not
/// synchronized; callers serialize access through external latching.
#[derive(Debug)]
pub struct HeaderView<'a> {
    data: &'a [u8],
}

impl<'a> HeaderView<'a> {
    /// Creates a header view over a page image.
    ///
    /// # Panics
    ///
    /// Panics if the buffer is smaller than [`PAGE_HEADER_SIZE`].
    #[inline]
    pub fn new(data: &'a [u8]) -> Self {
        assert!(
            data.len() >= PAGE_HEADER_SIZE,
            "buffer too small for page header"
        );
        Self { data }
    }

    /// Returns the magic field.
    #[inline]
    pub fn magic(&self) -> u64 {
        self.u64_at(MAGIC_OFFSET)
    }

    /// Returns the stored crc32 field.
    #[inline]
    pub fn crc32(&self) -> u32 {
        self.u32_at(CRC_OFFSET)
    }

    /// Returns the LSN of the last atomic update applied to the page.
    #[inline]
    pub fn lsn(&self) -> Lsn {
        Lsn::new(self.u64_at(WAL_SEGMENT_OFFSET), self.u32_at(WAL_POSITION_OFFSET))
    }

    /// Returns the next sibling page, if the page has one.
    #[inline]
    pub fn next_page(&self) -> Option<PageId> {
        PageId::from_link(self.i64_at(NEXT_PAGE_OFFSET))
    }

    /// Returns the previous sibling page, if the page has one.
    #[inline]
    pub fn prev_page(&self) -> Option<PageId> {
        PageId::from_link(self.i64_at(PREV_PAGE_OFFSET))
    }

    /// Returns the freelist head (0 = empty, else head slot id + 1).
    #[inline]
    pub fn freelist_head(&self) -> u32 {
        self.u32_at(FREELIST_HEAD_OFFSET)
    }

    /// Returns the byte offset where the record heap starts.
    #[inline]
    pub fn free_position(&self) -> u32 {
        self.u32_at(FREE_POSITION_OFFSET)
    }

    /// Returns the free space counter.
    #[inline]
    pub fn free_space(&self) -> u32 {
        self.u32_at(FREE_SPACE_OFFSET)
    }

    /// Returns the number of live entries.
    #[inline]
    pub fn entries_count(&self) -> u32 {
        self.u32_at(ENTRIES_COUNT_OFFSET)
    }

    /// Returns the number of slots ever allocated.
    #[inline]
    pub fn slot_count(&self) -> u32 {
        self.u32_at(SLOT_COUNT_OFFSET)
    }

    #[inline]
    fn u32_at(&self, offset: usize) -> u32 {
        u32::from_le_bytes(self.data[offset..offset + 4].try_into().unwrap())
    }

    #[inline]
    fn u64_at(&self, offset: usize) -> u64 {
        u64::from_le_bytes(self.data[offset..offset + 8].try_into().unwrap())
    }

    #[inline]
    fn i64_at(&self, offset: usize) -> i64 {
        i64::from_le_bytes(self.data[offset..offset + 8].try_into().unwrap())
    }
}
