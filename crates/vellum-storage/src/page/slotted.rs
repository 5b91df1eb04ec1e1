//! Slotted record page with write-ahead logging.
//!
//! A slotted page stores variable-length versioned records behind an
//! indirection layer (the slot directory). Records can be:
//!
//! - Appended without moving existing records
//! - Deleted by tombstoning their slot, which threads the slot onto a
//!   LIFO freelist for reuse
//! - Relocated by in-place defragmentation when the heap collides with
//!   the directory, without changing any slot id
//!
//! # Slot pointer word
//!
//! Each slot starts with a 32-bit pointer word followed by the record
//! version. Bits 0-15 hold the entry position inside the page; bit 16 is
//! the tombstone flag. For tombstoned slots the position bits are reused
//! as the next freelist link (0 terminates, `k > 0` points to slot
//! `k - 1`), the same encoding the header's freelist head uses. The
//! 16-bit position field is what caps pages at 64 KB.
//!
//! # Heap entries
//!
//! A live entry is `{size: i32, owning_slot: u32, payload}`, where `size`
//! counts the 8-byte entry header. Deleting a record negates `size` in
//! place; the magnitude of a negative size is the width of the
//! reclaimable hole.
//!
//! # Write-ahead logging
//!
//! Every mutating operation is bracketed by start/end atomic-update
//! records, and every byte written to the page is first emitted as a
//! `SetPageData` record carrying the exact bytes and offset. The LSN
//! assigned to the end record is stamped into the header directly (not
//! through another logged write); redo derives the same stamp from the
//! end record itself. With no sink attached the page skips all emission
//! and only mutates the buffer, which is the mode recovery replay runs
//! in.

use bytes::Bytes;

use vellum_common::types::{Lsn, PageId, RecordVersion, SlotId};
use vellum_wal::{PageWalRecord, WalSink};

use super::buffer::PageBuffer;
use super::header::{
    ENTRIES_COUNT_OFFSET, FREELIST_HEAD_OFFSET, FREE_POSITION_OFFSET, FREE_SPACE_OFFSET,
    NEXT_PAGE_OFFSET, PAGE_HEADER_SIZE, PREV_PAGE_OFFSET, SLOT_COUNT_OFFSET, WAL_POSITION_OFFSET,
    WAL_SEGMENT_OFFSET,
};
use crate::error::{PageError, StorageResult};

/// Size of each slot in bytes: 4-byte pointer word + the record version.
pub const SLOT_SIZE: usize = SLOT_POINTER_SIZE + RecordVersion::SIZE;

/// Size of the per-entry header in the record heap.
pub const ENTRY_HEADER_SIZE: usize = 8;

/// Width of the slot pointer word.
const SLOT_POINTER_SIZE: usize = 4;

/// Tombstone bit in the slot pointer word.
const TOMBSTONE_FLAG: u32 = 1 << 16;

/// Mask of the position bits in the slot pointer word.
const POSITION_MASK: u32 = 0xFFFF;

/// A slotted record page bound to a caller-provided buffer.
///
/// The page is not internally synchronized: it assumes a single
/// cooperative caller, with cross-thread serialization owned by the
/// enclosing latching layer. Read-only accessors never emit WAL records
/// and are likewise only safe under that external latching.
///
/// Atomic-update frames are recovery brackets, not transactions. If the
/// WAL sink fails partway through an operation the in-memory page may be
/// left inconsistent; the caller must discard it and reread the buffer
/// from disk.
///
/// # Example
///
/// ```rust
/// use vellum_common::types::{PageId, RecordVersion};
/// use vellum_storage::page::SlottedPage;
///
/// let mut buffer = vec![0u8; 65536];
/// let mut page = SlottedPage::new(&mut buffer, None, PageId::new(0), "records.vdat").unwrap();
///
/// let slot = page
///     .append_record(RecordVersion::new(1), b"Hello, Vellum!")
///     .unwrap()
///     .expect("fresh page has space");
/// assert_eq!(page.record(slot).unwrap(), b"Hello, Vellum!");
///
/// assert!(page.delete_record(slot).unwrap());
/// assert!(page.record(slot).is_none());
/// ```
pub struct SlottedPage<'a> {
    buffer: PageBuffer<'a>,
    wal: Option<&'a dyn WalSink>,
    page_id: PageId,
    file_name: String,
}

impl<'a> SlottedPage<'a> {
    /// Initializes a fresh page over a zero-filled buffer.
    ///
    /// Emits an `AddNewPage` record, detaches both sibling pointers and
    /// sets up the free-space accounting, all inside one atomic-update
    /// frame. The buffer must be zero-filled, as buffers handed out for
    /// new pages are; counters not written here (freelist head, entry and
    /// slot counts) rely on that.
    pub fn new(
        buffer: &'a mut [u8],
        wal: Option<&'a dyn WalSink>,
        page_id: PageId,
        file_name: impl Into<String>,
    ) -> StorageResult<Self> {
        let mut page = Self::attach(buffer, wal, page_id, file_name)?;

        page.start_atomic_update()?;
        let result = page.format_new();
        let end = page.end_atomic_update();
        result?;
        end?;

        Ok(page)
    }

    /// Wraps an already-initialized page buffer read back from disk.
    pub fn attach(
        buffer: &'a mut [u8],
        wal: Option<&'a dyn WalSink>,
        page_id: PageId,
        file_name: impl Into<String>,
    ) -> StorageResult<Self> {
        Ok(Self {
            buffer: PageBuffer::new(buffer)?,
            wal,
            page_id,
            file_name: file_name.into(),
        })
    }

    fn format_new(&mut self) -> StorageResult<()> {
        self.log_add_new_page()?;

        let page_size = self.buffer.page_size();
        self.set_i64(NEXT_PAGE_OFFSET, PageId::NO_LINK)?;
        self.set_i64(PREV_PAGE_OFFSET, PageId::NO_LINK)?;
        self.set_u32(FREE_POSITION_OFFSET, page_size as u32)?;
        self.set_u32(FREE_SPACE_OFFSET, (page_size - PAGE_HEADER_SIZE) as u32)?;
        Ok(())
    }

    // =========================================================================
    // Record operations
    // =========================================================================

    /// Appends a record, returning its slot id.
    ///
    /// Returns `Ok(None)` when the page cannot fit the record; the frame
    /// still closes cleanly without mutating the page and the caller is
    /// expected to retry on a different page.
    ///
    /// A tombstoned slot is reused in LIFO order when one is available;
    /// its stored version is merged with `version` so versions stay
    /// monotonic across the slot's lifetimes: the larger of `version` and
    /// the stored version's increment wins. Fresh slots store `version`
    /// as supplied.
    pub fn append_record(
        &mut self,
        version: RecordVersion,
        payload: &[u8],
    ) -> StorageResult<Option<SlotId>> {
        self.start_atomic_update()?;
        let result = self.do_append(version, payload);
        let end = self.end_atomic_update();
        let slot = result?;
        end?;
        Ok(slot)
    }

    fn do_append(
        &mut self,
        version: RecordVersion,
        payload: &[u8],
    ) -> StorageResult<Option<SlotId>> {
        let entry_size = payload.len() + ENTRY_HEADER_SIZE;
        let slot_count = self.slot_count();
        let directory_end = PAGE_HEADER_SIZE + slot_count as usize * SLOT_SIZE;
        let freelist_head = self.freelist_head();

        if !self.has_space_for(entry_size, freelist_head) {
            return Ok(None);
        }

        // The new entry lands at [free_position - entry_size, free_position).
        // If that range would collide with the directory (including the
        // slot a fresh append is about to allocate), coalesce the heap
        // first.
        let free_position = self.free_position();
        if freelist_head > 0 {
            if free_position < directory_end + entry_size {
                self.defragment()?;
            }
        } else if free_position < directory_end + SLOT_SIZE + entry_size {
            self.defragment()?;
        }

        let free_position = self.free_position() - entry_size;

        let slot = if freelist_head > 0 {
            let slot = SlotId::new(freelist_head - 1);
            let slot_offset = Self::slot_offset(slot);

            let next_link = self.buffer.read_u32(slot_offset)? & POSITION_MASK;
            self.set_u32(FREELIST_HEAD_OFFSET, next_link)?;
            self.set_u32(FREE_SPACE_OFFSET, (self.free_space() - entry_size) as u32)?;
            self.set_u32(slot_offset, free_position as u32)?;

            let stored = self.record_version(slot);
            let merged = if stored < version {
                version
            } else {
                stored.next()
            };
            self.set_bytes(slot_offset + SLOT_POINTER_SIZE, &merged.to_le_bytes())?;

            slot
        } else {
            let slot = SlotId::new(slot_count);
            let slot_offset = Self::slot_offset(slot);

            self.set_u32(SLOT_COUNT_OFFSET, slot_count + 1)?;
            self.set_u32(
                FREE_SPACE_OFFSET,
                (self.free_space() - entry_size - SLOT_SIZE) as u32,
            )?;
            self.set_u32(slot_offset, free_position as u32)?;
            self.set_bytes(slot_offset + SLOT_POINTER_SIZE, &version.to_le_bytes())?;

            slot
        };

        self.set_i32(free_position, entry_size as i32)?;
        self.set_u32(free_position + 4, slot.as_u32())?;
        self.set_bytes(free_position + ENTRY_HEADER_SIZE, payload)?;

        self.set_u32(FREE_POSITION_OFFSET, free_position as u32)?;
        self.set_u32(ENTRIES_COUNT_OFFSET, self.records_count() + 1)?;

        Ok(Some(slot))
    }

    /// Deletes a record, tombstoning its slot.
    ///
    /// Returns `Ok(false)` without mutating anything if the slot is out
    /// of range or already tombstoned; deleting twice is not an error.
    /// The tombstoned slot becomes the new freelist head and the entry's
    /// size is negated in the heap, marking the hole for the next
    /// defragmentation.
    pub fn delete_record(&mut self, slot: SlotId) -> StorageResult<bool> {
        self.start_atomic_update()?;
        let result = self.do_delete(slot);
        let end = self.end_atomic_update();
        let deleted = result?;
        end?;
        Ok(deleted)
    }

    fn do_delete(&mut self, slot: SlotId) -> StorageResult<bool> {
        if slot.as_u32() >= self.slot_count() {
            return Ok(false);
        }

        let slot_offset = Self::slot_offset(slot);
        let pointer = self.buffer.read_u32(slot_offset)?;
        if pointer & TOMBSTONE_FLAG != 0 {
            return Ok(false);
        }
        let entry_position = (pointer & POSITION_MASK) as usize;

        let freelist_head = self.freelist_head();
        self.set_u32(slot_offset, freelist_head | TOMBSTONE_FLAG)?;
        self.set_u32(FREELIST_HEAD_OFFSET, slot.as_u32() + 1)?;

        let entry_size = self.buffer.read_i32(entry_position)?;
        if entry_size <= 0 {
            return Err(PageError::invariant(format!(
                "entry at {} of live slot {} has size {}",
                entry_position, slot, entry_size
            )));
        }
        self.set_i32(entry_position, -entry_size)?;

        self.set_u32(
            FREE_SPACE_OFFSET,
            (self.free_space() + entry_size as usize) as u32,
        )?;
        self.set_u32(ENTRIES_COUNT_OFFSET, self.records_count() - 1)?;

        Ok(true)
    }

    /// Links the page to its forward sibling (`None` detaches).
    pub fn set_next_page(&mut self, next_page: Option<PageId>) -> StorageResult<()> {
        self.set_sibling(NEXT_PAGE_OFFSET, next_page)
    }

    /// Links the page to its backward sibling (`None` detaches).
    pub fn set_prev_page(&mut self, prev_page: Option<PageId>) -> StorageResult<()> {
        self.set_sibling(PREV_PAGE_OFFSET, prev_page)
    }

    fn set_sibling(&mut self, offset: usize, page: Option<PageId>) -> StorageResult<()> {
        self.start_atomic_update()?;
        let result = self.set_i64(offset, page.map_or(PageId::NO_LINK, PageId::as_link));
        let end = self.end_atomic_update();
        result?;
        end
    }

    // =========================================================================
    // Read-only accessors
    //
    // None of these emit WAL records or frame an atomic update; they are
    // safe only while the caller holds the page latched.
    // =========================================================================

    /// Returns the payload of a live record, or `None` if the slot is out
    /// of range or tombstoned.
    ///
    /// The returned slice borrows the page buffer; no bytes are copied.
    pub fn record(&self, slot: SlotId) -> Option<&[u8]> {
        let pointer = self.slot_pointer(slot)?;
        if pointer & TOMBSTONE_FLAG != 0 {
            return None;
        }

        let entry_position = (pointer & POSITION_MASK) as usize;
        let page_size = self.buffer.page_size();
        if entry_position + ENTRY_HEADER_SIZE > page_size {
            return None;
        }

        let entry_size = self.buffer.i32_at(entry_position);
        if entry_size < ENTRY_HEADER_SIZE as i32
            || entry_position + entry_size as usize > page_size
        {
            return None;
        }

        Some(self.buffer.bytes_at(
            entry_position + ENTRY_HEADER_SIZE,
            entry_size as usize - ENTRY_HEADER_SIZE,
        ))
    }

    /// Returns the payload length of a live record, or `None` if the slot
    /// is out of range or tombstoned.
    pub fn record_size(&self, slot: SlotId) -> Option<usize> {
        self.record(slot).map(<[u8]>::len)
    }

    /// Returns the version stored in a slot.
    ///
    /// Tombstoned slots keep their last version (the next reuse merges
    /// against it); callers interested in live records should check
    /// [`is_deleted`](Self::is_deleted) first.
    ///
    /// # Panics
    ///
    /// Panics if `slot` is out of range.
    pub fn record_version(&self, slot: SlotId) -> RecordVersion {
        assert!(slot.as_u32() < self.slot_count(), "slot {} out of range", slot);
        let offset = Self::slot_offset(slot) + SLOT_POINTER_SIZE;
        let bytes = self.buffer.bytes_at(offset, RecordVersion::SIZE);
        RecordVersion::from_le_bytes(bytes.try_into().unwrap())
    }

    /// Returns true if the slot is tombstoned or out of range.
    pub fn is_deleted(&self, slot: SlotId) -> bool {
        self.slot_pointer(slot)
            .map_or(true, |pointer| pointer & TOMBSTONE_FLAG != 0)
    }

    /// Finds the first tombstoned slot at or after `from`.
    pub fn find_first_deleted(&self, from: SlotId) -> Option<SlotId> {
        (from.as_u32()..self.slot_count())
            .map(SlotId::new)
            .find(|&slot| self.is_deleted(slot))
    }

    /// Finds the first live slot at or after `from`.
    pub fn find_first_live(&self, from: SlotId) -> Option<SlotId> {
        (from.as_u32()..self.slot_count())
            .map(SlotId::new)
            .find(|&slot| !self.is_deleted(slot))
    }

    /// Finds the last live slot at or before `at_or_before`.
    pub fn find_last_live(&self, at_or_before: SlotId) -> Option<SlotId> {
        let slot_count = self.slot_count();
        if slot_count == 0 {
            return None;
        }
        let start = at_or_before.as_u32().min(slot_count - 1);
        (0..=start)
            .rev()
            .map(SlotId::new)
            .find(|&slot| !self.is_deleted(slot))
    }

    /// Iterates over live records as `(slot id, payload)` pairs in slot
    /// order.
    pub fn records(&self) -> impl Iterator<Item = (SlotId, &[u8])> + '_ {
        (0..self.slot_count())
            .map(SlotId::new)
            .filter_map(move |slot| self.record(slot).map(|r| (slot, r)))
    }

    /// Returns the free space counter: the bytes available to a new
    /// slot-plus-entry pair, including not-yet-compacted holes.
    pub fn free_space(&self) -> usize {
        self.buffer.u32_at(FREE_SPACE_OFFSET) as usize
    }

    /// Returns the largest payload the next append can take.
    ///
    /// When a tombstoned slot is available the whole free space counter
    /// backs the entry; otherwise a fresh slot claims its share first.
    pub fn max_record_size(&self) -> usize {
        let max_entry_size = if self.freelist_head() > 0 {
            self.free_space()
        } else {
            self.free_space().saturating_sub(SLOT_SIZE)
        };
        max_entry_size.saturating_sub(ENTRY_HEADER_SIZE)
    }

    /// Returns the number of live records.
    pub fn records_count(&self) -> u32 {
        self.buffer.u32_at(ENTRIES_COUNT_OFFSET)
    }

    /// Returns the number of slots ever allocated (live + tombstoned).
    pub fn slot_count(&self) -> u32 {
        self.buffer.u32_at(SLOT_COUNT_OFFSET)
    }

    /// Returns true if nothing was ever appended, or everything appended
    /// has been deleted *and* no slot was ever allocated.
    ///
    /// This is an accounting equality on the free space counter: a page
    /// whose slots are all tombstoned still pays for its directory and is
    /// not empty.
    pub fn is_empty(&self) -> bool {
        self.free_space() == self.buffer.page_size() - PAGE_HEADER_SIZE
    }

    /// Returns the forward sibling page, if the page has one.
    pub fn next_page(&self) -> Option<PageId> {
        PageId::from_link(self.buffer.i64_at(NEXT_PAGE_OFFSET))
    }

    /// Returns the backward sibling page, if the page has one.
    pub fn prev_page(&self) -> Option<PageId> {
        PageId::from_link(self.buffer.i64_at(PREV_PAGE_OFFSET))
    }

    /// Returns the LSN of the last atomic update applied to this page.
    pub fn lsn(&self) -> Lsn {
        Lsn::new(
            self.buffer.u64_at(WAL_SEGMENT_OFFSET),
            self.buffer.u32_at(WAL_POSITION_OFFSET),
        )
    }

    /// Returns the page size in bytes.
    pub fn page_size(&self) -> usize {
        self.buffer.page_size()
    }

    /// Returns the whole page image.
    ///
    /// This is what the flushing layer writes to disk (after stamping the
    /// magic and crc32 fields it owns).
    pub fn as_bytes(&self) -> &[u8] {
        self.buffer.as_slice()
    }

    /// Returns the page index within its file.
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    /// Returns the name of the file owning this page.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    // =========================================================================
    // Space management
    // =========================================================================

    fn has_space_for(&self, entry_size: usize, freelist_head: u32) -> bool {
        if freelist_head > 0 {
            self.free_space() >= entry_size
        } else {
            self.free_space() >= entry_size + SLOT_SIZE
        }
    }

    /// Coalesces all heap holes into the free gap next to the directory.
    ///
    /// Single upward pass from `free_position`: live entries are recorded,
    /// and each hole moves everything below it up by the hole width, after
    /// which every recorded live slot's position is advanced by the same
    /// amount. A live entry thus gets shifted once per hole on its
    /// low-address side. Tombstone links are position-free and stay
    /// untouched. `free_space` is unchanged; holes were already counted
    /// free.
    fn defragment(&mut self) -> StorageResult<()> {
        let page_size = self.buffer.page_size();
        let mut free_position = self.free_position();
        let mut cursor = free_position;
        let mut shifted_slots: Vec<SlotId> = Vec::new();

        while cursor < page_size {
            let entry_size = self.buffer.read_i32(cursor)?;

            if entry_size > 0 {
                let owning_slot = SlotId::new(self.buffer.read_u32(cursor + 4)?);
                shifted_slots.push(owning_slot);
                cursor += entry_size as usize;
            } else if entry_size < 0 {
                let hole = -(entry_size as i64) as usize;
                self.shift_bytes(free_position, free_position + hole, cursor - free_position)?;
                cursor += hole;
                free_position += hole;

                for &slot in &shifted_slots {
                    let slot_offset = Self::slot_offset(slot);
                    let position = self.buffer.read_u32(slot_offset)?;
                    self.set_u32(slot_offset, position + hole as u32)?;
                }
            } else {
                return Err(PageError::invariant(format!(
                    "zero-size entry at heap offset {}",
                    cursor
                )));
            }
        }

        self.set_u32(FREE_POSITION_OFFSET, free_position as u32)
    }

    fn free_position(&self) -> usize {
        self.buffer.u32_at(FREE_POSITION_OFFSET) as usize
    }

    fn freelist_head(&self) -> u32 {
        self.buffer.u32_at(FREELIST_HEAD_OFFSET)
    }

    fn slot_pointer(&self, slot: SlotId) -> Option<u32> {
        if slot.as_u32() >= self.slot_count() {
            return None;
        }
        Some(self.buffer.u32_at(Self::slot_offset(slot)))
    }

    #[inline]
    fn slot_offset(slot: SlotId) -> usize {
        PAGE_HEADER_SIZE + slot.index() * SLOT_SIZE
    }

    // =========================================================================
    // Logged writes
    //
    // Log-ahead: the record carrying the exact bytes goes to the sink
    // before the buffer mutation. The range is validated first so a
    // doomed write is never logged.
    // =========================================================================

    fn set_bytes(&mut self, offset: usize, bytes: &[u8]) -> StorageResult<()> {
        self.buffer.check_range(offset, bytes.len())?;
        if let Some(wal) = self.wal {
            wal.log(PageWalRecord::set_page_data(
                Bytes::copy_from_slice(bytes),
                offset as u32,
                self.page_id,
                self.file_name.clone(),
            ))?;
        }
        self.buffer.write_bytes(offset, bytes)
    }

    fn set_u32(&mut self, offset: usize, value: u32) -> StorageResult<()> {
        self.set_bytes(offset, &value.to_le_bytes())
    }

    fn set_i32(&mut self, offset: usize, value: i32) -> StorageResult<()> {
        self.set_bytes(offset, &value.to_le_bytes())
    }

    fn set_i64(&mut self, offset: usize, value: i64) -> StorageResult<()> {
        self.set_bytes(offset, &value.to_le_bytes())
    }

    /// Moves heap bytes and logs them at their destination offset.
    fn shift_bytes(&mut self, from: usize, to: usize, len: usize) -> StorageResult<()> {
        self.buffer.check_range(from, len)?;
        self.buffer.check_range(to, len)?;
        if let Some(wal) = self.wal {
            let content = self.buffer.read_bytes(from, len)?;
            wal.log(PageWalRecord::set_page_data(
                Bytes::copy_from_slice(content),
                to as u32,
                self.page_id,
                self.file_name.clone(),
            ))?;
        }
        self.buffer.shift(from, to, len)
    }

    // =========================================================================
    // Atomic update framing
    // =========================================================================

    fn start_atomic_update(&self) -> StorageResult<()> {
        if let Some(wal) = self.wal {
            wal.log(PageWalRecord::start(self.page_id, self.file_name.clone()))?;
        }
        Ok(())
    }

    /// Closes the frame and stamps its LSN into the header.
    ///
    /// The stamp is a direct buffer write: it is derived from the end
    /// record during redo, so logging it again would only duplicate it.
    fn end_atomic_update(&mut self) -> StorageResult<()> {
        if let Some(wal) = self.wal {
            let lsn = wal.log(PageWalRecord::end(self.page_id, self.file_name.clone()))?;
            self.buffer.write_u64(WAL_SEGMENT_OFFSET, lsn.segment())?;
            self.buffer.write_u32(WAL_POSITION_OFFSET, lsn.position())?;
        }
        Ok(())
    }

    fn log_add_new_page(&self) -> StorageResult<()> {
        if let Some(wal) = self.wal {
            wal.log(PageWalRecord::add_new_page(
                self.page_id,
                self.file_name.clone(),
            ))?;
        }
        Ok(())
    }
}
