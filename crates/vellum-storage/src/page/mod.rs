//! Page layout and disk format for Vellum.
//!
//! All data lives in fixed-size pages (default 64 KB). A page is a slotted
//! container for variable-length versioned records:
//!
//! ```text
//! +----------------------+
//! |    Page Header       |  64 bytes (see header.rs)
//! +----------------------+
//! |    Slot Directory    |  6 bytes per slot, grows downward
//! |      [slot 0]        |  pointer word: 4 bytes, version: 2 bytes
//! |      [slot 1]        |
//! |        ...           |
//! +----------------------+
//! |                      |
//! |    Free Gap          |
//! |                      |
//! +----------------------+
//! |    Record Heap       |  grows upward from the end of the page
//! |     [entry 2]        |
//! |     [entry 1]        |
//! |     [entry 0]        |
//! +----------------------+
//! ```
//!
//! The slot directory and the record heap grow toward each other; when a
//! new entry would collide with the directory, the heap is defragmented in
//! place and the directory positions are fixed up.
//!
//! Deleted records leave a tombstoned slot behind. Tombstones thread an
//! intrusive LIFO freelist through the directory so slot ids stay stable
//! and can be reused by later inserts.

mod buffer;
mod checksum;
mod header;
mod recovery;
mod slotted;

pub use buffer::PageBuffer;
pub use checksum::{compute_page_checksum, update_page_checksum, verify_page_checksum};
pub use header::{HeaderView, PAGE_HEADER_SIZE};
pub use recovery::replay;
pub use slotted::{SlottedPage, ENTRY_HEADER_SIZE, SLOT_SIZE};
pub use vellum_common::types::SlotId;

/// Largest entry (header + payload) a page of the given size can hold.
#[inline]
#[must_use]
pub const fn max_entry_size(page_size: usize) -> usize {
    page_size - PAGE_HEADER_SIZE - SLOT_SIZE
}

/// Largest record payload a page of the given size can hold.
#[inline]
#[must_use]
pub const fn max_record_size(page_size: usize) -> usize {
    max_entry_size(page_size) - ENTRY_HEADER_SIZE
}

#[cfg(test)]
mod tests {
    use super::*;
    use vellum_common::constants::DEFAULT_PAGE_SIZE;

    #[test]
    fn test_page_geometry() {
        assert_eq!(PAGE_HEADER_SIZE, 64);
        assert_eq!(SLOT_SIZE, 6);
        assert_eq!(max_entry_size(DEFAULT_PAGE_SIZE), 65466);
        assert_eq!(max_record_size(DEFAULT_PAGE_SIZE), 65458);
    }
}
