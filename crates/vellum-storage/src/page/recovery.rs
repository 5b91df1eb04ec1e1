//! Redo replay of page WAL records.
//!
//! Recovery rebuilds a page by reapplying the byte writes its operations
//! logged. Replay runs without a WAL sink attached (the records being
//! applied are already durable), which is exactly the page's nullary
//! logging mode: only direct buffer mutation happens.

use vellum_wal::{LoggedRecord, PageWalRecord};

use super::buffer::PageBuffer;
use super::header::{WAL_POSITION_OFFSET, WAL_SEGMENT_OFFSET};
use crate::error::StorageResult;

/// Applies a sequence of logged page records to a page buffer.
///
/// - `SetPageData` writes its bytes verbatim at its offset.
/// - `EndAtomicUpdate` stamps its own LSN into the header, reproducing
///   the stamp the page wrote when the frame closed.
/// - `StartAtomicUpdate` and `AddNewPage` carry no bytes; the caller uses
///   them to delimit redo units and allocate buffers.
///
/// The caller routes records here per page; everything passed in is
/// applied. Replaying the records emitted by any operation onto a
/// snapshot of the page taken just before it yields a byte-identical
/// page, including the final LSN stamp.
pub fn replay(buffer: &mut [u8], records: &[LoggedRecord]) -> StorageResult<()> {
    let mut page = PageBuffer::new(buffer)?;

    for logged in records {
        match &logged.record {
            PageWalRecord::SetPageData { bytes, offset, .. } => {
                page.write_bytes(*offset as usize, bytes)?;
            }
            PageWalRecord::EndAtomicUpdate { .. } => {
                page.write_u64(WAL_SEGMENT_OFFSET, logged.lsn.segment())?;
                page.write_u32(WAL_POSITION_OFFSET, logged.lsn.position())?;
            }
            PageWalRecord::StartAtomicUpdate { .. } | PageWalRecord::AddNewPage { .. } => {}
        }
    }

    Ok(())
}
