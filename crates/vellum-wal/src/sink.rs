//! Append-only WAL sinks.

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use vellum_common::types::Lsn;

use crate::error::{WalError, WalResult};
use crate::record::PageWalRecord;

/// An append-only log the storage layer writes page records through.
///
/// Implementations assign monotonically non-decreasing LSNs. The storage
/// layer only inspects the LSN returned for end-of-atomic-update records,
/// which it stamps into the page header.
pub trait WalSink {
    /// Appends a record and returns its assigned LSN.
    fn log(&self, record: PageWalRecord) -> WalResult<Lsn>;
}

/// A record stored in a [`MemoryWal`], together with its assigned LSN.
#[derive(Debug, Clone)]
pub struct LoggedRecord {
    /// LSN assigned at append time.
    pub lsn: Lsn,
    /// The appended record.
    pub record: PageWalRecord,
}

#[derive(Debug)]
struct MemoryWalState {
    segment: u64,
    next_position: u32,
    records: Vec<LoggedRecord>,
}

/// In-memory WAL sink.
///
/// Keeps every appended record together with its LSN, which makes it the
/// sink of choice for recovery verification: a test can run an operation,
/// snapshot the emitted records, and redo them onto a second buffer.
///
/// Positions advance by the serialized record length, the way a file-backed
/// sink would; when a segment's position space is exhausted the sink rolls
/// over to the next segment number, keeping LSNs strictly increasing.
#[derive(Debug)]
pub struct MemoryWal {
    state: Mutex<MemoryWalState>,
    closed: AtomicBool,
}

impl MemoryWal {
    /// Creates an empty sink starting at segment 1.
    pub fn new() -> Self {
        Self::with_segment(1)
    }

    /// Creates an empty sink starting at the given segment number.
    pub fn with_segment(segment: u64) -> Self {
        Self {
            state: Mutex::new(MemoryWalState {
                segment,
                next_position: 0,
                records: Vec::new(),
            }),
            closed: AtomicBool::new(false),
        }
    }

    /// Returns a snapshot of all appended records in append order.
    pub fn records(&self) -> Vec<LoggedRecord> {
        self.state.lock().records.clone()
    }

    /// Returns the number of appended records.
    pub fn len(&self) -> usize {
        self.state.lock().records.len()
    }

    /// Returns true if nothing has been appended.
    pub fn is_empty(&self) -> bool {
        self.state.lock().records.is_empty()
    }

    /// Returns the LSN of the most recently appended record.
    pub fn last_lsn(&self) -> Option<Lsn> {
        self.state.lock().records.last().map(|r| r.lsn)
    }

    /// Closes the sink; further appends fail with [`WalError::Closed`].
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    /// Returns true if the sink has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl Default for MemoryWal {
    fn default() -> Self {
        Self::new()
    }
}

impl WalSink for MemoryWal {
    fn log(&self, record: PageWalRecord) -> WalResult<Lsn> {
        if self.is_closed() {
            return Err(WalError::Closed);
        }

        // Serializing here both validates the record and yields the length
        // the position advances by.
        let serialized_len = record.serialize()?.len() as u32;

        let mut state = self.state.lock();
        if state.next_position.checked_add(serialized_len).is_none() {
            state.segment += 1;
            state.next_position = 0;
        }
        let lsn = Lsn::new(state.segment, state.next_position);
        state.next_position += serialized_len;
        state.records.push(LoggedRecord { lsn, record });

        Ok(lsn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vellum_common::types::PageId;

    fn start_record() -> PageWalRecord {
        PageWalRecord::start(PageId::new(0), "test.vdat")
    }

    #[test]
    fn test_lsn_monotonicity() {
        let wal = MemoryWal::new();

        let mut last = Lsn::ZERO;
        for _ in 0..100 {
            let lsn = wal.log(start_record()).unwrap();
            assert!(lsn > last);
            last = lsn;
        }
        assert_eq!(wal.last_lsn(), Some(last));
        assert_eq!(wal.len(), 100);
    }

    #[test]
    fn test_records_snapshot_preserves_order() {
        let wal = MemoryWal::new();
        wal.log(PageWalRecord::start(PageId::new(1), "a.vdat"))
            .unwrap();
        wal.log(PageWalRecord::set_page_data(
            vec![1, 2, 3],
            64,
            PageId::new(1),
            "a.vdat",
        ))
        .unwrap();
        wal.log(PageWalRecord::end(PageId::new(1), "a.vdat")).unwrap();

        let records = wal.records();
        assert_eq!(records.len(), 3);
        assert!(records[0].lsn < records[1].lsn);
        assert!(records[1].lsn < records[2].lsn);
        assert!(matches!(
            records[1].record,
            PageWalRecord::SetPageData { .. }
        ));
    }

    #[test]
    fn test_closed_sink_rejects_appends() {
        let wal = MemoryWal::new();
        wal.log(start_record()).unwrap();
        wal.close();
        assert!(wal.is_closed());
        assert!(matches!(wal.log(start_record()), Err(WalError::Closed)));
        assert_eq!(wal.len(), 1);
    }

    #[test]
    fn test_segment_rollover() {
        let wal = MemoryWal::with_segment(9);
        {
            let mut state = wal.state.lock();
            state.next_position = u32::MAX - 4;
        }
        let before = wal.log(start_record()).unwrap();
        let after = wal.log(start_record()).unwrap();
        assert_eq!(before.segment(), 10);
        assert!(after > before);
    }
}
