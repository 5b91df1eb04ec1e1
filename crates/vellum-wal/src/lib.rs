//! # vellum-wal
//!
//! Write-ahead logging for the Vellum record store.
//!
//! The storage layer mutates pages byte-by-byte; before any byte reaches a
//! page buffer, a record describing that write is appended here. Each
//! page-level operation is bracketed by a start/end pair so recovery can
//! redo it as a unit or stop cleanly at its end record.
//!
//! This crate provides:
//! - The page-level record model ([`PageWalRecord`]) and its binary codec
//! - The [`WalSink`] trait the storage layer appends through
//! - [`MemoryWal`], an in-memory sink used for recovery verification and
//!   tests

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Error types
pub mod error;

/// Log record model and binary codec
pub mod record;

/// Append-only sinks
pub mod sink;

pub use error::{WalError, WalResult};
pub use record::{PageWalRecord, RecordKind};
pub use sink::{LoggedRecord, MemoryWal, WalSink};
