//! # vellum-storage
//!
//! Storage layer of the Vellum record store.
//!
//! The central abstraction is the slotted record page: a fixed-size,
//! caller-provided buffer holding variable-length versioned records behind
//! a slot directory, with tombstone-based deletion, a freelist of reusable
//! slots, and in-place defragmentation. Every byte-level mutation is
//! logged through a write-ahead sink before it is applied, so any page
//! operation can be redone from its log records.

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Error types
pub mod error;

/// Page layout and the slotted record page
pub mod page;

pub use error::{PageError, StorageResult};
