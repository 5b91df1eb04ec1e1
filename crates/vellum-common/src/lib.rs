//! # vellum-common
//!
//! Shared vocabulary types for the Vellum record store:
//! identifier newtypes, log sequence numbers, record versions,
//! and the constants the storage and WAL crates agree on.

#![warn(missing_docs)]
#![warn(clippy::all)]

/// System-wide constants
pub mod constants;

/// Core type definitions
pub mod types;
