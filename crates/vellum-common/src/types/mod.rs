//! Type definitions for Vellum.
//!
//! This module contains the core types shared across the workspace.

mod ids;
mod lsn;
mod version;

pub use ids::{PageId, SlotId};
pub use lsn::Lsn;
pub use version::RecordVersion;
