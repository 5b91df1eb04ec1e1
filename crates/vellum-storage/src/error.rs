//! Storage error types.

use thiserror::Error;
use vellum_wal::WalError;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, PageError>;

/// Errors that can occur while operating on a page.
#[derive(Debug, Error)]
pub enum PageError {
    /// Buffer access outside the page bounds.
    #[error("page access out of bounds: offset {offset}, len {len}, page size {page_size}")]
    OutOfBounds {
        /// Starting byte offset of the access.
        offset: usize,
        /// Length of the access in bytes.
        len: usize,
        /// Size of the page buffer.
        page_size: usize,
    },

    /// The supplied buffer cannot back a page.
    #[error("invalid page size {size}: must be a power of two between {min} and {max}")]
    InvalidPageSize {
        /// Length of the supplied buffer.
        size: usize,
        /// Smallest supported page size.
        min: usize,
        /// Largest supported page size.
        max: usize,
    },

    /// On-page state contradicts a structural invariant.
    ///
    /// This indicates prior corruption; the page must not be used further.
    #[error("page invariant violated: {reason}")]
    InvariantViolation {
        /// Description of the violated invariant.
        reason: String,
    },

    /// The WAL sink rejected an append.
    ///
    /// The in-memory page may have been left mid-mutation and must be
    /// discarded by the caller.
    #[error("WAL append failed: {source}")]
    Wal {
        /// The underlying WAL error.
        #[from]
        source: WalError,
    },
}

impl PageError {
    /// Creates an invariant violation error.
    pub fn invariant(reason: impl Into<String>) -> Self {
        Self::InvariantViolation {
            reason: reason.into(),
        }
    }

    /// Returns true if the error indicates on-page corruption.
    pub fn is_corruption(&self) -> bool {
        matches!(self, Self::InvariantViolation { .. })
    }
}
