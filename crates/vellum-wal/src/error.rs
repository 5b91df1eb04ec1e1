//! WAL error types.

use thiserror::Error;

/// Result type for WAL operations.
pub type WalResult<T> = Result<T, WalError>;

/// Errors that can occur during WAL operations.
#[derive(Debug, Error)]
pub enum WalError {
    /// The sink has been closed; no further records are accepted.
    #[error("WAL is closed")]
    Closed,

    /// WAL record payload exceeds the maximum size.
    #[error("WAL record too large: {size} bytes exceeds maximum {max} bytes")]
    RecordTooLarge {
        /// Size of the offending record payload.
        size: usize,
        /// Maximum allowed payload size.
        max: usize,
    },

    /// Invalid record framing magic.
    #[error("Invalid WAL record magic: expected {expected:#04x}, found {found:#04x}")]
    InvalidMagic {
        /// The magic byte every record must start with.
        expected: u8,
        /// The byte actually read.
        found: u8,
    },

    /// WAL record checksum mismatch.
    #[error("WAL record checksum mismatch: expected {expected:#010x}, computed {computed:#010x}")]
    ChecksumMismatch {
        /// Checksum stored in the record.
        expected: u32,
        /// Checksum computed over the record body.
        computed: u32,
    },

    /// WAL record serialization error.
    #[error("Failed to serialize WAL record: {reason}")]
    SerializationError {
        /// What went wrong.
        reason: String,
    },

    /// WAL record deserialization error.
    #[error("Failed to deserialize WAL record: {reason}")]
    DeserializationError {
        /// What went wrong.
        reason: String,
    },
}

impl WalError {
    /// Creates a serialization error.
    pub fn serialization_error(reason: impl Into<String>) -> Self {
        Self::SerializationError {
            reason: reason.into(),
        }
    }

    /// Creates a deserialization error.
    pub fn deserialization_error(reason: impl Into<String>) -> Self {
        Self::DeserializationError {
            reason: reason.into(),
        }
    }

    /// Creates a record too large error.
    pub fn record_too_large(size: usize, max: usize) -> Self {
        Self::RecordTooLarge { size, max }
    }

    /// Returns true if this error indicates a corrupted record.
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            Self::InvalidMagic { .. }
                | Self::ChecksumMismatch { .. }
                | Self::DeserializationError { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_predicates() {
        let err = WalError::ChecksumMismatch {
            expected: 0x1234,
            computed: 0x5678,
        };
        assert!(err.is_corruption());

        assert!(!WalError::Closed.is_corruption());
        assert!(!WalError::record_too_large(10, 5).is_corruption());
        assert!(WalError::deserialization_error("truncated").is_corruption());
    }

    #[test]
    fn test_error_display() {
        let err = WalError::record_too_large(100_000, 65_536);
        let msg = format!("{}", err);
        assert!(msg.contains("100000"));
        assert!(msg.contains("65536"));
    }
}
