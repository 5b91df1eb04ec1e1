//! Page-level WAL records and their binary codec.
//!
//! Four record kinds cover everything the slotted page emits:
//!
//! - `StartAtomicUpdate` / `EndAtomicUpdate` bracket one page operation
//! - `AddNewPage` marks the initialization of a fresh page
//! - `SetPageData` carries the exact bytes of one in-page write, at the
//!   offset they were applied, so recovery can reapply the write verbatim
//!
//! # Wire format
//!
//! ```text
//! Offset  Size  Field
//! ------  ----  -----
//!   0       1   magic (0x56)
//!   1       1   record kind
//!   2       8   page index within the file
//!  10       2   file name length
//!  12       n   file name (UTF-8)
//!  ...          kind-specific fields (SetPageData: offset u32, data len
//!               u32, data bytes)
//!   end     4   CRC32 of everything after the magic byte
//! ```

use bytes::{BufMut, Bytes, BytesMut};

use vellum_common::constants::{MAX_WAL_PAYLOAD_SIZE, WAL_RECORD_MAGIC};
use vellum_common::types::PageId;

use crate::error::{WalError, WalResult};

/// Record kind identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RecordKind {
    /// Opens an atomic page update.
    StartAtomicUpdate = 1,
    /// Closes an atomic page update.
    EndAtomicUpdate = 2,
    /// A fresh page was initialized.
    AddNewPage = 3,
    /// Raw bytes written at an offset inside a page.
    SetPageData = 4,
}

impl RecordKind {
    /// Converts the record kind to a u8.
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Creates a record kind from a u8.
    pub fn from_u8(value: u8) -> WalResult<Self> {
        match value {
            1 => Ok(Self::StartAtomicUpdate),
            2 => Ok(Self::EndAtomicUpdate),
            3 => Ok(Self::AddNewPage),
            4 => Ok(Self::SetPageData),
            _ => Err(WalError::deserialization_error(format!(
                "Unknown record kind: {}",
                value
            ))),
        }
    }
}

/// A page-level WAL record.
///
/// Every variant carries the `(page index, file name)` pair that addresses
/// the target page; `SetPageData` additionally carries the written bytes
/// and their in-page offset, which is enough to reapply the write during
/// recovery without consulting anything else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageWalRecord {
    /// Opens an atomic update on a page.
    StartAtomicUpdate {
        /// Target page index within its file.
        page_id: PageId,
        /// Name of the file owning the page.
        file_name: String,
    },
    /// Closes an atomic update on a page.
    ///
    /// The LSN assigned to this record becomes the page's header LSN.
    EndAtomicUpdate {
        /// Target page index within its file.
        page_id: PageId,
        /// Name of the file owning the page.
        file_name: String,
    },
    /// Records the initialization of a fresh page.
    AddNewPage {
        /// Index of the new page within its file.
        page_id: PageId,
        /// Name of the file owning the page.
        file_name: String,
    },
    /// Raw bytes written at an offset inside a page.
    SetPageData {
        /// The bytes that were written.
        bytes: Bytes,
        /// Byte offset within the page where the write was applied.
        offset: u32,
        /// Target page index within its file.
        page_id: PageId,
        /// Name of the file owning the page.
        file_name: String,
    },
}

impl PageWalRecord {
    /// Creates a start-of-atomic-update record.
    pub fn start(page_id: PageId, file_name: impl Into<String>) -> Self {
        Self::StartAtomicUpdate {
            page_id,
            file_name: file_name.into(),
        }
    }

    /// Creates an end-of-atomic-update record.
    pub fn end(page_id: PageId, file_name: impl Into<String>) -> Self {
        Self::EndAtomicUpdate {
            page_id,
            file_name: file_name.into(),
        }
    }

    /// Creates an add-new-page record.
    pub fn add_new_page(page_id: PageId, file_name: impl Into<String>) -> Self {
        Self::AddNewPage {
            page_id,
            file_name: file_name.into(),
        }
    }

    /// Creates a set-page-data record.
    pub fn set_page_data(
        bytes: impl Into<Bytes>,
        offset: u32,
        page_id: PageId,
        file_name: impl Into<String>,
    ) -> Self {
        Self::SetPageData {
            bytes: bytes.into(),
            offset,
            page_id,
            file_name: file_name.into(),
        }
    }

    /// Returns the record kind.
    pub fn kind(&self) -> RecordKind {
        match self {
            Self::StartAtomicUpdate { .. } => RecordKind::StartAtomicUpdate,
            Self::EndAtomicUpdate { .. } => RecordKind::EndAtomicUpdate,
            Self::AddNewPage { .. } => RecordKind::AddNewPage,
            Self::SetPageData { .. } => RecordKind::SetPageData,
        }
    }

    /// Returns the target page index.
    pub fn page_id(&self) -> PageId {
        match self {
            Self::StartAtomicUpdate { page_id, .. }
            | Self::EndAtomicUpdate { page_id, .. }
            | Self::AddNewPage { page_id, .. }
            | Self::SetPageData { page_id, .. } => *page_id,
        }
    }

    /// Returns the name of the file owning the target page.
    pub fn file_name(&self) -> &str {
        match self {
            Self::StartAtomicUpdate { file_name, .. }
            | Self::EndAtomicUpdate { file_name, .. }
            | Self::AddNewPage { file_name, .. }
            | Self::SetPageData { file_name, .. } => file_name,
        }
    }

    /// Serializes the record to its wire form.
    pub fn serialize(&self) -> WalResult<Bytes> {
        let file_name = self.file_name();
        if file_name.len() > u16::MAX as usize {
            return Err(WalError::serialization_error(format!(
                "file name too long: {} bytes",
                file_name.len()
            )));
        }

        let mut buf = BytesMut::with_capacity(32 + file_name.len());
        buf.put_u8(WAL_RECORD_MAGIC);
        buf.put_u8(self.kind().as_u8());
        buf.put_u64(self.page_id().as_u64());
        buf.put_u16(file_name.len() as u16);
        buf.put_slice(file_name.as_bytes());

        if let Self::SetPageData { bytes, offset, .. } = self {
            if bytes.len() > MAX_WAL_PAYLOAD_SIZE {
                return Err(WalError::record_too_large(bytes.len(), MAX_WAL_PAYLOAD_SIZE));
            }
            buf.put_u32(*offset);
            buf.put_u32(bytes.len() as u32);
            buf.put_slice(bytes);
        }

        let checksum = crc32fast::hash(&buf[1..]);
        buf.put_u32(checksum);

        Ok(buf.freeze())
    }

    /// Deserializes one record from the front of `bytes`.
    ///
    /// Returns the record and the number of bytes consumed, so a reader
    /// can walk a concatenated record stream.
    pub fn deserialize(bytes: &[u8]) -> WalResult<(Self, usize)> {
        let mut cursor = Cursor::new(bytes);

        let magic = cursor.read_u8()?;
        if magic != WAL_RECORD_MAGIC {
            return Err(WalError::InvalidMagic {
                expected: WAL_RECORD_MAGIC,
                found: magic,
            });
        }

        let kind = RecordKind::from_u8(cursor.read_u8()?)?;
        let page_id = PageId::new(cursor.read_u64()?);
        let name_len = cursor.read_u16()? as usize;
        let file_name = std::str::from_utf8(cursor.read_slice(name_len)?)
            .map_err(|_| WalError::deserialization_error("file name is not valid UTF-8"))?
            .to_owned();

        let record = match kind {
            RecordKind::StartAtomicUpdate => Self::StartAtomicUpdate { page_id, file_name },
            RecordKind::EndAtomicUpdate => Self::EndAtomicUpdate { page_id, file_name },
            RecordKind::AddNewPage => Self::AddNewPage { page_id, file_name },
            RecordKind::SetPageData => {
                let offset = cursor.read_u32()?;
                let data_len = cursor.read_u32()? as usize;
                if data_len > MAX_WAL_PAYLOAD_SIZE {
                    return Err(WalError::deserialization_error(format!(
                        "page data length {} exceeds maximum {}",
                        data_len, MAX_WAL_PAYLOAD_SIZE
                    )));
                }
                let data = Bytes::copy_from_slice(cursor.read_slice(data_len)?);
                Self::SetPageData {
                    bytes: data,
                    offset,
                    page_id,
                    file_name,
                }
            }
        };

        let body_end = cursor.position();
        let expected = cursor.read_u32()?;
        let computed = crc32fast::hash(&bytes[1..body_end]);
        if expected != computed {
            return Err(WalError::ChecksumMismatch { expected, computed });
        }

        Ok((record, cursor.position()))
    }
}

/// Bounds-checked forward reader over a record slice.
struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn position(&self) -> usize {
        self.pos
    }

    fn read_slice(&mut self, len: usize) -> WalResult<&'a [u8]> {
        if self.bytes.len() - self.pos < len {
            return Err(WalError::deserialization_error(format!(
                "record truncated: need {} bytes at offset {}, have {}",
                len,
                self.pos,
                self.bytes.len() - self.pos
            )));
        }
        let slice = &self.bytes[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn read_u8(&mut self) -> WalResult<u8> {
        Ok(self.read_slice(1)?[0])
    }

    fn read_u16(&mut self) -> WalResult<u16> {
        let bytes = self.read_slice(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    fn read_u32(&mut self) -> WalResult<u32> {
        let bytes = self.read_slice(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn read_u64(&mut self) -> WalResult<u64> {
        let bytes = self.read_slice(8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(bytes);
        Ok(u64::from_be_bytes(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_kind_roundtrip() {
        for kind in [
            RecordKind::StartAtomicUpdate,
            RecordKind::EndAtomicUpdate,
            RecordKind::AddNewPage,
            RecordKind::SetPageData,
        ] {
            let byte = kind.as_u8();
            assert_eq!(RecordKind::from_u8(byte).unwrap(), kind);
        }
    }

    #[test]
    fn test_invalid_record_kind() {
        assert!(RecordKind::from_u8(0).is_err());
        assert!(RecordKind::from_u8(255).is_err());
    }

    #[test]
    fn test_framing_record_roundtrip() {
        let record = PageWalRecord::start(PageId::new(7), "records.vdat");
        let bytes = record.serialize().unwrap();
        let (decoded, consumed) = PageWalRecord::deserialize(&bytes).unwrap();

        assert_eq!(consumed, bytes.len());
        assert_eq!(decoded, record);
        assert_eq!(decoded.kind(), RecordKind::StartAtomicUpdate);
        assert_eq!(decoded.page_id(), PageId::new(7));
        assert_eq!(decoded.file_name(), "records.vdat");
    }

    #[test]
    fn test_set_page_data_roundtrip() {
        let record = PageWalRecord::set_page_data(
            vec![0xAB; 100],
            4096,
            PageId::new(3),
            "records.vdat",
        );
        let bytes = record.serialize().unwrap();
        let (decoded, consumed) = PageWalRecord::deserialize(&bytes).unwrap();

        assert_eq!(consumed, bytes.len());
        if let PageWalRecord::SetPageData { bytes, offset, .. } = decoded {
            assert_eq!(bytes.as_ref(), &[0xAB; 100][..]);
            assert_eq!(offset, 4096);
        } else {
            panic!("Expected SetPageData record");
        }
    }

    #[test]
    fn test_record_stream() {
        let records = vec![
            PageWalRecord::start(PageId::new(1), "a.vdat"),
            PageWalRecord::set_page_data(vec![1, 2, 3], 64, PageId::new(1), "a.vdat"),
            PageWalRecord::end(PageId::new(1), "a.vdat"),
        ];

        let mut stream = Vec::new();
        for record in &records {
            stream.extend_from_slice(&record.serialize().unwrap());
        }

        let mut decoded = Vec::new();
        let mut rest = &stream[..];
        while !rest.is_empty() {
            let (record, consumed) = PageWalRecord::deserialize(rest).unwrap();
            decoded.push(record);
            rest = &rest[consumed..];
        }
        assert_eq!(decoded, records);
    }

    #[test]
    fn test_corrupted_record_rejected() {
        let record = PageWalRecord::add_new_page(PageId::new(1), "a.vdat");
        let mut bytes = record.serialize().unwrap().to_vec();

        // Flip a body byte; the checksum must catch it.
        let mid = bytes.len() / 2;
        bytes[mid] ^= 0xFF;
        let err = PageWalRecord::deserialize(&bytes).unwrap_err();
        assert!(err.is_corruption());
    }

    #[test]
    fn test_bad_magic_rejected() {
        let record = PageWalRecord::add_new_page(PageId::new(1), "a.vdat");
        let mut bytes = record.serialize().unwrap().to_vec();
        bytes[0] = 0x00;
        assert!(matches!(
            PageWalRecord::deserialize(&bytes),
            Err(WalError::InvalidMagic { .. })
        ));
    }

    #[test]
    fn test_truncated_record_rejected() {
        let record =
            PageWalRecord::set_page_data(vec![9; 32], 128, PageId::new(2), "b.vdat");
        let bytes = record.serialize().unwrap();
        let err = PageWalRecord::deserialize(&bytes[..bytes.len() - 10]).unwrap_err();
        assert!(err.is_corruption());
    }

    #[test]
    fn test_oversized_payload_rejected() {
        let record = PageWalRecord::set_page_data(
            vec![0u8; MAX_WAL_PAYLOAD_SIZE + 1],
            0,
            PageId::new(1),
            "a.vdat",
        );
        assert!(matches!(
            record.serialize(),
            Err(WalError::RecordTooLarge { .. })
        ));
    }
}
