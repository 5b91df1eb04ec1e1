//! Page-image checksums.
//!
//! The page itself never touches its crc32 field; the layer that flushes
//! pages to disk computes the checksum last and verifies it after reading
//! the image back.

use super::header::CRC_OFFSET;

/// Computes the CRC32 of a page image, excluding the crc32 field itself.
pub fn compute_page_checksum(page: &[u8]) -> u32 {
    debug_assert!(page.len() >= CRC_OFFSET + 4);

    let mut hasher = crc32fast::Hasher::new();
    hasher.update(&page[..CRC_OFFSET]);
    hasher.update(&page[CRC_OFFSET + 4..]);
    hasher.finalize()
}

/// Computes and stores the checksum into the page's crc32 field.
///
/// Call this after all other modifications, immediately before flushing.
pub fn update_page_checksum(page: &mut [u8]) {
    let checksum = compute_page_checksum(page);
    page[CRC_OFFSET..CRC_OFFSET + 4].copy_from_slice(&checksum.to_le_bytes());
}

/// Verifies a page image against its stored checksum.
pub fn verify_page_checksum(page: &[u8]) -> bool {
    let stored = u32::from_le_bytes(page[CRC_OFFSET..CRC_OFFSET + 4].try_into().unwrap());
    stored == compute_page_checksum(page)
}
