//! Metadata index checksum: CRC-32C (Castagnoli).
//!
//! The footer stores a CRC-32C over the serialized metadata index so a
//! truncated or corrupted container is rejected before any record is
//! trusted. Payload regions are not covered; only the index is.

/// Compute the CRC-32C of a byte slice.
///
/// Reflected polynomial `0x82F63B78`, initial value `0xFFFFFFFF`, final
/// XOR `0xFFFFFFFF`, processed bitwise.
pub fn crc32c(data: &[u8]) -> u32 {
    let mut crc: u32 = 0xFFFF_FFFF;
    for &byte in data {
        crc ^= byte as u32;
        for _ in 0..8 {
            let mask = (crc & 1).wrapping_neg();
            crc = (crc >> 1) ^ (0x82F6_3B78 & mask);
        }
    }
    !crc
}
