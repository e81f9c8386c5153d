//! BPL container signature and fixed layout constants.

use crate::error::FormatError;

/// The 8-byte BPL magic signature.
pub const BPL_SIGNATURE: [u8; 8] = [0x89, b'B', b'P', b'L', b'\r', b'\n', 0x1A, b'\n'];

/// Container format version written and accepted by this crate.
pub const FORMAT_VERSION: u8 = 1;

/// Header length: signature(8) + version(1) + flags(1) + reserved(6).
pub const HEADER_LEN: usize = 16;

/// Footer length: index offset(8) + index length(8) + CRC-32C(4) + magic(4).
pub const FOOTER_LEN: usize = 24;

/// The 4-byte magic that terminates every container.
pub const FOOTER_MAGIC: [u8; 4] = *b"BPLF";

/// Header flag bit: all multi-byte fields are little-endian.
///
/// Always set by this writer. A clear bit is reserved for a big-endian
/// producer and is rejected on read.
pub const FLAG_LITTLE_ENDIAN: u8 = 0x01;

/// Check that `data` starts with the BPL signature.
///
/// Unlike formats that allow a superblock at power-of-two offsets, a BPL
/// container carries its signature at offset 0 only.
pub fn check_signature(data: &[u8]) -> Result<(), FormatError> {
    if data.len() >= 8 && data[..8] == BPL_SIGNATURE {
        Ok(())
    } else {
        Err(FormatError::SignatureMismatch)
    }
}
