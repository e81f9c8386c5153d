//! Error types for BPL container parsing.

use core::fmt;

use crate::dtype::Dtype;

/// Errors that can occur when parsing or building BPL container structures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// The BPL magic signature was not found at the start of the container.
    SignatureMismatch,
    /// The container format version is not supported.
    UnsupportedVersion(u8),
    /// The header carries flag bits this reader does not support.
    UnsupportedFlags(u8),
    /// Unexpected end of data.
    UnexpectedEof {
        /// Number of bytes expected.
        expected: usize,
        /// Number of bytes actually available.
        available: usize,
    },
    /// The footer does not end with the `BPLF` magic.
    BadFooterMagic,
    /// CRC-32C checksum mismatch over the metadata index.
    ChecksumMismatch {
        /// The checksum stored in the footer.
        stored: u32,
        /// The checksum we computed.
        computed: u32,
    },
    /// Unknown data type code in a metadata record.
    UnknownDtype(u8),
    /// Unknown shape category code in a metadata record.
    UnknownShapeId(u8),
    /// A metadata record carries flag bits this version does not define.
    InvalidRecordFlags(u8),
    /// A record name is not valid UTF-8.
    InvalidName,
    /// A string element in a value payload is not valid UTF-8.
    InvalidString,
    /// A record name is too long to serialize.
    NameTooLong(usize),
    /// An attribute payload is too long to serialize.
    PayloadTooLong(usize),
    /// A variable has more dimensions than the record format can carry.
    TooManyDimensions(usize),
    /// A value payload length is not a whole number of elements.
    TruncatedValues {
        /// Element type being decoded.
        dtype: Dtype,
        /// Payload length in bytes.
        len: usize,
    },
    /// The metadata index contains bytes past the last record.
    TrailingIndexBytes(usize),
    /// A payload extent points outside the container.
    PayloadOutOfBounds {
        /// Payload start offset.
        offset: u64,
        /// Payload length in bytes.
        len: u64,
        /// Container size in bytes.
        available: usize,
    },
}

impl fmt::Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatError::SignatureMismatch => {
                write!(f, "BPL signature not found at offset 0")
            }
            FormatError::UnsupportedVersion(v) => {
                write!(f, "unsupported container version: {v}")
            }
            FormatError::UnsupportedFlags(bits) => {
                write!(f, "unsupported header flags: {bits:#010b}")
            }
            FormatError::UnexpectedEof {
                expected,
                available,
            } => {
                write!(f, "unexpected EOF: need {expected} bytes, have {available}")
            }
            FormatError::BadFooterMagic => {
                write!(f, "footer magic mismatch")
            }
            FormatError::ChecksumMismatch { stored, computed } => {
                write!(
                    f,
                    "index checksum mismatch: stored {stored:#010x}, computed {computed:#010x}"
                )
            }
            FormatError::UnknownDtype(code) => {
                write!(f, "unknown dtype code: {code:#04x}")
            }
            FormatError::UnknownShapeId(code) => {
                write!(f, "unknown shape id code: {code:#04x}")
            }
            FormatError::InvalidRecordFlags(bits) => {
                write!(f, "undefined record flag bits: {bits:#010b}")
            }
            FormatError::InvalidName => {
                write!(f, "record name is not valid UTF-8")
            }
            FormatError::InvalidString => {
                write!(f, "string element is not valid UTF-8")
            }
            FormatError::NameTooLong(len) => {
                write!(f, "record name of {len} bytes exceeds the u16 length field")
            }
            FormatError::PayloadTooLong(len) => {
                write!(f, "attribute payload of {len} bytes exceeds the u32 length field")
            }
            FormatError::TooManyDimensions(n) => {
                write!(f, "{n} dimensions exceed the u8 rank field")
            }
            FormatError::TruncatedValues { dtype, len } => {
                write!(
                    f,
                    "payload of {len} bytes is not a whole number of {dtype} elements"
                )
            }
            FormatError::TrailingIndexBytes(n) => {
                write!(f, "metadata index has {n} trailing bytes past the last record")
            }
            FormatError::PayloadOutOfBounds {
                offset,
                len,
                available,
            } => {
                write!(
                    f,
                    "payload extent {offset}+{len} exceeds container size {available}"
                )
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for FormatError {}
