//! Element data types and their wire encoding.

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use core::fmt;

use crate::error::FormatError;

/// Element type of a variable or attribute.
///
/// `String` is valid for attributes only; variables carry numeric data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dtype {
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    String,
}

impl Dtype {
    /// Wire code stored in metadata records.
    pub fn code(self) -> u8 {
        match self {
            Dtype::I8 => 0,
            Dtype::I16 => 1,
            Dtype::I32 => 2,
            Dtype::I64 => 3,
            Dtype::U8 => 4,
            Dtype::U16 => 5,
            Dtype::U32 => 6,
            Dtype::U64 => 7,
            Dtype::F32 => 8,
            Dtype::F64 => 9,
            Dtype::String => 10,
        }
    }

    /// Decode a wire code back to a `Dtype`.
    pub fn from_code(code: u8) -> Result<Dtype, FormatError> {
        Ok(match code {
            0 => Dtype::I8,
            1 => Dtype::I16,
            2 => Dtype::I32,
            3 => Dtype::I64,
            4 => Dtype::U8,
            5 => Dtype::U16,
            6 => Dtype::U32,
            7 => Dtype::U64,
            8 => Dtype::F32,
            9 => Dtype::F64,
            10 => Dtype::String,
            other => return Err(FormatError::UnknownDtype(other)),
        })
    }

    /// Fixed element size in bytes. Strings are length-prefixed, not fixed.
    pub fn size(self) -> usize {
        match self {
            Dtype::I8 | Dtype::U8 => 1,
            Dtype::I16 | Dtype::U16 => 2,
            Dtype::I32 | Dtype::U32 | Dtype::F32 => 4,
            Dtype::I64 | Dtype::U64 | Dtype::F64 => 8,
            Dtype::String => 0,
        }
    }

    /// Whether min/max statistics are meaningful for this type.
    pub fn is_numeric(self) -> bool {
        !matches!(self, Dtype::String)
    }
}

impl fmt::Display for Dtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Dtype::I8 => "i8",
            Dtype::I16 => "i16",
            Dtype::I32 => "i32",
            Dtype::I64 => "i64",
            Dtype::U8 => "u8",
            Dtype::U16 => "u16",
            Dtype::U32 => "u32",
            Dtype::U64 => "u64",
            Dtype::F32 => "f32",
            Dtype::F64 => "f64",
            Dtype::String => "string",
        };
        f.write_str(name)
    }
}

mod sealed {
    pub trait Sealed {}
}

/// Numeric element types that can back a variable.
///
/// The trait is sealed: the set of supported primitives is fixed by the
/// container format and maps one-to-one onto the numeric [`Dtype`] variants.
pub trait Primitive: sealed::Sealed + Copy + PartialOrd + 'static {
    /// The wire type this primitive maps to.
    const DTYPE: Dtype;

    /// Append the little-endian encoding of `self` to `buf`.
    fn write_le(self, buf: &mut Vec<u8>);

    /// Decode one element from the front of `bytes`.
    ///
    /// `bytes` must hold at least `Self::DTYPE.size()` bytes.
    fn read_le(bytes: &[u8]) -> Self;

    /// Widen to `f64` for min/max statistics.
    fn as_f64(self) -> f64;
}

macro_rules! impl_primitive {
    ($($ty:ty => $dtype:ident),+ $(,)?) => {$(
        impl sealed::Sealed for $ty {}

        impl Primitive for $ty {
            const DTYPE: Dtype = Dtype::$dtype;

            fn write_le(self, buf: &mut Vec<u8>) {
                buf.extend_from_slice(&self.to_le_bytes());
            }

            fn read_le(bytes: &[u8]) -> Self {
                let mut raw = [0u8; core::mem::size_of::<$ty>()];
                raw.copy_from_slice(&bytes[..core::mem::size_of::<$ty>()]);
                <$ty>::from_le_bytes(raw)
            }

            fn as_f64(self) -> f64 {
                self as f64
            }
        }
    )+};
}

impl_primitive! {
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
}
