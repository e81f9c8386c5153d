//! Typed value payloads for attributes and decoded variable data.

#[cfg(not(feature = "std"))]
use alloc::{
    string::{String, ToString},
    vec::Vec,
};

use byteorder::{ByteOrder, LittleEndian};

use crate::dtype::{Dtype, Primitive};
use crate::error::FormatError;

/// A homogeneous run of decoded elements, one variant per [`Dtype`].
///
/// Numeric payloads are packed little-endian. String payloads are a
/// sequence of `u32` length prefixes followed by UTF-8 bytes.
#[derive(Debug, Clone, PartialEq)]
pub enum Values {
    I8(Vec<i8>),
    I16(Vec<i16>),
    I32(Vec<i32>),
    I64(Vec<i64>),
    U8(Vec<u8>),
    U16(Vec<u16>),
    U32(Vec<u32>),
    U64(Vec<u64>),
    F32(Vec<f32>),
    F64(Vec<f64>),
    String(Vec<String>),
}

macro_rules! values_accessor {
    ($($fn_name:ident, $variant:ident, $ty:ty);+ $(;)?) => {$(
        /// Borrow the elements if this is the matching variant.
        pub fn $fn_name(&self) -> Option<&[$ty]> {
            match self {
                Values::$variant(v) => Some(v),
                _ => None,
            }
        }
    )+};
}

impl Values {
    /// The element type of this payload.
    pub fn dtype(&self) -> Dtype {
        match self {
            Values::I8(_) => Dtype::I8,
            Values::I16(_) => Dtype::I16,
            Values::I32(_) => Dtype::I32,
            Values::I64(_) => Dtype::I64,
            Values::U8(_) => Dtype::U8,
            Values::U16(_) => Dtype::U16,
            Values::U32(_) => Dtype::U32,
            Values::U64(_) => Dtype::U64,
            Values::F32(_) => Dtype::F32,
            Values::F64(_) => Dtype::F64,
            Values::String(_) => Dtype::String,
        }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        match self {
            Values::I8(v) => v.len(),
            Values::I16(v) => v.len(),
            Values::I32(v) => v.len(),
            Values::I64(v) => v.len(),
            Values::U8(v) => v.len(),
            Values::U16(v) => v.len(),
            Values::U32(v) => v.len(),
            Values::U64(v) => v.len(),
            Values::F32(v) => v.len(),
            Values::F64(v) => v.len(),
            Values::String(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Serialize all elements to their wire form.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        match self {
            Values::I8(v) => encode_prim(v, &mut buf),
            Values::I16(v) => encode_prim(v, &mut buf),
            Values::I32(v) => encode_prim(v, &mut buf),
            Values::I64(v) => encode_prim(v, &mut buf),
            Values::U8(v) => encode_prim(v, &mut buf),
            Values::U16(v) => encode_prim(v, &mut buf),
            Values::U32(v) => encode_prim(v, &mut buf),
            Values::U64(v) => encode_prim(v, &mut buf),
            Values::F32(v) => encode_prim(v, &mut buf),
            Values::F64(v) => encode_prim(v, &mut buf),
            Values::String(v) => {
                for s in v {
                    let mut len_bytes = [0u8; 4];
                    LittleEndian::write_u32(&mut len_bytes, s.len() as u32);
                    buf.extend_from_slice(&len_bytes);
                    buf.extend_from_slice(s.as_bytes());
                }
            }
        }
        buf
    }

    values_accessor! {
        as_i8, I8, i8;
        as_i16, I16, i16;
        as_i32, I32, i32;
        as_i64, I64, i64;
        as_u8, U8, u8;
        as_u16, U16, u16;
        as_u32, U32, u32;
        as_u64, U64, u64;
        as_f32, F32, f32;
        as_f64, F64, f64;
    }

    /// Borrow the elements if this is the string variant.
    pub fn as_strings(&self) -> Option<&[String]> {
        match self {
            Values::String(v) => Some(v),
            _ => None,
        }
    }
}

fn encode_prim<T: Primitive>(vals: &[T], buf: &mut Vec<u8>) {
    buf.reserve(vals.len() * T::DTYPE.size());
    for &v in vals {
        v.write_le(buf);
    }
}

fn decode_prim<T: Primitive>(data: &[u8]) -> Result<Vec<T>, FormatError> {
    let size = T::DTYPE.size();
    if data.len() % size != 0 {
        return Err(FormatError::TruncatedValues {
            dtype: T::DTYPE,
            len: data.len(),
        });
    }
    Ok(data.chunks_exact(size).map(T::read_le).collect())
}

fn decode_strings(data: &[u8]) -> Result<Vec<String>, FormatError> {
    let mut out = Vec::new();
    let mut pos = 0usize;
    while pos < data.len() {
        if pos + 4 > data.len() {
            return Err(FormatError::UnexpectedEof {
                expected: pos + 4,
                available: data.len(),
            });
        }
        let len = LittleEndian::read_u32(&data[pos..pos + 4]) as usize;
        pos += 4;
        if pos + len > data.len() {
            return Err(FormatError::UnexpectedEof {
                expected: pos + len,
                available: data.len(),
            });
        }
        let s = core::str::from_utf8(&data[pos..pos + len])
            .map_err(|_| FormatError::InvalidString)?;
        out.push(s.to_string());
        pos += len;
    }
    Ok(out)
}

/// Decode a wire payload into typed elements.
pub fn decode_values(dtype: Dtype, data: &[u8]) -> Result<Values, FormatError> {
    Ok(match dtype {
        Dtype::I8 => Values::I8(decode_prim(data)?),
        Dtype::I16 => Values::I16(decode_prim(data)?),
        Dtype::I32 => Values::I32(decode_prim(data)?),
        Dtype::I64 => Values::I64(decode_prim(data)?),
        Dtype::U8 => Values::U8(decode_prim(data)?),
        Dtype::U16 => Values::U16(decode_prim(data)?),
        Dtype::U32 => Values::U32(decode_prim(data)?),
        Dtype::U64 => Values::U64(decode_prim(data)?),
        Dtype::F32 => Values::F32(decode_prim(data)?),
        Dtype::F64 => Values::F64(decode_prim(data)?),
        Dtype::String => Values::String(decode_strings(data)?),
    })
}

fn minmax_prim<T: Primitive>(data: &[u8]) -> Option<(f64, f64)> {
    let size = T::DTYPE.size();
    if data.is_empty() || data.len() % size != 0 {
        return None;
    }
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for chunk in data.chunks_exact(size) {
        let v = T::read_le(chunk).as_f64();
        if v < min {
            min = v;
        }
        if v > max {
            max = v;
        }
    }
    Some((min, max))
}

/// Min/max over a packed numeric payload, widened to `f64`.
///
/// Returns `None` for strings, empty payloads, and payloads that are not
/// a whole number of elements.
pub fn minmax(dtype: Dtype, data: &[u8]) -> Option<(f64, f64)> {
    match dtype {
        Dtype::I8 => minmax_prim::<i8>(data),
        Dtype::I16 => minmax_prim::<i16>(data),
        Dtype::I32 => minmax_prim::<i32>(data),
        Dtype::I64 => minmax_prim::<i64>(data),
        Dtype::U8 => minmax_prim::<u8>(data),
        Dtype::U16 => minmax_prim::<u16>(data),
        Dtype::U32 => minmax_prim::<u32>(data),
        Dtype::U64 => minmax_prim::<u64>(data),
        Dtype::F32 => minmax_prim::<f32>(data),
        Dtype::F64 => minmax_prim::<f64>(data),
        Dtype::String => None,
    }
}

mod sealed {
    pub trait Sealed {}
}

/// Element types accepted when defining an attribute.
///
/// Covers every numeric [`Primitive`] plus `&str`; implementations gather
/// a slice of elements into an owned [`Values`] payload.
pub trait AttrElement: sealed::Sealed + Copy {
    /// The wire type these elements map to.
    const DTYPE: Dtype;

    /// Collect borrowed elements into an owned payload.
    fn gather(items: &[Self]) -> Values;
}

macro_rules! impl_attr_element {
    ($($ty:ty => $variant:ident),+ $(,)?) => {$(
        impl sealed::Sealed for $ty {}

        impl AttrElement for $ty {
            const DTYPE: Dtype = Dtype::$variant;

            fn gather(items: &[Self]) -> Values {
                Values::$variant(items.to_vec())
            }
        }
    )+};
}

impl_attr_element! {
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

impl sealed::Sealed for &str {}

impl AttrElement for &str {
    const DTYPE: Dtype = Dtype::String;

    fn gather(items: &[Self]) -> Values {
        Values::String(items.iter().map(|s| (*s).to_string()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_encode_layout() {
        let vals = Values::U16(vec![0x0102, 0x0304]);
        assert_eq!(vals.encode(), [0x02, 0x01, 0x04, 0x03]);
    }

    #[test]
    fn numeric_decode() {
        let data = [0x02, 0x01, 0x04, 0x03];
        let vals = decode_values(Dtype::U16, &data).unwrap();
        assert_eq!(vals, Values::U16(vec![0x0102, 0x0304]));
    }

    #[test]
    fn f64_round_trip_exact_bits() {
        let vals = Values::F64(vec![core::f64::consts::PI, -0.0, f64::MAX]);
        let decoded = decode_values(Dtype::F64, &vals.encode()).unwrap();
        let out = decoded.as_f64().unwrap();
        assert_eq!(out[0].to_bits(), core::f64::consts::PI.to_bits());
        assert_eq!(out[1].to_bits(), (-0.0f64).to_bits());
        assert_eq!(out[2], f64::MAX);
    }

    #[test]
    fn empty_payload_decodes_empty() {
        let vals = decode_values(Dtype::I32, &[]).unwrap();
        assert_eq!(vals, Values::I32(vec![]));
        assert!(vals.is_empty());
    }

    #[test]
    fn truncated_numeric_rejected() {
        let err = decode_values(Dtype::U32, &[1, 2, 3]).unwrap_err();
        assert_eq!(
            err,
            FormatError::TruncatedValues {
                dtype: Dtype::U32,
                len: 3
            }
        );
    }

    #[test]
    fn string_encode_layout() {
        let vals = Values::String(vec!["ab".to_string(), "".to_string()]);
        assert_eq!(
            vals.encode(),
            [2, 0, 0, 0, b'a', b'b', 0, 0, 0, 0]
        );
    }

    #[test]
    fn string_round_trip_multibyte() {
        let vals = Values::String(vec!["héllo".to_string(), "π".to_string()]);
        let decoded = decode_values(Dtype::String, &vals.encode()).unwrap();
        assert_eq!(decoded, vals);
    }

    #[test]
    fn string_truncated_length_prefix() {
        let err = decode_values(Dtype::String, &[5, 0]).unwrap_err();
        assert!(matches!(err, FormatError::UnexpectedEof { .. }));
    }

    #[test]
    fn string_length_past_end() {
        let err = decode_values(Dtype::String, &[9, 0, 0, 0, b'x']).unwrap_err();
        assert!(matches!(err, FormatError::UnexpectedEof { .. }));
    }

    #[test]
    fn string_invalid_utf8() {
        let err = decode_values(Dtype::String, &[2, 0, 0, 0, 0xFF, 0xFE]).unwrap_err();
        assert_eq!(err, FormatError::InvalidString);
    }

    #[test]
    fn accessor_matches_variant_only() {
        let vals = Values::I64(vec![7]);
        assert_eq!(vals.as_i64(), Some(&[7i64][..]));
        assert_eq!(vals.as_u64(), None);
        assert_eq!(vals.as_strings(), None);
    }

    #[test]
    fn gather_numeric() {
        let vals = <f32 as AttrElement>::gather(&[1.0, 2.0]);
        assert_eq!(vals, Values::F32(vec![1.0, 2.0]));
        assert_eq!(<f32 as AttrElement>::DTYPE, Dtype::F32);
    }

    #[test]
    fn gather_strs() {
        let vals = <&str as AttrElement>::gather(&["a", "bc"]);
        assert_eq!(
            vals,
            Values::String(vec!["a".to_string(), "bc".to_string()])
        );
    }

    #[test]
    fn minmax_ints() {
        let payload = Values::I32(vec![4, -9, 12, 0]).encode();
        assert_eq!(minmax(Dtype::I32, &payload), Some((-9.0, 12.0)));
    }

    #[test]
    fn minmax_single_element() {
        let payload = Values::F64(vec![2.5]).encode();
        assert_eq!(minmax(Dtype::F64, &payload), Some((2.5, 2.5)));
    }

    #[test]
    fn minmax_empty_and_string() {
        assert_eq!(minmax(Dtype::F64, &[]), None);
        assert_eq!(minmax(Dtype::String, &[1, 0, 0, 0, b'x']), None);
    }

    #[test]
    fn minmax_ragged_payload() {
        assert_eq!(minmax(Dtype::U16, &[1, 2, 3]), None);
    }
}
