//! Metadata index records for variables and attributes.

#[cfg(not(feature = "std"))]
use alloc::{
    string::{String, ToString},
    vec::Vec,
};

use byteorder::{ByteOrder, LittleEndian};

use crate::dtype::Dtype;
use crate::error::FormatError;
use crate::values::{decode_values, Values};

/// Shape category of a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeId {
    /// Zero-dimensional single element.
    LocalValue,
    /// Array with extent only, no global placement.
    LocalArray,
    /// Array placed in a global index space.
    GlobalArray,
}

impl ShapeId {
    /// Wire code stored in variable records.
    pub fn code(self) -> u8 {
        match self {
            ShapeId::LocalValue => 1,
            ShapeId::LocalArray => 2,
            ShapeId::GlobalArray => 3,
        }
    }

    /// Decode a wire code back to a `ShapeId`. Code 0 is reserved.
    pub fn from_code(code: u8) -> Result<ShapeId, FormatError> {
        Ok(match code {
            1 => ShapeId::LocalValue,
            2 => ShapeId::LocalArray,
            3 => ShapeId::GlobalArray,
            other => return Err(FormatError::UnknownShapeId(other)),
        })
    }
}

const VAR_FLAG_CONSTANT_DIMS: u8 = 0x01;
const VAR_FLAG_SHAPE: u8 = 0x02;
const VAR_FLAG_START: u8 = 0x04;
const VAR_FLAG_COUNT: u8 = 0x08;
const VAR_FLAG_MINMAX: u8 = 0x10;
const VAR_FLAG_RESERVED: u8 = !0x1F;

const ATTR_FLAG_IS_VALUE: u8 = 0x01;
const ATTR_FLAG_RESERVED: u8 = !0x01;

fn ensure_len(data: &[u8], offset: usize, needed: usize) -> Result<(), FormatError> {
    if offset + needed > data.len() {
        Err(FormatError::UnexpectedEof {
            expected: offset + needed,
            available: data.len(),
        })
    } else {
        Ok(())
    }
}

fn parse_name(data: &[u8], pos: usize) -> Result<(String, usize), FormatError> {
    ensure_len(data, pos, 2)?;
    let len = LittleEndian::read_u16(&data[pos..pos + 2]) as usize;
    let pos = pos + 2;
    ensure_len(data, pos, len)?;
    let name = core::str::from_utf8(&data[pos..pos + len])
        .map_err(|_| FormatError::InvalidName)?
        .to_string();
    Ok((name, pos + len))
}

fn serialize_name(name: &str, buf: &mut Vec<u8>) -> Result<(), FormatError> {
    let bytes = name.as_bytes();
    if bytes.len() > u16::MAX as usize {
        return Err(FormatError::NameTooLong(bytes.len()));
    }
    let mut len_bytes = [0u8; 2];
    LittleEndian::write_u16(&mut len_bytes, bytes.len() as u16);
    buf.extend_from_slice(&len_bytes);
    buf.extend_from_slice(bytes);
    Ok(())
}

fn parse_dims(data: &[u8], pos: usize, ndims: usize) -> Result<(Vec<u64>, usize), FormatError> {
    ensure_len(data, pos, ndims * 8)?;
    let mut dims = Vec::with_capacity(ndims);
    for i in 0..ndims {
        dims.push(LittleEndian::read_u64(&data[pos + i * 8..pos + i * 8 + 8]));
    }
    Ok((dims, pos + ndims * 8))
}

fn serialize_dims(dims: &[u64], buf: &mut Vec<u8>) {
    for &d in dims {
        buf.extend_from_slice(&d.to_le_bytes());
    }
}

/// One variable entry in the metadata index.
///
/// The dimension vectors that are present must all share one length, the
/// variable's rank; an absent vector means that facet was never set.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableRecord {
    pub name: String,
    pub dtype: Dtype,
    pub shape_id: ShapeId,
    pub constant_dims: bool,
    pub shape: Option<Vec<u64>>,
    pub start: Option<Vec<u64>>,
    pub count: Option<Vec<u64>>,
    /// Min/max over the payload, widened to `f64`. Absent when statistics
    /// are disabled or the payload is empty.
    pub minmax: Option<(f64, f64)>,
    /// Payload start, as an absolute container offset.
    pub data_offset: u64,
    /// Payload length in bytes.
    pub data_len: u64,
}

impl VariableRecord {
    /// Rank of the variable: the shared length of its dimension vectors.
    pub fn ndims(&self) -> usize {
        let s = self.shape.as_ref().map_or(0, Vec::len);
        let t = self.start.as_ref().map_or(0, Vec::len);
        let c = self.count.as_ref().map_or(0, Vec::len);
        s.max(t).max(c)
    }

    /// Number of elements selected by `count`. A scalar counts as 1.
    pub fn num_elements(&self) -> u64 {
        match &self.count {
            Some(c) if !c.is_empty() => c.iter().product(),
            _ => 1,
        }
    }

    /// Parse one record starting at `pos`. Returns the record and the
    /// offset just past it.
    pub fn parse(data: &[u8], pos: usize) -> Result<(VariableRecord, usize), FormatError> {
        let (name, pos) = parse_name(data, pos)?;

        ensure_len(data, pos, 4)?;
        let dtype = Dtype::from_code(data[pos])?;
        let shape_id = ShapeId::from_code(data[pos + 1])?;
        let flags = data[pos + 2];
        if flags & VAR_FLAG_RESERVED != 0 {
            return Err(FormatError::InvalidRecordFlags(flags));
        }
        let ndims = data[pos + 3] as usize;
        let mut pos = pos + 4;

        let mut shape = None;
        if flags & VAR_FLAG_SHAPE != 0 {
            let (dims, next) = parse_dims(data, pos, ndims)?;
            shape = Some(dims);
            pos = next;
        }
        let mut start = None;
        if flags & VAR_FLAG_START != 0 {
            let (dims, next) = parse_dims(data, pos, ndims)?;
            start = Some(dims);
            pos = next;
        }
        let mut count = None;
        if flags & VAR_FLAG_COUNT != 0 {
            let (dims, next) = parse_dims(data, pos, ndims)?;
            count = Some(dims);
            pos = next;
        }

        let mut minmax = None;
        if flags & VAR_FLAG_MINMAX != 0 {
            ensure_len(data, pos, 16)?;
            let min = LittleEndian::read_f64(&data[pos..pos + 8]);
            let max = LittleEndian::read_f64(&data[pos + 8..pos + 16]);
            minmax = Some((min, max));
            pos += 16;
        }

        ensure_len(data, pos, 16)?;
        let data_offset = LittleEndian::read_u64(&data[pos..pos + 8]);
        let data_len = LittleEndian::read_u64(&data[pos + 8..pos + 16]);
        pos += 16;

        Ok((
            VariableRecord {
                name,
                dtype,
                shape_id,
                constant_dims: flags & VAR_FLAG_CONSTANT_DIMS != 0,
                shape,
                start,
                count,
                minmax,
                data_offset,
                data_len,
            },
            pos,
        ))
    }

    /// Append the wire form of this record to `buf`.
    pub fn serialize(&self, buf: &mut Vec<u8>) -> Result<(), FormatError> {
        let ndims = self.ndims();
        if ndims > u8::MAX as usize {
            return Err(FormatError::TooManyDimensions(ndims));
        }
        debug_assert!(self.shape.as_ref().map_or(true, |v| v.len() == ndims));
        debug_assert!(self.start.as_ref().map_or(true, |v| v.len() == ndims));
        debug_assert!(self.count.as_ref().map_or(true, |v| v.len() == ndims));

        serialize_name(&self.name, buf)?;

        let mut flags = 0u8;
        if self.constant_dims {
            flags |= VAR_FLAG_CONSTANT_DIMS;
        }
        if self.shape.is_some() {
            flags |= VAR_FLAG_SHAPE;
        }
        if self.start.is_some() {
            flags |= VAR_FLAG_START;
        }
        if self.count.is_some() {
            flags |= VAR_FLAG_COUNT;
        }
        if self.minmax.is_some() {
            flags |= VAR_FLAG_MINMAX;
        }
        buf.push(self.dtype.code());
        buf.push(self.shape_id.code());
        buf.push(flags);
        buf.push(ndims as u8);

        if let Some(ref dims) = self.shape {
            serialize_dims(dims, buf);
        }
        if let Some(ref dims) = self.start {
            serialize_dims(dims, buf);
        }
        if let Some(ref dims) = self.count {
            serialize_dims(dims, buf);
        }
        if let Some((min, max)) = self.minmax {
            buf.extend_from_slice(&min.to_le_bytes());
            buf.extend_from_slice(&max.to_le_bytes());
        }
        buf.extend_from_slice(&self.data_offset.to_le_bytes());
        buf.extend_from_slice(&self.data_len.to_le_bytes());
        Ok(())
    }
}

/// One attribute entry in the metadata index.
///
/// The element payload is stored inline; attributes are small by
/// construction.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeRecord {
    pub name: String,
    /// Defined from a single scalar rather than an array.
    pub is_value: bool,
    pub data: Values,
}

impl AttributeRecord {
    /// The element type of the payload.
    pub fn dtype(&self) -> Dtype {
        self.data.dtype()
    }

    /// Parse one record starting at `pos`. Returns the record and the
    /// offset just past it.
    pub fn parse(data: &[u8], pos: usize) -> Result<(AttributeRecord, usize), FormatError> {
        let (name, pos) = parse_name(data, pos)?;

        ensure_len(data, pos, 6)?;
        let dtype = Dtype::from_code(data[pos])?;
        let flags = data[pos + 1];
        if flags & ATTR_FLAG_RESERVED != 0 {
            return Err(FormatError::InvalidRecordFlags(flags));
        }
        let payload_len = LittleEndian::read_u32(&data[pos + 2..pos + 6]) as usize;
        let pos = pos + 6;

        ensure_len(data, pos, payload_len)?;
        let values = decode_values(dtype, &data[pos..pos + payload_len])?;

        Ok((
            AttributeRecord {
                name,
                is_value: flags & ATTR_FLAG_IS_VALUE != 0,
                data: values,
            },
            pos + payload_len,
        ))
    }

    /// Append the wire form of this record to `buf`.
    pub fn serialize(&self, buf: &mut Vec<u8>) -> Result<(), FormatError> {
        serialize_name(&self.name, buf)?;

        let payload = self.data.encode();
        if payload.len() > u32::MAX as usize {
            return Err(FormatError::PayloadTooLong(payload.len()));
        }
        buf.push(self.dtype().code());
        buf.push(if self.is_value { ATTR_FLAG_IS_VALUE } else { 0 });
        let mut len_bytes = [0u8; 4];
        LittleEndian::write_u32(&mut len_bytes, payload.len() as u32);
        buf.extend_from_slice(&len_bytes);
        buf.extend_from_slice(&payload);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_array_record() -> VariableRecord {
        VariableRecord {
            name: "temperature".to_string(),
            dtype: Dtype::F64,
            shape_id: ShapeId::GlobalArray,
            constant_dims: true,
            shape: Some(vec![4, 6]),
            start: Some(vec![0, 0]),
            count: Some(vec![4, 6]),
            minmax: Some((-1.5, 88.25)),
            data_offset: 16,
            data_len: 192,
        }
    }

    fn sample_scalar_record() -> VariableRecord {
        VariableRecord {
            name: "step".to_string(),
            dtype: Dtype::I64,
            shape_id: ShapeId::LocalValue,
            constant_dims: false,
            shape: None,
            start: None,
            count: None,
            minmax: None,
            data_offset: 16,
            data_len: 8,
        }
    }

    #[test]
    fn shape_id_codes_round_trip() {
        for id in [ShapeId::LocalValue, ShapeId::LocalArray, ShapeId::GlobalArray] {
            assert_eq!(ShapeId::from_code(id.code()), Ok(id));
        }
        assert_eq!(ShapeId::from_code(0), Err(FormatError::UnknownShapeId(0)));
        assert_eq!(ShapeId::from_code(9), Err(FormatError::UnknownShapeId(9)));
    }

    #[test]
    fn variable_record_round_trip() {
        let rec = sample_array_record();
        let mut buf = Vec::new();
        rec.serialize(&mut buf).unwrap();
        let (parsed, consumed) = VariableRecord::parse(&buf, 0).unwrap();
        assert_eq!(parsed, rec);
        assert_eq!(consumed, buf.len());
    }

    #[test]
    fn scalar_record_round_trip() {
        let rec = sample_scalar_record();
        let mut buf = Vec::new();
        rec.serialize(&mut buf).unwrap();
        let (parsed, consumed) = VariableRecord::parse(&buf, 0).unwrap();
        assert_eq!(parsed, rec);
        assert_eq!(consumed, buf.len());
        assert_eq!(parsed.ndims(), 0);
        assert_eq!(parsed.num_elements(), 1);
    }

    #[test]
    fn record_at_nonzero_offset() {
        let rec = sample_scalar_record();
        let mut buf = vec![0xAA; 7];
        rec.serialize(&mut buf).unwrap();
        let (parsed, consumed) = VariableRecord::parse(&buf, 7).unwrap();
        assert_eq!(parsed, rec);
        assert_eq!(consumed, buf.len());
    }

    #[test]
    fn ndims_from_longest_vector() {
        let mut rec = sample_array_record();
        rec.start = None;
        rec.count = None;
        assert_eq!(rec.ndims(), 2);
    }

    #[test]
    fn num_elements_products_count() {
        assert_eq!(sample_array_record().num_elements(), 24);
    }

    #[test]
    fn reserved_variable_flags_rejected() {
        let rec = sample_scalar_record();
        let mut buf = Vec::new();
        rec.serialize(&mut buf).unwrap();
        // name_len(2) + "step"(4) + dtype(1) + shape_id(1) = offset 8 for flags
        buf[8] |= 0x40;
        let err = VariableRecord::parse(&buf, 0).unwrap_err();
        assert_eq!(err, FormatError::InvalidRecordFlags(0x40));
    }

    #[test]
    fn unknown_dtype_in_record() {
        let rec = sample_scalar_record();
        let mut buf = Vec::new();
        rec.serialize(&mut buf).unwrap();
        buf[6] = 0xEE;
        let err = VariableRecord::parse(&buf, 0).unwrap_err();
        assert_eq!(err, FormatError::UnknownDtype(0xEE));
    }

    #[test]
    fn truncated_record() {
        let rec = sample_array_record();
        let mut buf = Vec::new();
        rec.serialize(&mut buf).unwrap();
        buf.truncate(buf.len() - 5);
        let err = VariableRecord::parse(&buf, 0).unwrap_err();
        assert!(matches!(err, FormatError::UnexpectedEof { .. }));
    }

    #[test]
    fn non_utf8_name_rejected() {
        let mut buf = vec![2, 0, 0xFF, 0xFE];
        buf.extend_from_slice(&[0u8; 24]);
        let err = VariableRecord::parse(&buf, 0).unwrap_err();
        assert_eq!(err, FormatError::InvalidName);
    }

    #[test]
    fn oversized_name_rejected() {
        let mut rec = sample_scalar_record();
        rec.name = "x".repeat(u16::MAX as usize + 1);
        let mut buf = Vec::new();
        let err = rec.serialize(&mut buf).unwrap_err();
        assert_eq!(err, FormatError::NameTooLong(u16::MAX as usize + 1));
    }

    #[test]
    fn attribute_record_round_trip() {
        let rec = AttributeRecord {
            name: "units".to_string(),
            is_value: true,
            data: Values::String(vec!["kelvin".to_string()]),
        };
        let mut buf = Vec::new();
        rec.serialize(&mut buf).unwrap();
        let (parsed, consumed) = AttributeRecord::parse(&buf, 0).unwrap();
        assert_eq!(parsed, rec);
        assert_eq!(consumed, buf.len());
        assert_eq!(parsed.dtype(), Dtype::String);
    }

    #[test]
    fn attribute_array_round_trip() {
        let rec = AttributeRecord {
            name: "origin".to_string(),
            is_value: false,
            data: Values::F64(vec![0.0, -2.5, 10.0]),
        };
        let mut buf = Vec::new();
        rec.serialize(&mut buf).unwrap();
        let (parsed, _) = AttributeRecord::parse(&buf, 0).unwrap();
        assert_eq!(parsed, rec);
        assert!(!parsed.is_value);
    }

    #[test]
    fn reserved_attribute_flags_rejected() {
        let rec = AttributeRecord {
            name: "a".to_string(),
            is_value: false,
            data: Values::U8(vec![1]),
        };
        let mut buf = Vec::new();
        rec.serialize(&mut buf).unwrap();
        // name_len(2) + "a"(1) + dtype(1) = offset 4 for flags
        buf[4] = 0x82;
        let err = AttributeRecord::parse(&buf, 0).unwrap_err();
        assert_eq!(err, FormatError::InvalidRecordFlags(0x82));
    }

    #[test]
    fn attribute_payload_truncated() {
        let rec = AttributeRecord {
            name: "a".to_string(),
            is_value: false,
            data: Values::I32(vec![1, 2, 3]),
        };
        let mut buf = Vec::new();
        rec.serialize(&mut buf).unwrap();
        buf.truncate(buf.len() - 2);
        let err = AttributeRecord::parse(&buf, 0).unwrap_err();
        assert!(matches!(err, FormatError::UnexpectedEof { .. }));
    }
}
