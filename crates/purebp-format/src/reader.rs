//! BPL container parsing (read pipeline).
//!
//! Validates the fixed header and footer, checksums the metadata index,
//! and decodes every record before any payload is touched. Payload bytes
//! stay in the caller's buffer; [`Container::payload`] hands out
//! bounds-checked slices.

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use byteorder::{ByteOrder, LittleEndian};

use crate::checksum::crc32c;
use crate::error::FormatError;
use crate::record::{AttributeRecord, VariableRecord};
use crate::signature::{
    check_signature, FLAG_LITTLE_ENDIAN, FOOTER_LEN, FOOTER_MAGIC, FORMAT_VERSION, HEADER_LEN,
};

/// Decoded metadata of one container, in index order.
#[derive(Debug, Clone, PartialEq)]
pub struct Container {
    pub variables: Vec<VariableRecord>,
    pub attributes: Vec<AttributeRecord>,
}

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

impl Container {
    /// Parse a full container image.
    pub fn parse(data: &[u8]) -> Result<Container, FormatError> {
        check_signature(data)?;
        if data.len() < HEADER_LEN + FOOTER_LEN {
            return Err(FormatError::UnexpectedEof {
                expected: HEADER_LEN + FOOTER_LEN,
                available: data.len(),
            });
        }

        let version = data[8];
        if version != FORMAT_VERSION {
            return Err(FormatError::UnsupportedVersion(version));
        }
        let flags = data[9];
        if flags & FLAG_LITTLE_ENDIAN == 0 {
            return Err(FormatError::UnsupportedFlags(flags));
        }

        let footer_start = data.len() - FOOTER_LEN;
        let footer = &data[footer_start..];
        if footer[20..24] != FOOTER_MAGIC {
            return Err(FormatError::BadFooterMagic);
        }
        let index_offset = LittleEndian::read_u64(&footer[0..8]);
        let index_len = LittleEndian::read_u64(&footer[8..16]);
        let stored = LittleEndian::read_u32(&footer[16..20]);

        let index_end = index_offset.checked_add(index_len);
        let in_bounds = index_offset >= HEADER_LEN as u64
            && matches!(index_end, Some(end) if end <= footer_start as u64);
        if !in_bounds {
            return Err(FormatError::UnexpectedEof {
                expected: index_end.map_or(usize::MAX, |e| e as usize),
                available: footer_start,
            });
        }
        let index = &data[index_offset as usize..(index_offset + index_len) as usize];

        let computed = crc32c(index);
        if computed != stored {
            return Err(FormatError::ChecksumMismatch { stored, computed });
        }

        let mut pos = 0usize;
        ensure_len(index, pos, 4)?;
        let var_count = LittleEndian::read_u32(&index[pos..pos + 4]);
        pos += 4;
        let mut variables = Vec::new();
        for _ in 0..var_count {
            let (record, next) = VariableRecord::parse(index, pos)?;
            variables.push(record);
            pos = next;
        }

        ensure_len(index, pos, 4)?;
        let attr_count = LittleEndian::read_u32(&index[pos..pos + 4]);
        pos += 4;
        let mut attributes = Vec::new();
        for _ in 0..attr_count {
            let (record, next) = AttributeRecord::parse(index, pos)?;
            attributes.push(record);
            pos = next;
        }

        if pos != index.len() {
            return Err(FormatError::TrailingIndexBytes(index.len() - pos));
        }

        Ok(Container {
            variables,
            attributes,
        })
    }

    /// Look up a variable record by name.
    pub fn variable(&self, name: &str) -> Option<&VariableRecord> {
        self.variables.iter().find(|r| r.name == name)
    }

    /// Look up an attribute record by name.
    pub fn attribute(&self, name: &str) -> Option<&AttributeRecord> {
        self.attributes.iter().find(|r| r.name == name)
    }

    /// Slice a variable's payload out of the container image.
    pub fn payload<'d>(
        &self,
        data: &'d [u8],
        record: &VariableRecord,
    ) -> Result<&'d [u8], FormatError> {
        let oob = FormatError::PayloadOutOfBounds {
            offset: record.data_offset,
            len: record.data_len,
            available: data.len(),
        };
        let end = record.data_offset.checked_add(record.data_len).ok_or(oob.clone())?;
        if end > data.len() as u64 {
            return Err(oob);
        }
        Ok(&data[record.data_offset as usize..end as usize])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dtype::Dtype;
    use crate::record::ShapeId;
    use crate::values::{decode_values, Values};
    use crate::writer::ContainerWriter;

    fn sample_container() -> Vec<u8> {
        let mut w = ContainerWriter::new();
        w.add_variable(
            VariableRecord {
                name: "pressure".into(),
                dtype: Dtype::F64,
                shape_id: ShapeId::GlobalArray,
                constant_dims: true,
                shape: Some(vec![3]),
                start: Some(vec![0]),
                count: Some(vec![3]),
                minmax: None,
                data_offset: 0,
                data_len: 0,
            },
            Values::F64(vec![1.0, 4.0, -2.0]).encode(),
        );
        w.add_variable(
            VariableRecord {
                name: "step".into(),
                dtype: Dtype::I32,
                shape_id: ShapeId::LocalValue,
                constant_dims: false,
                shape: None,
                start: None,
                count: None,
                minmax: None,
                data_offset: 0,
                data_len: 0,
            },
            Values::I32(vec![42]).encode(),
        );
        w.add_attribute(AttributeRecord {
            name: "pressure/units".into(),
            is_value: true,
            data: Values::String(vec!["Pa".into()]),
        });
        w.finish().unwrap()
    }

    #[test]
    fn round_trip_records() {
        let image = sample_container();
        let container = Container::parse(&image).unwrap();

        assert_eq!(container.variables.len(), 2);
        assert_eq!(container.attributes.len(), 1);

        let pressure = container.variable("pressure").unwrap();
        assert_eq!(pressure.dtype, Dtype::F64);
        assert_eq!(pressure.shape_id, ShapeId::GlobalArray);
        assert_eq!(pressure.shape, Some(vec![3]));
        assert_eq!(pressure.minmax, Some((-2.0, 4.0)));
        assert!(pressure.constant_dims);

        let step = container.variable("step").unwrap();
        assert_eq!(step.ndims(), 0);
        assert_eq!(step.minmax, Some((42.0, 42.0)));

        let units = container.attribute("pressure/units").unwrap();
        assert!(units.is_value);
        assert_eq!(units.data.as_strings(), Some(&["Pa".to_string()][..]));
    }

    #[test]
    fn payload_decodes() {
        let image = sample_container();
        let container = Container::parse(&image).unwrap();
        let record = container.variable("pressure").unwrap();
        let raw = container.payload(&image, record).unwrap();
        let values = decode_values(record.dtype, raw).unwrap();
        assert_eq!(values, Values::F64(vec![1.0, 4.0, -2.0]));
    }

    #[test]
    fn unknown_names_absent() {
        let image = sample_container();
        let container = Container::parse(&image).unwrap();
        assert!(container.variable("missing").is_none());
        assert!(container.attribute("missing").is_none());
    }

    #[test]
    fn too_short_rejected() {
        let image = sample_container();
        let err = Container::parse(&image[..10]).unwrap_err();
        assert!(matches!(err, FormatError::UnexpectedEof { .. }));
    }

    #[test]
    fn wrong_version_rejected() {
        let mut image = sample_container();
        image[8] = 9;
        assert_eq!(
            Container::parse(&image),
            Err(FormatError::UnsupportedVersion(9))
        );
    }

    #[test]
    fn big_endian_flag_rejected() {
        let mut image = sample_container();
        image[9] = 0;
        assert_eq!(Container::parse(&image), Err(FormatError::UnsupportedFlags(0)));
    }

    #[test]
    fn footer_magic_rejected() {
        let mut image = sample_container();
        let len = image.len();
        image[len - 1] = b'X';
        assert_eq!(Container::parse(&image), Err(FormatError::BadFooterMagic));
    }

    #[test]
    fn index_corruption_detected() {
        let mut image = sample_container();
        // flip one bit inside the index region
        let footer_start = image.len() - FOOTER_LEN;
        let index_offset = LittleEndian::read_u64(&image[footer_start..footer_start + 8]) as usize;
        image[index_offset + 2] ^= 0x01;
        assert!(matches!(
            Container::parse(&image),
            Err(FormatError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn index_offset_out_of_bounds() {
        let mut image = sample_container();
        let footer_start = image.len() - FOOTER_LEN;
        image[footer_start..footer_start + 8]
            .copy_from_slice(&(u64::MAX - 7).to_le_bytes());
        assert!(matches!(
            Container::parse(&image),
            Err(FormatError::UnexpectedEof { .. })
        ));
    }

    #[test]
    fn payload_extent_checked() {
        let image = sample_container();
        let container = Container::parse(&image).unwrap();
        let mut record = container.variable("step").unwrap().clone();
        record.data_len = u64::MAX;
        assert!(matches!(
            container.payload(&image, &record),
            Err(FormatError::PayloadOutOfBounds { .. })
        ));
    }

    #[test]
    fn empty_container_round_trip() {
        let image = ContainerWriter::new().finish().unwrap();
        let container = Container::parse(&image).unwrap();
        assert!(container.variables.is_empty());
        assert!(container.attributes.is_empty());
    }
}
