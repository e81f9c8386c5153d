//! BPL container assembly (write pipeline).
//!
//! Lays out a container as header, packed variable payloads, metadata
//! index, footer. Offsets are assigned here; callers hand over records
//! with `data_offset`/`data_len` left at zero.

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use crate::checksum::crc32c;
use crate::error::FormatError;
use crate::record::{AttributeRecord, VariableRecord};
use crate::signature::{
    BPL_SIGNATURE, FLAG_LITTLE_ENDIAN, FOOTER_MAGIC, FORMAT_VERSION, HEADER_LEN,
};
use crate::values::minmax;

/// Accumulates records and payloads, then assembles the container bytes.
pub struct ContainerWriter {
    variables: Vec<(VariableRecord, Vec<u8>)>,
    attributes: Vec<AttributeRecord>,
    compute_stats: bool,
}

impl ContainerWriter {
    pub fn new() -> Self {
        ContainerWriter {
            variables: Vec::new(),
            attributes: Vec::new(),
            compute_stats: true,
        }
    }

    /// Enable or disable min/max statistics in variable records.
    pub fn set_compute_stats(&mut self, on: bool) {
        self.compute_stats = on;
    }

    /// Queue a variable and its packed element payload.
    pub fn add_variable(&mut self, record: VariableRecord, payload: Vec<u8>) {
        self.variables.push((record, payload));
    }

    /// Queue an attribute.
    pub fn add_attribute(&mut self, record: AttributeRecord) {
        self.attributes.push(record);
    }

    /// Assemble the container. Records keep their queue order.
    pub fn finish(mut self) -> Result<Vec<u8>, FormatError> {
        let mut out = Vec::with_capacity(HEADER_LEN);
        out.extend_from_slice(&BPL_SIGNATURE);
        out.push(FORMAT_VERSION);
        out.push(FLAG_LITTLE_ENDIAN);
        out.extend_from_slice(&[0u8; 6]);

        for (record, payload) in &mut self.variables {
            record.data_offset = out.len() as u64;
            record.data_len = payload.len() as u64;
            record.minmax = if self.compute_stats {
                minmax(record.dtype, payload)
            } else {
                None
            };
            out.extend_from_slice(payload);
        }

        let mut index = Vec::new();
        index.extend_from_slice(&(self.variables.len() as u32).to_le_bytes());
        for (record, _) in &self.variables {
            record.serialize(&mut index)?;
        }
        index.extend_from_slice(&(self.attributes.len() as u32).to_le_bytes());
        for record in &self.attributes {
            record.serialize(&mut index)?;
        }

        let index_offset = out.len() as u64;
        let checksum = crc32c(&index);
        out.extend_from_slice(&index);

        out.extend_from_slice(&index_offset.to_le_bytes());
        out.extend_from_slice(&(index.len() as u64).to_le_bytes());
        out.extend_from_slice(&checksum.to_le_bytes());
        out.extend_from_slice(&FOOTER_MAGIC);
        Ok(out)
    }
}

impl Default for ContainerWriter {
    fn default() -> Self {
        Self::new()
    }
}
